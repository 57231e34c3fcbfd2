//! FHIR endpoints: subscriptions, transactional bundles, processing status.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use mitzmock_core::extract::{self, TransactionKind};
use mitzmock_core::scenario::{self, ScenarioOutcome};

use super::{fhir_response, issue_response, request_id, unrenderable};
use crate::middleware::unauthorized_response;
use crate::policy::{self, AuthPolicy};
use crate::render;
use crate::server::AppState;

/// POST /fhir/Subscription — create a consent subscription.
pub async fn subscription_create(headers: HeaderMap, body: Bytes) -> Response {
    let request_id = request_id(&headers);

    let request = match extract::fhir::parse_subscription(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(request_id = %request_id, code = e.code(), error = %e, "failed to parse Subscription request");
            return fhir_response(
                StatusCode::BAD_REQUEST,
                render::fhir::operation_outcome(
                    "error",
                    "processing",
                    "Failed to parse Subscription request",
                ),
            );
        }
    };

    tracing::info!(
        request_id = %request_id,
        bsn = %request.bsn,
        provider_id = %request.provider_id,
        "subscription creation"
    );

    match scenario::subscription_create(&request) {
        ScenarioOutcome::Accepted => fhir_response(
            StatusCode::ACCEPTED,
            render::fhir::subscription(&request),
        ),
        ScenarioOutcome::Issue(issue) => issue_response(&issue),
        outcome @ (ScenarioOutcome::Decisions(_)
        | ScenarioOutcome::Locations(_)
        | ScenarioOutcome::EmptyResult
        | ScenarioOutcome::Fault(_)
        | ScenarioOutcome::Reflected { .. }
        | ScenarioOutcome::Deleted
        | ScenarioOutcome::Count(_)) => unrenderable("FHIR subscription", &outcome),
    }
}

/// DELETE /fhir/Subscription/{id} — cancel a subscription.
pub async fn subscription_delete(Path(id): Path<String>, headers: HeaderMap) -> Response {
    let request_id = request_id(&headers);
    tracing::info!(request_id = %request_id, subscription_id = %id, "subscription cancellation");

    match scenario::subscription_delete(&id) {
        ScenarioOutcome::Deleted => StatusCode::NO_CONTENT.into_response(),
        ScenarioOutcome::Issue(issue) => issue_response(&issue),
        outcome @ (ScenarioOutcome::Decisions(_)
        | ScenarioOutcome::Locations(_)
        | ScenarioOutcome::EmptyResult
        | ScenarioOutcome::Fault(_)
        | ScenarioOutcome::Accepted
        | ScenarioOutcome::Reflected { .. }
        | ScenarioOutcome::Count(_)) => unrenderable("FHIR deletion", &outcome),
    }
}

/// GET /fhir/{Subscription,Consent}/$processingStatus.
pub async fn processing_status(
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let request_id = request_id(&headers);
    let provider_id = params.get("providerid").cloned().unwrap_or_default();
    let resource_type = if uri.path().contains("/Consent/") {
        "Consent"
    } else {
        "Subscription"
    };

    tracing::info!(
        request_id = %request_id,
        resource_type,
        provider_id = %provider_id,
        "processing status query"
    );

    match scenario::processing_status(&provider_id) {
        ScenarioOutcome::Count(count) => fhir_response(
            StatusCode::OK,
            render::fhir::processing_status(count),
        ),
        ScenarioOutcome::Issue(issue) => issue_response(&issue),
        outcome @ (ScenarioOutcome::Decisions(_)
        | ScenarioOutcome::Locations(_)
        | ScenarioOutcome::EmptyResult
        | ScenarioOutcome::Fault(_)
        | ScenarioOutcome::Accepted
        | ScenarioOutcome::Reflected { .. }
        | ScenarioOutcome::Deleted) => unrenderable("FHIR processing status", &outcome),
    }
}

/// POST /fhir/ — transactional bundle (migration or consent-button).
pub async fn bundle_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = request_id(&headers);

    let request = match extract::fhir::parse_bundle(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(request_id = %request_id, code = e.code(), error = %e, "failed to parse Bundle request");
            return fhir_response(
                StatusCode::BAD_REQUEST,
                render::fhir::operation_outcome(
                    "error",
                    "processing",
                    "Failed to parse Bundle request",
                ),
            );
        }
    };

    let kind = request.transaction_kind();
    tracing::info!(
        request_id = %request_id,
        bsn = %request.bsn,
        transaction = %kind,
        entries = request.entry_count,
        "bundle transaction"
    );

    // Post-extraction gate: only the migration shape is validated.
    if policy::policy_for(&Method::POST, "/fhir/") == AuthPolicy::PostMigration
        && kind == TransactionKind::Migration
    {
        let auth_header = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        if let Err(e) = state.validator.validate_header(auth_header) {
            tracing::warn!(request_id = %request_id, reason = e.reason_code(), error = %e, "SAML validation failed");
            return unauthorized_response(&e.to_string());
        }
    }

    match scenario::bundle_transaction(&request) {
        ScenarioOutcome::Reflected { resource_types } => fhir_response(
            StatusCode::OK,
            render::fhir::bundle_response(&resource_types),
        ),
        ScenarioOutcome::Issue(issue) => issue_response(&issue),
        outcome @ (ScenarioOutcome::Decisions(_)
        | ScenarioOutcome::Locations(_)
        | ScenarioOutcome::EmptyResult
        | ScenarioOutcome::Fault(_)
        | ScenarioOutcome::Accepted
        | ScenarioOutcome::Deleted
        | ScenarioOutcome::Count(_)) => unrenderable("FHIR bundle", &outcome),
    }
}

//! Request handlers, one module per protocol dialect.

pub mod fhir;
pub mod xacml;
pub mod xcpd;

use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use mitzmock_core::scenario::{IssueOutcome, ScenarioOutcome};

use crate::render;

/// mTLS connectivity probe: HEAD /xacml.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Correlation id as sent by the client, for log lines.
pub(crate) fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// 200 SOAP envelope.
pub(crate) fn soap_ok(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, render::SOAP_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// FHIR payload under an explicit status.
pub(crate) fn fhir_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, render::FHIR_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// FHIR operation outcome riding its real status code, with the retry hint
/// when the scenario carries one.
pub(crate) fn issue_response(issue: &IssueOutcome) -> Response {
    let status =
        StatusCode::from_u16(issue.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = render::fhir::operation_outcome(issue.severity, issue.code, issue.diagnostics);
    let mut response = fhir_response(status, body);
    if let Some(seconds) = issue.retry_after_secs {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, axum::http::HeaderValue::from(seconds));
    }
    response
}

/// A scenario kind the dialect has no rendering for. Reaching this arm is a
/// routing-table defect, not a client error.
pub(crate) fn unrenderable(dialect: &'static str, outcome: &ScenarioOutcome) -> Response {
    tracing::error!(dialect, outcome = ?outcome, "scenario is not renderable for this dialect");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

//! POST /xcpd — open authorization question (patient discovery).

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use mitzmock_core::extract;
use mitzmock_core::scenario::{self, ScenarioOutcome};

use super::{request_id, soap_ok, unrenderable};
use crate::render;

pub async fn patient_discovery(headers: HeaderMap, body: Bytes) -> Response {
    let request_id = request_id(&headers);

    let query = match extract::xcpd::parse(&body) {
        Ok(query) => query,
        Err(e) => {
            tracing::warn!(request_id = %request_id, code = e.code(), error = %e, "failed to parse XCPD request");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    tracing::info!(
        request_id = %request_id,
        bsn = %query.bsn,
        sender = %query.sender_root,
        "open authorization question"
    );

    match scenario::patient_discovery(&query.bsn) {
        ScenarioOutcome::Locations(locations) => {
            soap_ok(render::soap::xcpd_found(&query.bsn, &locations))
        }
        ScenarioOutcome::EmptyResult => soap_ok(render::soap::xcpd_empty()),
        ScenarioOutcome::Fault(fault) => {
            // The fault detail carries the correlation id on this dialect.
            let fault = fault.with_detail(format!("RequestId: {request_id}"));
            soap_ok(render::soap::fault(&fault))
        }
        outcome @ (ScenarioOutcome::Decisions(_)
        | ScenarioOutcome::Issue(_)
        | ScenarioOutcome::Accepted
        | ScenarioOutcome::Reflected { .. }
        | ScenarioOutcome::Deleted
        | ScenarioOutcome::Count(_)) => unrenderable("XCPD", &outcome),
    }
}

//! POST /xacml — closed authorization question.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use mitzmock_core::scenario::{self, ScenarioOutcome};
use mitzmock_core::extract;

use super::{request_id, soap_ok, unrenderable};
use crate::render;

pub async fn closed_authorization(headers: HeaderMap, body: Bytes) -> Response {
    let request_id = request_id(&headers);

    let query = match extract::xacml::parse(&body) {
        Ok(query) => query,
        Err(e) => {
            tracing::warn!(request_id = %request_id, code = e.code(), error = %e, "failed to parse XACML request");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    tracing::info!(
        request_id = %request_id,
        bsn = %query.bsn,
        event_codes = ?query.event_codes,
        "closed authorization question"
    );

    match scenario::closed_decision(&query) {
        ScenarioOutcome::Decisions(entries) => soap_ok(render::soap::xacml_response(&entries)),
        ScenarioOutcome::Fault(fault) => soap_ok(render::soap::fault(&fault)),
        outcome @ (ScenarioOutcome::Locations(_)
        | ScenarioOutcome::EmptyResult
        | ScenarioOutcome::Issue(_)
        | ScenarioOutcome::Accepted
        | ScenarioOutcome::Reflected { .. }
        | ScenarioOutcome::Deleted
        | ScenarioOutcome::Count(_)) => unrenderable("XACML", &outcome),
    }
}

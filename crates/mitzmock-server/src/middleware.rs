//! Request middleware: correlation ids and the authentication gate.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use mitzmock_core::xml;
use uuid::Uuid;

use crate::policy::{self, AuthPolicy};
use crate::render::FHIR_CONTENT_TYPE;
use crate::server::AppState;

/// Preserve an incoming `X-Request-Id` or generate one, expose it to
/// handlers via request extensions, and echo it on the response.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static("x-request-id");

    let req_id_value = req
        .headers()
        .get(&header_name)
        .cloned()
        .unwrap_or_else(|| {
            HeaderValue::from_str(&Uuid::new_v4().to_string())
                .expect("uuid is a valid header value")
        });

    req.extensions_mut().insert(req_id_value.clone());

    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, req_id_value);
    res
}

/// The authentication gate for `Pre` endpoints.
///
/// Consults the policy table for every request; on a `Pre` endpoint the
/// assertion is validated before the body is ever parsed, and a failure
/// short-circuits with the fixed 401 artifact. `PostMigration` endpoints are
/// gated inside their handler, after extraction has classified the
/// transaction.
pub async fn authentication_gate(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if policy::policy_for(req.method(), req.uri().path()) == AuthPolicy::Pre {
        let header = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        if let Err(e) = state.validator.validate_header(header) {
            tracing::warn!(reason = e.reason_code(), error = %e, "SAML validation failed");
            return unauthorized_response(&e.to_string());
        }
    }
    next.run(req).await
}

/// The fixed authentication-failure artifact: 401 with a FHIR
/// OperationOutcome carrying the reason text.
pub fn unauthorized_response(reason: &str) -> Response {
    let body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<OperationOutcome xmlns="http://hl7.org/fhir">
  <issue>
    <severity value="error"/>
    <code value="security"/>
    <diagnostics value="SAML validation failed: {}"/>
  </issue>
</OperationOutcome>"#,
        xml::escape(reason)
    );
    (
        StatusCode::UNAUTHORIZED,
        [(header::CONTENT_TYPE, FHIR_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

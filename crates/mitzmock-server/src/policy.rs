//! Per-endpoint authentication policy.
//!
//! Which endpoints demand a valid SAML assertion, and when the check runs,
//! is data: one table, consulted both when the router is assembled and by
//! the bundle handler. Re-classifying an endpoint is a one-line change here.

use axum::http::Method;

/// When the assertion check runs for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Validate before the body is parsed; failure short-circuits.
    Pre,
    /// Validate after extraction, and only for migration bundles (the
    /// transaction shape without a Provenance entry).
    PostMigration,
    /// Never validated.
    None,
}

struct EndpointPolicy {
    method: Method,
    path: &'static str,
    policy: AuthPolicy,
}

/// The full authenticated surface. Paths use route-template notation;
/// `{param}` matches exactly one segment.
const ENDPOINT_POLICIES: &[EndpointPolicy] = &[
    EndpointPolicy {
        method: Method::HEAD,
        path: "/xacml",
        policy: AuthPolicy::None,
    },
    EndpointPolicy {
        method: Method::POST,
        path: "/xacml",
        policy: AuthPolicy::None,
    },
    EndpointPolicy {
        method: Method::POST,
        path: "/xcpd",
        policy: AuthPolicy::None,
    },
    EndpointPolicy {
        method: Method::POST,
        path: "/fhir/Subscription",
        policy: AuthPolicy::Pre,
    },
    EndpointPolicy {
        method: Method::DELETE,
        path: "/fhir/Subscription/{id}",
        policy: AuthPolicy::Pre,
    },
    EndpointPolicy {
        method: Method::GET,
        path: "/fhir/Subscription/$processingStatus",
        policy: AuthPolicy::None,
    },
    EndpointPolicy {
        method: Method::GET,
        path: "/fhir/Consent/$processingStatus",
        policy: AuthPolicy::None,
    },
    EndpointPolicy {
        method: Method::POST,
        path: "/fhir/",
        policy: AuthPolicy::PostMigration,
    },
];

/// Policy for a concrete request. Unknown endpoints carry no policy; they
/// fall through to the router's 404/405 handling anyway.
pub fn policy_for(method: &Method, path: &str) -> AuthPolicy {
    ENDPOINT_POLICIES
        .iter()
        .find(|e| e.method == *method && template_matches(e.path, path))
        .map(|e| e.policy)
        .unwrap_or(AuthPolicy::None)
}

fn template_matches(template: &str, path: &str) -> bool {
    let mut t = template.split('/');
    let mut p = path.split('/');
    loop {
        match (t.next(), p.next()) {
            (None, None) => return true,
            (Some(ts), Some(ps)) => {
                let wildcard = ts.starts_with('{') && ts.ends_with('}');
                if !wildcard && ts != ps {
                    return false;
                }
                if wildcard && ps.is_empty() {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

//! Deterministic scenario selection.
//!
//! Every endpoint maps its extracted identifier onto a fixed response
//! scenario. The mapping is a total function: any identifier selects exactly
//! one outcome, sentinel values select the error and edge scenarios, and
//! everything else lands on the documented default. Correlation ids and
//! timestamps inside rendered artifacts are fresh per call and deliberately
//! outside this contract.

use crate::extract::{BundleRequest, SubscriptionRequest, XacmlQuery};

/// Authorization decision for one requested data category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny,
    Indeterminate,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permit => write!(f, "Permit"),
            Self::Deny => write!(f, "Deny"),
            Self::Indeterminate => write!(f, "Indeterminate"),
        }
    }
}

/// One decision entry; the event code echoes the request verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionEntry {
    pub decision: Decision,
    pub event_code: String,
}

/// One care location in a patient discovery answer. Scenario data is fixed,
/// so the fields borrow from the table below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CareLocation {
    pub patient_id: &'static str,
    pub source_id: Option<&'static str>,
    pub custodian_oid: &'static str,
    pub event_codes: &'static [&'static str],
}

/// SOAP fault fields. Faults in the SOAP dialects ride an HTTP 200 envelope;
/// the fault is in the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    pub code: &'static str,
    pub subcode: &'static str,
    pub reason: &'static str,
    pub detail: String,
}

impl SoapFault {
    /// The one business fault the register raises: unknown BSN.
    pub fn bsn_unknown() -> Self {
        Self {
            code: "soap:Sender",
            subcode: "mitz:InvalidRequest",
            reason: "Patient BSN not found in register",
            detail: "The requested BSN is not known in the Mitz consent register".to_string(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// FHIR operation outcome fields. Unlike the SOAP dialects, the FHIR dialect
/// signals faults through the real transport status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueOutcome {
    pub status: u16,
    pub severity: &'static str,
    pub code: &'static str,
    pub diagnostics: &'static str,
    /// Seconds for a `Retry-After` hint, on the rate-limit scenario only.
    pub retry_after_secs: Option<u32>,
}

impl IssueOutcome {
    fn bsn_unknown() -> Self {
        Self {
            status: 400,
            severity: "error",
            code: "processing",
            diagnostics: "Patient BSN not found in register",
            retry_after_secs: None,
        }
    }

    fn rate_limited() -> Self {
        Self {
            status: 429,
            severity: "error",
            code: "throttled",
            diagnostics: "Rate limit exceeded — retry after 30s",
            retry_after_secs: Some(30),
        }
    }

    fn internal() -> Self {
        Self {
            status: 500,
            severity: "fatal",
            code: "exception",
            diagnostics: "Internal server error",
            retry_after_secs: None,
        }
    }
}

/// A selected response scenario, consumed exactly once by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioOutcome {
    /// Closed decision answer: one entry per requested data category.
    Decisions(Vec<DecisionEntry>),
    /// Patient discovery answer with at least one matched location.
    Locations(Vec<CareLocation>),
    /// Patient discovery answer with no matching patient.
    EmptyResult,
    /// In-body SOAP fault (HTTP 200).
    Fault(SoapFault),
    /// FHIR operation outcome riding its real HTTP status.
    Issue(IssueOutcome),
    /// Subscription accepted (HTTP 202); the resource echoes the request.
    Accepted,
    /// Bundle processed (HTTP 200); one reflected entry per resource type.
    Reflected { resource_types: Vec<&'static str> },
    /// Subscription cancelled (HTTP 204).
    Deleted,
    /// Processing-status total (HTTP 200).
    Count(u32),
}

/// Closed authorization question, keyed on the BSN.
///
/// | BSN         | outcome                                  |
/// |-------------|------------------------------------------|
/// | `000000001` | Permit for every category                |
/// | `000000002` | Deny for every category                  |
/// | `000000003` | Permit for the first category, Deny rest |
/// | `000000004` | Indeterminate for every category         |
/// | `000000005` | SOAP fault (unknown BSN)                 |
/// | `999…`      | Permit for every category (test range)   |
/// | other       | Permit for every category                |
///
/// Exactly one entry is produced per extracted event code, in extraction
/// order, each echoing its original code.
pub fn closed_decision(query: &XacmlQuery) -> ScenarioOutcome {
    if query.bsn == "000000005" {
        return ScenarioOutcome::Fault(SoapFault::bsn_unknown());
    }

    let entries = query
        .event_codes
        .iter()
        .enumerate()
        .map(|(index, event_code)| {
            let decision = match query.bsn.as_str() {
                "000000001" => Decision::Permit,
                "000000002" => Decision::Deny,
                "000000003" => {
                    if index == 0 {
                        Decision::Permit
                    } else {
                        Decision::Deny
                    }
                }
                "000000004" => Decision::Indeterminate,
                bsn if bsn.starts_with("999") => Decision::Permit,
                _ => Decision::Permit,
            };
            DecisionEntry {
                decision,
                event_code: event_code.clone(),
            }
        })
        .collect();

    ScenarioOutcome::Decisions(entries)
}

const TWO_LOCATIONS: &[CareLocation] = &[
    CareLocation {
        patient_id: "123456789",
        source_id: Some("1.2.3.4.5.6.7"),
        custodian_oid: "urn:oid:2.16.840.1.113883.2.4.6.6",
        event_codes: &["huisartsgegevens", "medicatiegegevens"],
    },
    CareLocation {
        patient_id: "987654321",
        source_id: None,
        custodian_oid: "urn:oid:2.16.840.1.113883.2.4.3.11",
        event_codes: &["medicatiegegevens"],
    },
];

const ONE_LOCATION: &[CareLocation] = &[CareLocation {
    patient_id: "111222333",
    source_id: None,
    custodian_oid: "urn:oid:2.16.840.1.113883.2.4.6.6",
    event_codes: &["huisartsgegevens"],
}];

const DEFAULT_LOCATION: &[CareLocation] = &[CareLocation {
    patient_id: "555666777",
    source_id: Some("1.2.3.4.5.6.8"),
    custodian_oid: "urn:oid:2.16.840.1.113883.2.4.6.6",
    event_codes: &["huisartsgegevens", "medicatiegegevens"],
}];

/// Patient discovery, keyed on the BSN.
///
/// | BSN         | outcome                                      |
/// |-------------|----------------------------------------------|
/// | `000000001` | two locations, multiple event codes          |
/// | `000000002` | one location, one event code                 |
/// | `000000003` | empty result (no matching patient)           |
/// | `000000004` | SOAP fault (unknown BSN)                     |
/// | `000000005` | SOAP fault (same behavior, second table row) |
/// | `999…`      | fixed single location, two event codes       |
/// | other       | fixed single location, two event codes       |
pub fn patient_discovery(bsn: &str) -> ScenarioOutcome {
    match bsn {
        "000000001" => ScenarioOutcome::Locations(TWO_LOCATIONS.to_vec()),
        "000000002" => ScenarioOutcome::Locations(ONE_LOCATION.to_vec()),
        "000000003" => ScenarioOutcome::EmptyResult,
        "000000004" | "000000005" => ScenarioOutcome::Fault(SoapFault::bsn_unknown()),
        bsn if bsn.starts_with("999") => ScenarioOutcome::Locations(DEFAULT_LOCATION.to_vec()),
        _ => ScenarioOutcome::Locations(DEFAULT_LOCATION.to_vec()),
    }
}

/// Subscription creation, keyed on the BSN from the criteria.
///
/// | BSN         | outcome                                |
/// |-------------|----------------------------------------|
/// | `000000003` | 400 outcome (unknown BSN)              |
/// | `000000004` | 429 outcome with `Retry-After: 30`     |
/// | `000000005` | 500 outcome                            |
/// | other       | 202 Accepted with the echoed resource  |
pub fn subscription_create(request: &SubscriptionRequest) -> ScenarioOutcome {
    match request.bsn.as_str() {
        "000000003" => ScenarioOutcome::Issue(IssueOutcome::bsn_unknown()),
        "000000004" => ScenarioOutcome::Issue(IssueOutcome::rate_limited()),
        "000000005" => ScenarioOutcome::Issue(IssueOutcome::internal()),
        _ => ScenarioOutcome::Accepted,
    }
}

/// Subscription cancellation, keyed on the subscription id path parameter.
///
/// | id                                     | outcome |
/// |----------------------------------------|---------|
/// | `00000000-0000-0000-0000-000000000004` | 404     |
/// | `00000000-0000-0000-0000-000000000005` | 500     |
/// | other                                  | 204     |
pub fn subscription_delete(id: &str) -> ScenarioOutcome {
    match id {
        "00000000-0000-0000-0000-000000000004" => ScenarioOutcome::Issue(IssueOutcome {
            status: 404,
            severity: "error",
            code: "not-found",
            diagnostics: "Subscription not found",
            retry_after_secs: None,
        }),
        "00000000-0000-0000-0000-000000000005" => ScenarioOutcome::Issue(IssueOutcome::internal()),
        _ => ScenarioOutcome::Deleted,
    }
}

/// Processing-status query, keyed on the provider id.
///
/// | provider id | outcome                          |
/// |-------------|----------------------------------|
/// | `00000003`  | count 5                          |
/// | `00000004`  | count 42                         |
/// | `00000005`  | 400 outcome (unknown provider)   |
/// | other       | count 0 (everything processed)   |
pub fn processing_status(provider_id: &str) -> ScenarioOutcome {
    match provider_id {
        "00000003" => ScenarioOutcome::Count(5),
        "00000004" => ScenarioOutcome::Count(42),
        "00000005" => ScenarioOutcome::Issue(IssueOutcome {
            status: 400,
            severity: "error",
            code: "processing",
            diagnostics: "Provider not found in register",
            retry_after_secs: None,
        }),
        _ => ScenarioOutcome::Count(0),
    }
}

/// Bundle transaction, keyed on the BSN from the Patient entry. Error
/// sentinels match subscription creation; the default reflects one response
/// entry per submitted resource type.
pub fn bundle_transaction(request: &BundleRequest) -> ScenarioOutcome {
    match request.bsn.as_str() {
        "000000003" => ScenarioOutcome::Issue(IssueOutcome::bsn_unknown()),
        "000000004" => ScenarioOutcome::Issue(IssueOutcome::rate_limited()),
        "000000005" => ScenarioOutcome::Issue(IssueOutcome::internal()),
        _ => {
            let mut resource_types = vec!["Patient"];
            if request.has_organization {
                resource_types.push("Organization");
            }
            if request.has_consent {
                resource_types.push("Consent");
            }
            if request.has_provenance {
                resource_types.push("Provenance");
            }
            ScenarioOutcome::Reflected { resource_types }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xacml(bsn: &str, codes: &[&str]) -> XacmlQuery {
        XacmlQuery {
            bsn: bsn.to_string(),
            event_codes: codes.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn decisions(outcome: ScenarioOutcome) -> Vec<DecisionEntry> {
        match outcome {
            ScenarioOutcome::Decisions(entries) => entries,
            other => panic!("expected decisions, got {other:?}"),
        }
    }

    #[test]
    fn test_closed_decision_all_permit() {
        let entries = decisions(closed_decision(&xacml("000000001", &["a", "b"])));
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.decision == Decision::Permit));
        assert_eq!(entries[0].event_code, "a");
        assert_eq!(entries[1].event_code, "b");
    }

    #[test]
    fn test_closed_decision_all_deny() {
        let entries = decisions(closed_decision(&xacml("000000002", &["a", "b", "c"])));
        assert!(entries.iter().all(|e| e.decision == Decision::Deny));
    }

    #[test]
    fn test_closed_decision_first_permit_rest_deny() {
        let entries = decisions(closed_decision(&xacml("000000003", &["a", "b", "c"])));
        assert_eq!(entries[0].decision, Decision::Permit);
        assert_eq!(entries[1].decision, Decision::Deny);
        assert_eq!(entries[2].decision, Decision::Deny);
    }

    #[test]
    fn test_closed_decision_indeterminate() {
        let entries = decisions(closed_decision(&xacml("000000004", &["a"])));
        assert_eq!(entries[0].decision, Decision::Indeterminate);
    }

    #[test]
    fn test_closed_decision_fault_sentinel() {
        let outcome = closed_decision(&xacml("000000005", &["a"]));
        let ScenarioOutcome::Fault(fault) = outcome else {
            panic!("expected fault");
        };
        assert_eq!(fault.subcode, "mitz:InvalidRequest");
    }

    #[test]
    fn test_closed_decision_cardinality_preserved() {
        for n in [0usize, 1, 2, 7] {
            let codes: Vec<String> = (0..n).map(|i| format!("c{i}")).collect();
            let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
            let entries = decisions(closed_decision(&xacml("123456782", &refs)));
            assert_eq!(entries.len(), n);
        }
    }

    #[test]
    fn test_closed_decision_default_and_test_range_permit() {
        for bsn in ["999000001", "874635261", ""] {
            let entries = decisions(closed_decision(&xacml(bsn, &["x"])));
            assert_eq!(entries[0].decision, Decision::Permit);
        }
    }

    #[test]
    fn test_patient_discovery_table() {
        assert!(matches!(
            patient_discovery("000000001"),
            ScenarioOutcome::Locations(ref l) if l.len() == 2
        ));
        assert!(matches!(
            patient_discovery("000000002"),
            ScenarioOutcome::Locations(ref l) if l.len() == 1 && l[0].event_codes.len() == 1
        ));
        assert!(matches!(
            patient_discovery("000000003"),
            ScenarioOutcome::EmptyResult
        ));
        assert!(matches!(
            patient_discovery("000000004"),
            ScenarioOutcome::Fault(_)
        ));
        assert!(matches!(
            patient_discovery("000000005"),
            ScenarioOutcome::Fault(_)
        ));
    }

    #[test]
    fn test_patient_discovery_default_location() {
        for bsn in ["999123456", "300000000"] {
            let ScenarioOutcome::Locations(locations) = patient_discovery(bsn) else {
                panic!("expected locations for {bsn}");
            };
            assert_eq!(locations.len(), 1);
            assert_eq!(locations[0].patient_id, "555666777");
            assert_eq!(locations[0].event_codes.len(), 2);
        }
    }

    #[test]
    fn test_patient_discovery_is_total() {
        // Any string selects exactly one outcome; spot-check odd inputs.
        for bsn in ["", "abc", "0000000010", "\u{1F512}"] {
            let _ = patient_discovery(bsn);
        }
    }

    fn subscription(bsn: &str) -> SubscriptionRequest {
        SubscriptionRequest {
            bsn: bsn.to_string(),
            ..SubscriptionRequest::default()
        }
    }

    #[test]
    fn test_subscription_create_table() {
        assert!(matches!(
            subscription_create(&subscription("000000003")),
            ScenarioOutcome::Issue(IssueOutcome { status: 400, .. })
        ));
        let rate_limited = subscription_create(&subscription("000000004"));
        let ScenarioOutcome::Issue(issue) = rate_limited else {
            panic!("expected issue");
        };
        assert_eq!(issue.status, 429);
        assert_eq!(issue.retry_after_secs, Some(30));
        assert!(matches!(
            subscription_create(&subscription("000000005")),
            ScenarioOutcome::Issue(IssueOutcome { status: 500, .. })
        ));
        assert!(matches!(
            subscription_create(&subscription("123456782")),
            ScenarioOutcome::Accepted
        ));
        assert!(matches!(
            subscription_create(&subscription("")),
            ScenarioOutcome::Accepted
        ));
    }

    #[test]
    fn test_subscription_delete_table() {
        assert!(matches!(
            subscription_delete("00000000-0000-0000-0000-000000000004"),
            ScenarioOutcome::Issue(IssueOutcome { status: 404, .. })
        ));
        assert!(matches!(
            subscription_delete("00000000-0000-0000-0000-000000000005"),
            ScenarioOutcome::Issue(IssueOutcome { status: 500, .. })
        ));
        assert!(matches!(
            subscription_delete("5f1b6f8e-8c6e-4f9a-9f57-bd6f1f2e9c11"),
            ScenarioOutcome::Deleted
        ));
    }

    #[test]
    fn test_processing_status_table() {
        assert!(matches!(processing_status("00000003"), ScenarioOutcome::Count(5)));
        assert!(matches!(processing_status("00000004"), ScenarioOutcome::Count(42)));
        assert!(matches!(
            processing_status("00000005"),
            ScenarioOutcome::Issue(IssueOutcome { status: 400, .. })
        ));
        assert!(matches!(processing_status(""), ScenarioOutcome::Count(0)));
        assert!(matches!(processing_status("99999999"), ScenarioOutcome::Count(0)));
    }

    #[test]
    fn test_bundle_reflects_submitted_resource_types() {
        let request = BundleRequest {
            bsn: "123456782".to_string(),
            has_consent: true,
            has_provenance: true,
            has_organization: false,
            ..BundleRequest::default()
        };
        let ScenarioOutcome::Reflected { resource_types } = bundle_transaction(&request) else {
            panic!("expected reflected bundle");
        };
        assert_eq!(resource_types, vec!["Patient", "Consent", "Provenance"]);
    }

    #[test]
    fn test_bundle_error_sentinels_match_subscription() {
        for (bsn, status) in [("000000003", 400), ("000000004", 429), ("000000005", 500)] {
            let request = BundleRequest {
                bsn: bsn.to_string(),
                ..BundleRequest::default()
            };
            let ScenarioOutcome::Issue(issue) = bundle_transaction(&request) else {
                panic!("expected issue for {bsn}");
            };
            assert_eq!(issue.status, status);
        }
    }

    #[test]
    fn test_same_identifier_same_scenario_kind() {
        let first = patient_discovery("000000001");
        let second = patient_discovery("000000001");
        assert_eq!(first, second);
    }
}

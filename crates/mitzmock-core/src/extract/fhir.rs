//! FHIR subscription and transactional-bundle dialect (XML encoding).

use crate::error::{CoreError, Result};
use crate::xml;

/// Fields extracted from a `Subscription` creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionRequest {
    /// Subject BSN, from the `patientid` key of the criteria query string.
    /// May be empty; subscription creation tolerates anonymous criteria and
    /// routes them to the default scenario.
    pub bsn: String,
    /// Provider identifier (URA), from the `providerid` criteria key.
    pub provider_id: String,
    /// The criteria string as sent, echoed back in the accepted resource.
    pub criteria: String,
    /// Notification channel endpoint.
    pub endpoint: String,
    /// Notification payload MIME type.
    pub payload_type: String,
}

/// Fields extracted from a transactional `Bundle` request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleRequest {
    /// Subject BSN, from the Patient entry's identifier value.
    pub bsn: String,
    /// Bundle `type` value (normally `transaction`).
    pub bundle_type: String,
    /// Whether a Consent resource is present among the entries.
    pub has_consent: bool,
    /// Whether a Provenance resource is present among the entries.
    pub has_provenance: bool,
    /// Whether an Organization resource is present among the entries.
    pub has_organization: bool,
    /// Total number of entries, regardless of resource kind.
    pub entry_count: usize,
}

/// The two transaction shapes the bundle endpoint serves. A Provenance entry
/// marks a consent-button submission; without one the bundle is a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Migration,
    ConsentButton,
}

impl BundleRequest {
    pub fn transaction_kind(&self) -> TransactionKind {
        if self.has_provenance {
            TransactionKind::ConsentButton
        } else {
            TransactionKind::Migration
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Migration => write!(f, "migration"),
            Self::ConsentButton => write!(f, "consent-button"),
        }
    }
}

/// Extract criteria, channel, and identifiers from a Subscription resource.
pub fn parse_subscription(body: &[u8]) -> Result<SubscriptionRequest> {
    let text = xml::decode(body)?;
    let doc = xml::parse(text)?;
    let root = doc.root_element();

    if root.tag_name().name() != "Subscription" {
        return Err(CoreError::malformed_xml(format!(
            "expected Subscription resource, got {}",
            root.tag_name().name()
        )));
    }

    let criteria = value_of(root, "criteria").unwrap_or_default().to_string();

    let mut request = SubscriptionRequest {
        criteria: criteria.clone(),
        ..SubscriptionRequest::default()
    };

    if let Some(channel) = xml::child(root, "channel") {
        request.endpoint = value_of(channel, "endpoint").unwrap_or_default().to_string();
        request.payload_type = value_of(channel, "payload").unwrap_or_default().to_string();
    }

    // Criteria look like
    // `Consent?_query=otv&patientid={bsn}&providerid={ura}&providertype={type}`.
    if let Some((_, query)) = criteria.split_once('?') {
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("patientid", value)) => request.bsn = value.to_string(),
                Some(("providerid", value)) => request.provider_id = value.to_string(),
                _ => {}
            }
        }
    }

    Ok(request)
}

/// Extract the BSN, entry presence flags, and entry count from a Bundle.
pub fn parse_bundle(body: &[u8]) -> Result<BundleRequest> {
    let text = xml::decode(body)?;
    let doc = xml::parse(text)?;
    let root = doc.root_element();

    if root.tag_name().name() != "Bundle" {
        return Err(CoreError::malformed_xml(format!(
            "expected Bundle resource, got {}",
            root.tag_name().name()
        )));
    }

    let mut request = BundleRequest {
        bundle_type: value_of(root, "type").unwrap_or_default().to_string(),
        ..BundleRequest::default()
    };

    for entry in xml::children(root, "entry") {
        request.entry_count += 1;
        let Some(resource) = xml::child(entry, "resource") else {
            continue;
        };
        let Some(kind) = resource.children().find(|n| n.is_element()) else {
            continue;
        };
        match kind.tag_name().name() {
            "Patient" => {
                if let Some(identifier) = xml::child(kind, "identifier")
                    && let Some(value) = value_of(identifier, "value")
                {
                    request.bsn = value.to_string();
                }
            }
            "Consent" => request.has_consent = true,
            "Provenance" => request.has_provenance = true,
            "Organization" => request.has_organization = true,
            _ => {}
        }
    }

    Ok(request)
}

/// FHIR XML encodes primitives as `<name value="..."/>`.
fn value_of<'a>(node: roxmltree::Node<'a, '_>, local: &str) -> Option<&'a str> {
    xml::child(node, local).and_then(|n| xml::attr(n, "value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBSCRIPTION: &str = r#"<Subscription xmlns="http://hl7.org/fhir">
        <status value="requested"/>
        <criteria value="Consent?_query=otv&amp;patientid=000000001&amp;providerid=00000042&amp;providertype=ura"/>
        <channel>
          <type value="rest-hook"/>
          <endpoint value="https://client.example.org/notify"/>
          <payload value="application/fhir+xml"/>
        </channel>
      </Subscription>"#;

    fn bundle(resources: &[&str]) -> String {
        let entries: String = resources
            .iter()
            .map(|res| {
                let inner = if *res == "Patient" {
                    r#"<Patient><identifier>
                         <system value="http://fhir.nl/fhir/NamingSystem/bsn"/>
                         <value value="000000002"/>
                       </identifier></Patient>"#
                        .to_string()
                } else {
                    format!("<{res}/>")
                };
                format!("<entry><resource>{inner}</resource></entry>")
            })
            .collect();
        format!(
            r#"<Bundle xmlns="http://hl7.org/fhir"><type value="transaction"/>{entries}</Bundle>"#
        )
    }

    #[test]
    fn test_subscription_fields() {
        let req = parse_subscription(SUBSCRIPTION.as_bytes()).unwrap();
        assert_eq!(req.bsn, "000000001");
        assert_eq!(req.provider_id, "00000042");
        assert_eq!(req.endpoint, "https://client.example.org/notify");
        assert_eq!(req.payload_type, "application/fhir+xml");
        assert!(req.criteria.starts_with("Consent?_query=otv"));
    }

    #[test]
    fn test_subscription_without_patientid_keeps_empty_bsn() {
        let body = r#"<Subscription><criteria value="Consent?_query=otv&amp;providerid=1"/></Subscription>"#;
        let req = parse_subscription(body.as_bytes()).unwrap();
        assert_eq!(req.bsn, "");
        assert_eq!(req.provider_id, "1");
    }

    #[test]
    fn test_subscription_wrong_root_is_malformed() {
        let err = parse_subscription(b"<Consent/>").unwrap_err();
        assert_eq!(err.code(), "malformed-xml");
    }

    #[test]
    fn test_bundle_migration_shape() {
        let body = bundle(&["Patient", "Organization", "Consent"]);
        let req = parse_bundle(body.as_bytes()).unwrap();
        assert_eq!(req.bsn, "000000002");
        assert_eq!(req.entry_count, 3);
        assert!(req.has_consent);
        assert!(req.has_organization);
        assert!(!req.has_provenance);
        assert_eq!(req.transaction_kind(), TransactionKind::Migration);
    }

    #[test]
    fn test_bundle_consent_button_shape() {
        let body = bundle(&["Patient", "Consent", "Provenance"]);
        let req = parse_bundle(body.as_bytes()).unwrap();
        assert!(req.has_provenance);
        assert_eq!(req.transaction_kind(), TransactionKind::ConsentButton);
    }

    #[test]
    fn test_empty_bundle() {
        let req = parse_bundle(bundle(&[]).as_bytes()).unwrap();
        assert_eq!(req.entry_count, 0);
        assert_eq!(req.bsn, "");
    }
}

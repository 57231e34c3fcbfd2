//! Closed authorization question (XACML 3.0 over SOAP).

use crate::error::{CoreError, Result};
use crate::xml;

/// Fields extracted from a closed authorization query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XacmlQuery {
    /// Subject BSN, from the resource-category `resource-id` attribute.
    pub bsn: String,
    /// Requested data categories (event codes), one per action-category
    /// `event-code` attribute block, in document order. The response carries
    /// exactly one decision per entry, so the count is load-bearing.
    pub event_codes: Vec<String>,
}

/// Extract the BSN and requested data categories from an XACML request body.
///
/// Attribute ids are matched by suffix (`resource-id`, `event-code`) because
/// clients disagree on the id prefix; category URNs are matched on their
/// `:resource` / `:action` tails for the same reason. Event-code values may
/// carry an OID qualifier before a `^` separator, which is stripped.
pub fn parse(body: &[u8]) -> Result<XacmlQuery> {
    let cleaned = xml::sanitize(body);
    let text = xml::decode(&cleaned)?.to_owned();
    let doc = xml::parse(&text)?;

    let mut bsn = String::new();
    let mut event_codes = Vec::new();

    for attrs in xml::descendants(doc.root_element(), "Attributes") {
        let category = xml::attr(attrs, "Category").unwrap_or_default();
        if category.ends_with(":resource") {
            for attribute in xml::descendants(attrs, "Attribute") {
                let id = xml::attr(attribute, "AttributeId").unwrap_or_default();
                if id.ends_with("resource-id")
                    && let Some(value) = xml::child_text(attribute, "AttributeValue")
                {
                    bsn = value.to_string();
                }
            }
        } else if category.ends_with(":action") {
            for attribute in xml::descendants(attrs, "Attribute") {
                let id = xml::attr(attribute, "AttributeId").unwrap_or_default();
                if id.ends_with("event-code")
                    && let Some(value) = xml::child_text(attribute, "AttributeValue")
                {
                    event_codes.push(strip_oid_prefix(value).to_string());
                }
            }
        }
    }

    if bsn.is_empty() {
        return Err(CoreError::missing_identifier("XACML"));
    }

    Ok(XacmlQuery { bsn, event_codes })
}

/// Drop an OID qualifier before the `^` separator
/// (`2.16.840.1.113883.2.4.3.111.5.10.1^1` becomes `1`).
fn strip_oid_prefix(value: &str) -> &str {
    match value.rfind('^') {
        Some(idx) => &value[idx + 1..],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(bsn: &str, event_codes: &[&str]) -> String {
        let actions: String = event_codes
            .iter()
            .map(|code| {
                format!(
                    r#"<xacml:Attributes Category="urn:oasis:names:tc:xacml:3.0:attribute-category:action">
                         <xacml:Attribute AttributeId="urn:nictiz:names:mitz:event-code" IncludeInResult>
                           <xacml:AttributeValue DataType="http://www.w3.org/2001/XMLSchema#string">{code}</xacml:AttributeValue>
                         </xacml:Attribute>
                       </xacml:Attributes>"#
                )
            })
            .collect();
        format!(
            r#"<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope"
                             xmlns:xacml="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17">
                 <soap:Body>
                   <xacml-samlp:XACMLAuthzDecisionQuery xmlns:xacml-samlp="urn:oasis:names:tc:xacml:3.0:profile:saml2.0:v2:schema:protocol">
                     <xacml:Request>
                       <xacml:Attributes Category="urn:oasis:names:tc:xacml:3.0:attribute-category:resource">
                         <xacml:Attribute AttributeId="urn:oasis:names:tc:xacml:1.0:resource:resource-id">
                           <xacml:AttributeValue>{bsn}</xacml:AttributeValue>
                         </xacml:Attribute>
                       </xacml:Attributes>
                       {actions}
                     </xacml:Request>
                   </xacml-samlp:XACMLAuthzDecisionQuery>
                 </soap:Body>
               </soap:Envelope>"#
        )
    }

    #[test]
    fn test_extracts_bsn_and_event_codes_in_order() {
        let body = request("000000001", &["huisartsgegevens", "medicatiegegevens"]);
        let query = parse(body.as_bytes()).unwrap();
        assert_eq!(query.bsn, "000000001");
        assert_eq!(query.event_codes, vec!["huisartsgegevens", "medicatiegegevens"]);
    }

    #[test]
    fn test_event_code_count_preserved() {
        for n in 0..4usize {
            let codes: Vec<String> = (0..n).map(|i| format!("cat{i}")).collect();
            let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
            let query = parse(request("000000001", &refs).as_bytes()).unwrap();
            assert_eq!(query.event_codes.len(), n);
        }
    }

    #[test]
    fn test_strips_oid_prefix_from_event_code() {
        let body = request("999000123", &["2.16.840.1.113883.2.4.3.111.5.10.1^1"]);
        let query = parse(body.as_bytes()).unwrap();
        assert_eq!(query.event_codes, vec!["1"]);
    }

    #[test]
    fn test_prefix_variation_yields_same_extraction() {
        let prefixed = request("000000002", &["huisartsgegevens"]);
        // Same logical document with the default namespace everywhere.
        let unprefixed = prefixed
            .replace("xacml:", "")
            .replace("soap:", "")
            .replace("xacml-samlp:", "");
        let a = parse(prefixed.as_bytes()).unwrap();
        let b = parse(unprefixed.as_bytes()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_bsn_is_reported() {
        let body = r#"<Envelope><Body><Request>
            <Attributes Category="urn:oasis:names:tc:xacml:3.0:attribute-category:action">
              <Attribute AttributeId="urn:nictiz:names:mitz:event-code">
                <AttributeValue>huisartsgegevens</AttributeValue>
              </Attribute>
            </Attributes>
        </Request></Body></Envelope>"#;
        let err = parse(body.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "missing-identifier");
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = parse(b"this is not xml").unwrap_err();
        assert_eq!(err.code(), "malformed-xml");
    }
}

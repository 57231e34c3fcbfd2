//! SOAP envelope rendering for the XACML and XCPD dialects.

use mitzmock_core::scenario::{CareLocation, DecisionEntry, SoapFault};
use mitzmock_core::xml;
use time::OffsetDateTime;
use time::macros::format_description;
use uuid::Uuid;

pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

const BSN_ROOT: &str = "2.16.840.1.113883.2.4.6.3";
const EVENT_CODE_SYSTEM: &str = "2.16.840.1.113883.2.4.3.111.5.10";

/// Closed authorization answer: one `Result` per decision entry, the event
/// code echoed back as an obligation.
pub fn xacml_response(entries: &[DecisionEntry]) -> String {
    let mut results = String::new();
    for entry in entries {
        results.push_str(&format!(
            r#"
      <xacml:Result>
        <xacml:Decision>{}</xacml:Decision>
        <xacml:Obligations>
          <xacml:Obligation ObligationId="urn:nictiz:names:mitz:obligation:event-code">
            <xacml:AttributeAssignment AttributeId="urn:nictiz:names:mitz:event-code" DataType="http://www.w3.org/2001/XMLSchema#string">{}</xacml:AttributeAssignment>
          </xacml:Obligation>
        </xacml:Obligations>
      </xacml:Result>"#,
            entry.decision,
            xml::escape(&entry.event_code)
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
  <soap:Body>
    <xacml:Response xmlns:xacml="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17">{results}
    </xacml:Response>
  </soap:Body>
</soap:Envelope>"#
    )
}

/// In-body SOAP fault; the transport status stays 200.
pub fn fault(fault: &SoapFault) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope" xmlns:mitz="urn:nictiz:names:mitz">
  <soap:Body>
    <soap:Fault>
      <soap:Code>
        <soap:Value>{}</soap:Value>
        <soap:Subcode>
          <soap:Value>{}</soap:Value>
        </soap:Subcode>
      </soap:Code>
      <soap:Reason>
        <soap:Text xml:lang="en">{}</soap:Text>
      </soap:Reason>
      <soap:Detail>
        <mitz:description>{}</mitz:description>
      </soap:Detail>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#,
        fault.code,
        fault.subcode,
        xml::escape(fault.reason),
        xml::escape(&fault.detail)
    )
}

/// Patient discovery answer with matched locations. The response id and
/// creation time are fresh per call.
pub fn xcpd_found(requested_bsn: &str, locations: &[CareLocation]) -> String {
    let response_id = Uuid::new_v4();
    let timestamp = hl7_timestamp(OffsetDateTime::now_utc());

    let mut subjects = String::new();
    for location in locations {
        let source_id = match location.source_id {
            Some(oid) => format!(
                "\n              <hl7:id root=\"{oid}\"/>"
            ),
            None => String::new(),
        };
        let mut event_codes = String::new();
        for code in location.event_codes {
            event_codes.push_str(&format!(
                "\n            <hl7:code code=\"{code}\" codeSystem=\"{EVENT_CODE_SYSTEM}\"/>"
            ));
        }
        subjects.push_str(&format!(
            r#"
      <hl7:subject typeCode="SUBJ">
        <hl7:registrationEvent classCode="REG" moodCode="EVN">
          <hl7:subject1 typeCode="SBJ">
            <hl7:patient classCode="PAT">
              <hl7:id root="{BSN_ROOT}" extension="{}"/>{source_id}
              <hl7:statusCode code="active"/>
            </hl7:patient>
          </hl7:subject1>
          <hl7:custodian typeCode="CST">
            <hl7:assignedEntity classCode="ASSIGNED">
              <hl7:id root="{}"/>{event_codes}
            </hl7:assignedEntity>
          </hl7:custodian>
        </hl7:registrationEvent>
      </hl7:subject>"#,
            xml::escape(location.patient_id),
            strip_oid_urn(location.custodian_oid),
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
  <soap:Body>
    <hl7:PRPA_IN201306UV02 xmlns:hl7="urn:hl7-org:v3" ITSVersion="XML_1.0">
      <hl7:id root="{response_id}"/>
      <hl7:creationTime value="{timestamp}"/>
      <hl7:interactionId root="2.16.840.1.113883.1.6" extension="PRPA_IN201306UV02"/>
      <hl7:processingCode code="P"/>
      <hl7:acceptAckCode code="NE"/>
      <hl7:controlActProcess classCode="CACT" moodCode="EVN">{subjects}
        <hl7:queryAck>
          <hl7:queryResponseCode code="OK"/>
        </hl7:queryAck>
        <hl7:queryByParameter>
          <hl7:parameterList>
            <hl7:livingSubjectId>
              <hl7:value root="{BSN_ROOT}" extension="{}"/>
            </hl7:livingSubjectId>
          </hl7:parameterList>
        </hl7:queryByParameter>
      </hl7:controlActProcess>
    </hl7:PRPA_IN201306UV02>
  </soap:Body>
</soap:Envelope>"#,
        xml::escape(requested_bsn)
    )
}

/// Patient discovery answer with no matching patient. Fully static.
pub fn xcpd_empty() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
  <soap:Body>
    <hl7:PRPA_IN201306UV02 xmlns:hl7="urn:hl7-org:v3" ITSVersion="XML_1.0">
      <hl7:processingCode code="P"/>
      <hl7:acceptAckCode code="NE"/>
      <hl7:controlActProcess classCode="CACT" moodCode="EVN">
        <hl7:queryAck>
          <hl7:queryResponseCode code="NF"/>
        </hl7:queryAck>
      </hl7:controlActProcess>
    </hl7:PRPA_IN201306UV02>
  </soap:Body>
</soap:Envelope>"#
        .to_string()
}

/// HL7 TS format: `yyyyMMddHHmmss`.
fn hl7_timestamp(t: OffsetDateTime) -> String {
    let format = format_description!("[year][month][day][hour][minute][second]");
    t.format(&format).unwrap_or_default()
}

fn strip_oid_urn(oid: &str) -> &str {
    oid.strip_prefix("urn:oid:").unwrap_or(oid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mitzmock_core::scenario::Decision;

    fn entry(decision: Decision, code: &str) -> DecisionEntry {
        DecisionEntry {
            decision,
            event_code: code.to_string(),
        }
    }

    #[test]
    fn test_xacml_response_has_one_result_per_entry() {
        let body = xacml_response(&[
            entry(Decision::Permit, "huisartsgegevens"),
            entry(Decision::Deny, "medicatiegegevens"),
        ]);
        assert_eq!(body.matches("<xacml:Result>").count(), 2);
        assert_eq!(body.matches("<xacml:Decision>Permit</xacml:Decision>").count(), 1);
        assert_eq!(body.matches("<xacml:Decision>Deny</xacml:Decision>").count(), 1);
        assert!(body.contains(">huisartsgegevens<"));
        assert!(body.contains(">medicatiegegevens<"));
        // Protocol-valid XML
        roxmltree::Document::parse(&body).unwrap();
    }

    #[test]
    fn test_xacml_response_empty_entries() {
        let body = xacml_response(&[]);
        assert_eq!(body.matches("<xacml:Result>").count(), 0);
        roxmltree::Document::parse(&body).unwrap();
    }

    #[test]
    fn test_fault_carries_structured_fields() {
        let body = fault(&SoapFault::bsn_unknown());
        assert!(body.contains("<soap:Value>soap:Sender</soap:Value>"));
        assert!(body.contains("<soap:Value>mitz:InvalidRequest</soap:Value>"));
        assert!(body.contains("Patient BSN not found in register"));
        roxmltree::Document::parse(&body).unwrap();
    }

    #[test]
    fn test_fault_detail_is_escaped() {
        let body = fault(&SoapFault::bsn_unknown().with_detail("RequestId: <42&>"));
        assert!(body.contains("RequestId: &lt;42&amp;&gt;"));
        roxmltree::Document::parse(&body).unwrap();
    }

    #[test]
    fn test_xcpd_found_renders_locations_and_event_codes() {
        let locations = [
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
        let body = xcpd_found("999901234", &locations);
        assert_eq!(body.matches("<hl7:registrationEvent").count(), 2);
        assert_eq!(body.matches("huisartsgegevens").count(), 1);
        assert_eq!(body.matches("medicatiegegevens").count(), 2);
        assert!(body.contains(r#"extension="999901234""#));
        assert!(body.contains(r#"root="2.16.840.1.113883.2.4.6.6""#));
        roxmltree::Document::parse(&body).unwrap();
    }

    #[test]
    fn test_xcpd_found_fresh_correlation_ids() {
        let a = xcpd_found("999901234", &[]);
        let b = xcpd_found("999901234", &[]);
        // Same scenario, different correlation ids.
        assert_ne!(a, b);
    }

    #[test]
    fn test_xcpd_empty_reports_not_found() {
        let body = xcpd_empty();
        assert!(body.contains(r#"<hl7:queryResponseCode code="NF"/>"#));
        assert_eq!(body.matches("registrationEvent").count(), 0);
        roxmltree::Document::parse(&body).unwrap();
    }
}

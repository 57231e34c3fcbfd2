//! Open authorization question (XCPD patient discovery, HL7v3 over SOAP).

use crate::error::{CoreError, Result};
use crate::xml;

/// Fields extracted from a patient discovery query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XcpdQuery {
    /// Subject BSN, from `livingSubjectId/value/@extension`.
    pub bsn: String,
    /// Root OID of the sending organization, from `sender/device/id/@root`.
    pub sender_root: String,
}

/// Extract the BSN and sender organization from an XCPD request body.
pub fn parse(body: &[u8]) -> Result<XcpdQuery> {
    let text = xml::decode(body)?;
    let doc = xml::parse(text)?;
    let root = doc.root_element();

    let bsn = xml::first_descendant(root, "livingSubjectId")
        .and_then(|id| xml::child(id, "value"))
        .and_then(|value| xml::attr(value, "extension"))
        .unwrap_or_default()
        .to_string();

    let sender_root = xml::first_descendant(root, "sender")
        .and_then(|sender| xml::first_descendant(sender, "device"))
        .and_then(|device| xml::child(device, "id"))
        .and_then(|id| xml::attr(id, "root"))
        .unwrap_or_default()
        .to_string();

    if bsn.is_empty() {
        return Err(CoreError::missing_identifier("XCPD"));
    }

    Ok(XcpdQuery { bsn, sender_root })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prefix: &str, bsn: &str) -> String {
        let p = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}:")
        };
        let xmlns = if prefix.is_empty() {
            r#"xmlns="urn:hl7-org:v3""#.to_string()
        } else {
            format!(r#"xmlns:{prefix}="urn:hl7-org:v3""#)
        };
        format!(
            r#"<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
                 <soap:Body>
                   <{p}PRPA_IN201305UV02 {xmlns}>
                     <{p}sender typeCode="SND">
                       <{p}device classCode="DEV" determinerCode="INSTANCE">
                         <{p}id root="2.16.528.1.1007.3.3"/>
                       </{p}device>
                     </{p}sender>
                     <{p}controlActProcess classCode="CACT" moodCode="EVN">
                       <{p}queryByParameter>
                         <{p}parameterList>
                           <{p}livingSubjectId>
                             <{p}value root="2.16.840.1.113883.2.4.6.3" extension="{bsn}"/>
                             <{p}semanticsText>LivingSubject.id</{p}semanticsText>
                           </{p}livingSubjectId>
                         </{p}parameterList>
                       </{p}queryByParameter>
                     </{p}controlActProcess>
                   </{p}PRPA_IN201305UV02>
                 </soap:Body>
               </soap:Envelope>"#
        )
    }

    #[test]
    fn test_extracts_bsn_and_sender() {
        let query = parse(request("hl7", "000000001").as_bytes()).unwrap();
        assert_eq!(query.bsn, "000000001");
        assert_eq!(query.sender_root, "2.16.528.1.1007.3.3");
    }

    #[test]
    fn test_default_namespace_yields_same_extraction() {
        let prefixed = parse(request("hl7", "999001234").as_bytes()).unwrap();
        let unprefixed = parse(request("", "999001234").as_bytes()).unwrap();
        assert_eq!(prefixed, unprefixed);
    }

    #[test]
    fn test_missing_bsn_is_reported() {
        let body = r#"<Envelope><Body><PRPA_IN201305UV02>
            <sender><device><id root="2.16.528.1.1007.3.3"/></device></sender>
        </PRPA_IN201305UV02></Body></Envelope>"#;
        let err = parse(body.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "missing-identifier");
    }

    #[test]
    fn test_malformed_body_is_reported() {
        assert_eq!(parse(b"<broken").unwrap_err().code(), "malformed-xml");
    }
}

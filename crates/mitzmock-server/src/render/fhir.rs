//! FHIR XML resource rendering.

use mitzmock_core::SubscriptionRequest;
use mitzmock_core::xml;
use uuid::Uuid;

pub const FHIR_CONTENT_TYPE: &str = "application/fhir+xml; charset=utf-8";

/// Accepted subscription: the resource echoes the submitted criteria and
/// channel, with a fresh logical id.
pub fn subscription(request: &SubscriptionRequest) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Subscription xmlns="http://hl7.org/fhir">
  <id value="{}"/>
  <status value="requested"/>
  <criteria value="{}"/>
  <channel>
    <type value="rest-hook"/>
    <endpoint value="{}"/>
    <payload value="{}"/>
  </channel>
</Subscription>"#,
        Uuid::new_v4(),
        xml::escape(&request.criteria),
        xml::escape(&request.endpoint),
        xml::escape(&request.payload_type),
    )
}

/// Transaction-response bundle with one created entry per reflected
/// resource type, each under a fresh location.
pub fn bundle_response(resource_types: &[&str]) -> String {
    let mut entries = String::new();
    for resource_type in resource_types {
        entries.push_str(&format!(
            r#"
  <entry>
    <response>
      <status value="201 Created"/>
      <location value="{resource_type}/{}"/>
    </response>
  </entry>"#,
            Uuid::new_v4()
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Bundle xmlns="http://hl7.org/fhir">
  <id value="{}"/>
  <type value="transaction-response"/>{entries}
</Bundle>"#,
        Uuid::new_v4()
    )
}

/// Processing-status answer: a Parameters resource carrying the number of
/// submissions still in flight.
pub fn processing_status(count: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Parameters xmlns="http://hl7.org/fhir">
  <parameter>
    <name value="total"/>
    <valueInteger value="{count}"/>
  </parameter>
</Parameters>"#
    )
}

/// OperationOutcome carrying one issue.
pub fn operation_outcome(severity: &str, code: &str, diagnostics: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<OperationOutcome xmlns="http://hl7.org/fhir">
  <issue>
    <severity value="{}"/>
    <code value="{}"/>
    <diagnostics value="{}"/>
  </issue>
</OperationOutcome>"#,
        xml::escape(severity),
        xml::escape(code),
        xml::escape(diagnostics),
    )
}

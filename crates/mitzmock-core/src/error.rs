use thiserror::Error;

/// Errors produced while extracting a subject identifier from a request body.
///
/// Both variants are client-caused and map to a 400 at the HTTP boundary;
/// the SOAP dialects answer with an empty body, the FHIR dialect with an
/// `OperationOutcome`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The body could not be parsed as XML, even after attribute sanitization.
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    /// The request parsed, but the subject identifier could not be located.
    #[error("no subject identifier found in {dialect} request")]
    MissingIdentifier {
        /// The protocol dialect the request was tagged with.
        dialect: &'static str,
    },
}

impl CoreError {
    /// Create a new `MalformedXml` error.
    pub fn malformed_xml(message: impl Into<String>) -> Self {
        Self::MalformedXml(message.into())
    }

    /// Create a new `MissingIdentifier` error.
    pub fn missing_identifier(dialect: &'static str) -> Self {
        Self::MissingIdentifier { dialect }
    }

    /// Stable machine-readable code for logging and assertions.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedXml(_) => "malformed-xml",
            Self::MissingIdentifier { .. } => "missing-identifier",
        }
    }

    /// Check if this error is a client error (4xx category).
    ///
    /// Every extraction failure is client-caused; the method exists so the
    /// boundary mapping stays explicit if a server-side variant is ever added.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MalformedXml(_) | Self::MissingIdentifier { .. })
    }
}

/// Convenience result type for extraction operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_xml_error() {
        let err = CoreError::malformed_xml("unexpected end of stream");
        assert_eq!(err.to_string(), "malformed XML: unexpected end of stream");
        assert_eq!(err.code(), "malformed-xml");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_missing_identifier_error() {
        let err = CoreError::missing_identifier("XACML");
        assert_eq!(
            err.to_string(),
            "no subject identifier found in XACML request"
        );
        assert_eq!(err.code(), "missing-identifier");
        assert!(err.is_client_error());
    }
}

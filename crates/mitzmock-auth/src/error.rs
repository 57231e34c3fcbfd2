//! Assertion validation error types.
//!
//! The request-level reasons form a closed set; each maps to a stable
//! kebab-case code carried into logs and the rejection artifact.

use thiserror::Error;

/// Errors raised while validating a SAML assertion from a request header.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header was sent.
    #[error("missing Authorization header")]
    MissingHeader,

    /// The header does not use the `SAML <base64>` scheme.
    #[error("unsupported Authorization scheme (expected 'SAML <base64>')")]
    BadScheme,

    /// The scheme is right but nothing follows it.
    #[error("empty SAML assertion payload")]
    EmptyPayload,

    /// The payload is not valid base64.
    #[error("invalid base64 in SAML assertion: {message}")]
    BadEncoding {
        /// Decoder failure description.
        message: String,
    },

    /// The decoded payload holds no `Assertion` element (or no XML at all).
    #[error("no Assertion element found in SAML payload: {message}")]
    NoAssertion {
        /// What went wrong while locating the assertion.
        message: String,
    },

    /// The enveloped signature did not verify against the trust anchor.
    #[error("XML signature verification failed: {message}")]
    SignatureInvalid {
        /// Verification failure description.
        message: String,
    },

    /// The Issuer element is absent or does not match the configured value.
    #[error("issuer mismatch: got {got:?}, expected {expected:?}")]
    IssuerMismatch {
        /// The configured issuer.
        expected: String,
        /// The issuer found in the assertion, if any.
        got: Option<String>,
    },

    /// A Conditions timestamp attribute failed to parse as RFC 3339.
    #[error("unparseable Conditions timestamp: {message}")]
    BadTimestamp {
        /// Parser failure description.
        message: String,
    },

    /// The assertion is not yet within its validity window.
    #[error("assertion is not yet valid (NotBefore={not_before})")]
    NotYetValid {
        /// The NotBefore attribute as sent.
        not_before: String,
    },

    /// The assertion's validity window has passed.
    #[error("assertion has expired (NotOnOrAfter={not_on_or_after})")]
    Expired {
        /// The NotOnOrAfter attribute as sent.
        not_on_or_after: String,
    },

    /// The validator itself could not be built (bad trust-anchor material).
    /// Raised at startup, never for a request.
    #[error("validator configuration error: {message}")]
    Configuration {
        /// Description of the configuration defect.
        message: String,
    },
}

impl AuthError {
    pub fn bad_encoding(message: impl Into<String>) -> Self {
        Self::BadEncoding {
            message: message.into(),
        }
    }

    pub fn no_assertion(message: impl Into<String>) -> Self {
        Self::NoAssertion {
            message: message.into(),
        }
    }

    pub fn signature_invalid(message: impl Into<String>) -> Self {
        Self::SignatureInvalid {
            message: message.into(),
        }
    }

    pub fn bad_timestamp(message: impl Into<String>) -> Self {
        Self::BadTimestamp {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Stable machine-readable reason code.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing-header",
            Self::BadScheme => "bad-scheme",
            Self::EmptyPayload => "empty-payload",
            Self::BadEncoding { .. } => "bad-encoding",
            Self::NoAssertion { .. } => "no-assertion",
            Self::SignatureInvalid { .. } => "signature-invalid",
            Self::IssuerMismatch { .. } => "issuer-mismatch",
            Self::BadTimestamp { .. } => "bad-timestamp",
            Self::NotYetValid { .. } => "not-yet-valid",
            Self::Expired { .. } => "expired",
            Self::Configuration { .. } => "configuration",
        }
    }

    /// `true` for reasons a request can trigger (everything except startup
    /// configuration defects).
    pub fn is_request_error(&self) -> bool {
        !matches!(self, Self::Configuration { .. })
    }
}

/// Convenience result type for validation operations.
pub type Result<T> = std::result::Result<T, AuthError>;

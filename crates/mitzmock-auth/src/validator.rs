//! SAML assertion validation.
//!
//! Assertions arrive base64-encoded in the `Authorization: SAML <base64>`
//! header. Validation is stateless: it reads the request bytes and the
//! immutable trust-anchor configuration, so one validator is shared by all
//! concurrent requests without locking.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use mitzmock_core::xml;
use roxmltree::Document;
use rsa::RsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use x509_cert::Certificate;
use x509_cert::der::{DecodePem, Encode};

use crate::error::{AuthError, Result};
use crate::xmldsig;

/// Validator configuration, taken from the process configuration at startup.
#[derive(Debug, Clone)]
pub struct SamlValidatorConfig {
    /// When `false` the validator accepts every request untouched.
    pub enabled: bool,
    /// PEM-encoded trust-anchor certificate of the expected signer.
    pub signing_cert_pem: Vec<u8>,
    /// Expected `Issuer` text; empty skips the issuer check.
    pub expected_issuer: String,
    /// Tolerance applied on both validity-window boundaries.
    pub clock_skew: time::Duration,
}

impl Default for SamlValidatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            signing_cert_pem: Vec::new(),
            expected_issuer: String::new(),
            clock_skew: time::Duration::ZERO,
        }
    }
}

/// Validates SAML assertions extracted from Authorization headers.
pub struct SamlValidator {
    enabled: bool,
    trust_anchor: Option<RsaPublicKey>,
    expected_issuer: String,
    clock_skew: time::Duration,
}

impl SamlValidator {
    /// Build a validator. Fails only when validation is enabled and the
    /// trust-anchor certificate cannot be parsed.
    pub fn new(config: SamlValidatorConfig) -> Result<Self> {
        let trust_anchor = if config.enabled {
            Some(parse_trust_anchor(&config.signing_cert_pem)?)
        } else {
            None
        };
        Ok(Self {
            enabled: config.enabled,
            trust_anchor,
            expected_issuer: config.expected_issuer,
            clock_skew: config.clock_skew,
        })
    }

    /// An inert validator; every request passes.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            trust_anchor: None,
            expected_issuer: String::new(),
            clock_skew: time::Duration::ZERO,
        }
    }

    /// Whether assertion validation is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Validate the `Authorization` header value against the current time.
    pub fn validate_header(&self, header: Option<&str>) -> Result<()> {
        self.validate_header_at(header, OffsetDateTime::now_utc())
    }

    /// Validate the `Authorization` header value against an explicit `now`,
    /// so validity-window boundaries are testable.
    pub fn validate_header_at(&self, header: Option<&str>, now: OffsetDateTime) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let header = header.ok_or(AuthError::MissingHeader)?;
        let payload = header
            .strip_prefix("SAML ")
            .ok_or(AuthError::BadScheme)?;
        if payload.is_empty() {
            return Err(AuthError::EmptyPayload);
        }
        let xml_bytes = BASE64
            .decode(payload)
            .map_err(|e| AuthError::bad_encoding(e.to_string()))?;

        self.validate_assertion_at(&xml_bytes, now)
    }

    /// Full assertion validation:
    /// 1. parse the XML and locate the `Assertion` element (prefix-agnostic)
    /// 2. verify the enveloped signature against the trust anchor
    /// 3. check the `Issuer` text, when one is configured
    /// 4. check `Conditions` `NotBefore`/`NotOnOrAfter` with clock skew
    pub fn validate_assertion_at(&self, xml_bytes: &[u8], now: OffsetDateTime) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let Some(trust_anchor) = &self.trust_anchor else {
            return Ok(());
        };

        let text = std::str::from_utf8(xml_bytes)
            .map_err(|e| AuthError::no_assertion(format!("payload is not UTF-8: {e}")))?;
        let doc = Document::parse(text)
            .map_err(|e| AuthError::no_assertion(format!("payload is not XML: {e}")))?;
        let assertion = xml::first_descendant(doc.root_element(), "Assertion")
            .ok_or_else(|| AuthError::no_assertion("document holds no Assertion element"))?;

        xmldsig::verify_enveloped(assertion, trust_anchor)?;

        if !self.expected_issuer.is_empty() {
            let issuer = xml::child_text(assertion, "Issuer");
            if issuer != Some(self.expected_issuer.as_str()) {
                return Err(AuthError::IssuerMismatch {
                    expected: self.expected_issuer.clone(),
                    got: issuer.map(str::to_string),
                });
            }
        }

        if let Some(conditions) = xml::child(assertion, "Conditions") {
            if let Some(not_before) = xml::attr(conditions, "NotBefore") {
                let bound = parse_timestamp(not_before)?;
                if now + self.clock_skew < bound {
                    return Err(AuthError::NotYetValid {
                        not_before: not_before.to_string(),
                    });
                }
            }
            if let Some(not_on_or_after) = xml::attr(conditions, "NotOnOrAfter") {
                let bound = parse_timestamp(not_on_or_after)?;
                if now - self.clock_skew > bound {
                    return Err(AuthError::Expired {
                        not_on_or_after: not_on_or_after.to_string(),
                    });
                }
            }
        }
        // No Conditions element means no temporal restriction; this is a
        // test double, not a production verifier.

        Ok(())
    }
}

fn parse_timestamp(value: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|e| AuthError::bad_timestamp(format!("{value}: {e}")))
}

/// Extract the RSA public key from a PEM-encoded certificate.
fn parse_trust_anchor(pem: &[u8]) -> Result<RsaPublicKey> {
    let certificate = Certificate::from_pem(pem)
        .map_err(|e| AuthError::configuration(format!("unparseable trust-anchor PEM: {e}")))?;
    let spki = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| AuthError::configuration(format!("unencodable public key info: {e}")))?;
    RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| AuthError::configuration(format!("trust anchor is not an RSA key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_validator_accepts_anything() {
        let validator = SamlValidator::disabled();
        assert!(!validator.is_enabled());
        assert!(validator.validate_header(None).is_ok());
        assert!(validator.validate_header(Some("Bearer xyz")).is_ok());
    }

    #[test]
    fn test_new_disabled_skips_certificate_parsing() {
        let validator = SamlValidator::new(SamlValidatorConfig::default()).unwrap();
        assert!(!validator.is_enabled());
    }

    #[test]
    fn test_enabled_requires_parseable_certificate() {
        let err = SamlValidator::new(SamlValidatorConfig {
            enabled: true,
            signing_cert_pem: b"not a pem".to_vec(),
            ..SamlValidatorConfig::default()
        })
        .unwrap_err();
        assert_eq!(err.reason_code(), "configuration");
    }
}

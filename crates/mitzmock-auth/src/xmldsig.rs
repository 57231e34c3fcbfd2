//! Enveloped XML-DSig verification.
//!
//! Verifies the signature embedded in a SAML assertion against a single
//! trust-anchor key. The digest and signature algorithms are negotiated from
//! the `SignedInfo` metadata; the reference is resolved within the document;
//! the enveloped-signature transform and canonicalization are applied before
//! digesting. There is deliberately no trust-chain building — the anchor is
//! the one configured certificate.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use mitzmock_core::xml;
use roxmltree::Node;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::c14n;
use crate::error::{AuthError, Result};

pub const ALG_RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
pub const ALG_RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
pub const ALG_RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";

pub const ALG_DIGEST_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const ALG_DIGEST_SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const ALG_DIGEST_SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

pub const ALG_ENVELOPED: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
pub const ALG_EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const ALG_C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";

/// Verify the enveloped signature over `element` against `key`.
///
/// Any defect — missing signature, unknown algorithm, dangling reference,
/// digest mismatch, or signature mismatch — is a single `SignatureInvalid`
/// reason with a distinguishing message.
pub fn verify_enveloped(element: Node, key: &RsaPublicKey) -> Result<()> {
    let signature = xml::child(element, "Signature")
        .ok_or_else(|| AuthError::signature_invalid("no Signature element"))?;
    let signed_info = xml::child(signature, "SignedInfo")
        .ok_or_else(|| AuthError::signature_invalid("no SignedInfo element"))?;

    let c14n_alg = xml::child(signed_info, "CanonicalizationMethod")
        .and_then(|n| xml::attr(n, "Algorithm"))
        .ok_or_else(|| AuthError::signature_invalid("no CanonicalizationMethod"))?;
    if c14n_alg != ALG_EXC_C14N && c14n_alg != ALG_C14N {
        return Err(AuthError::signature_invalid(format!(
            "unsupported canonicalization algorithm {c14n_alg}"
        )));
    }

    let signature_alg = xml::child(signed_info, "SignatureMethod")
        .and_then(|n| xml::attr(n, "Algorithm"))
        .ok_or_else(|| AuthError::signature_invalid("no SignatureMethod"))?;

    let reference = xml::child(signed_info, "Reference")
        .ok_or_else(|| AuthError::signature_invalid("no Reference element"))?;
    check_reference_target(element, reference)?;
    check_transforms(reference)?;

    let digest_alg = xml::first_descendant(reference, "DigestMethod")
        .and_then(|n| xml::attr(n, "Algorithm"))
        .ok_or_else(|| AuthError::signature_invalid("no DigestMethod"))?;
    let expected_digest = xml::child_text(reference, "DigestValue")
        .ok_or_else(|| AuthError::signature_invalid("no DigestValue"))
        .and_then(decode_base64)?;

    // Enveloped transform: the signed content is the element subtree with
    // the Signature itself removed.
    let content = c14n::canonicalize_excluding(element, signature);
    let actual_digest = digest(digest_alg, content.as_bytes())?;
    if actual_digest != expected_digest {
        return Err(AuthError::signature_invalid("reference digest mismatch"));
    }

    let signature_value = xml::child_text(signature, "SignatureValue")
        .ok_or_else(|| AuthError::signature_invalid("no SignatureValue"))
        .and_then(decode_base64)?;
    let signed_info_c14n = c14n::canonicalize(signed_info);
    verify_rsa(signature_alg, key, signed_info_c14n.as_bytes(), &signature_value)
}

/// The reference must resolve to the signed element: either a same-document
/// reference (`URI=""`) or a pointer at the element's own `ID`.
fn check_reference_target(element: Node, reference: Node) -> Result<()> {
    let uri = xml::attr(reference, "URI").unwrap_or("");
    if uri.is_empty() {
        return Ok(());
    }
    let id = xml::attr(element, "ID").unwrap_or("");
    if uri.strip_prefix('#') == Some(id) && !id.is_empty() {
        return Ok(());
    }
    Err(AuthError::signature_invalid(format!(
        "reference {uri} does not target the signed element"
    )))
}

/// When a transform list is present it must include the enveloped-signature
/// transform; canonicalization transforms are accepted alongside it.
fn check_transforms(reference: Node) -> Result<()> {
    let Some(transforms) = xml::child(reference, "Transforms") else {
        return Ok(());
    };
    let mut enveloped = false;
    for transform in xml::children(transforms, "Transform") {
        match xml::attr(transform, "Algorithm") {
            Some(ALG_ENVELOPED) => enveloped = true,
            Some(ALG_EXC_C14N) | Some(ALG_C14N) => {}
            Some(other) => {
                return Err(AuthError::signature_invalid(format!(
                    "unsupported transform {other}"
                )));
            }
            None => return Err(AuthError::signature_invalid("transform without algorithm")),
        }
    }
    if enveloped {
        Ok(())
    } else {
        Err(AuthError::signature_invalid(
            "missing enveloped-signature transform",
        ))
    }
}

fn digest(algorithm: &str, data: &[u8]) -> Result<Vec<u8>> {
    match algorithm {
        ALG_DIGEST_SHA1 => Ok(Sha1::digest(data).to_vec()),
        ALG_DIGEST_SHA256 => Ok(Sha256::digest(data).to_vec()),
        ALG_DIGEST_SHA512 => Ok(Sha512::digest(data).to_vec()),
        other => Err(AuthError::signature_invalid(format!(
            "unsupported digest algorithm {other}"
        ))),
    }
}

fn verify_rsa(algorithm: &str, key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> Result<()> {
    let result = match algorithm {
        ALG_RSA_SHA1 => key.verify(
            Pkcs1v15Sign::new::<Sha1>(),
            &Sha1::digest(data),
            signature,
        ),
        ALG_RSA_SHA256 => key.verify(
            Pkcs1v15Sign::new::<Sha256>(),
            &Sha256::digest(data),
            signature,
        ),
        ALG_RSA_SHA512 => key.verify(
            Pkcs1v15Sign::new::<Sha512>(),
            &Sha512::digest(data),
            signature,
        ),
        other => {
            return Err(AuthError::signature_invalid(format!(
                "unsupported signature algorithm {other}"
            )));
        }
    };
    result.map_err(|e| AuthError::signature_invalid(format!("signature mismatch: {e}")))
}

/// XML base64 values may carry line breaks; strip whitespace before decoding.
fn decode_base64(value: &str) -> Result<Vec<u8>> {
    let compact: String = value.split_whitespace().collect();
    BASE64
        .decode(compact)
        .map_err(|e| AuthError::signature_invalid(format!("undecodable base64 value: {e}")))
}

//! Identifier extraction for the three registry dialects.
//!
//! Each parser takes raw body bytes and pulls out the subject BSN plus the
//! secondary fields its dialect carries. Extraction is structural only; no
//! schema validation happens here. What the registry would answer for a
//! given extraction is decided separately in [`crate::scenario`].

pub mod fhir;
pub mod xacml;
pub mod xcpd;

pub use fhir::{BundleRequest, SubscriptionRequest, TransactionKind};
pub use xacml::XacmlQuery;
pub use xcpd::XcpdQuery;

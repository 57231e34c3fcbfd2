//! Response synthesis.
//!
//! Each renderer is a typed builder producing the wire payload for one
//! response family. Correlation ids and timestamps are generated fresh per
//! call; everything else is a pure function of the scenario data.

pub mod fhir;
pub mod soap;

pub use fhir::FHIR_CONTENT_TYPE;
pub use soap::SOAP_CONTENT_TYPE;

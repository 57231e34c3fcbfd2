pub mod error;
pub mod extract;
pub mod scenario;
pub mod xml;

pub use error::{CoreError, Result};
pub use extract::{BundleRequest, SubscriptionRequest, TransactionKind, XacmlQuery, XcpdQuery};
pub use scenario::{
    CareLocation, Decision, DecisionEntry, IssueOutcome, ScenarioOutcome, SoapFault,
};

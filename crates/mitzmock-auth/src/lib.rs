pub mod c14n;
pub mod error;
pub mod validator;
pub mod xmldsig;

pub use error::{AuthError, Result};
pub use validator::{SamlValidator, SamlValidatorConfig};

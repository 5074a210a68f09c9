pub mod constants;
pub mod profile;
pub mod types;
pub mod validator;

pub use profile::PlayerValidationProfile;
pub use types::{PositionUpdate, Rule, Severity, Violation};
pub use validator::Validator;

pub mod config;
pub mod error;
pub mod params;
pub mod response;
pub mod types;
pub mod validation;

pub use config::Config;
pub use error::{DevflowError, ErrorKind};
pub use params::*;
pub use response::{ActionError, ActionResponse};
pub use types::*;
pub use validation::{FieldErrors, Validate};

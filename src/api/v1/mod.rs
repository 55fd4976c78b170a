mod basic_auth;
mod error;
mod handler;
mod router;

pub use basic_auth::{CredentialFormatError, Unauthorized, parse_basic_header, with_basic_auth};
pub use error::recover_error;
pub use handler::ApiResponse;
pub use router::routes;

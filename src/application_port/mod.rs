mod auth_service;
mod session_state;
mod storage_accessor;

pub use auth_service::*;
pub use session_state::*;
pub use storage_accessor::*;

mod basic_authenticator;
mod storage_channel;
mod storage_handler;
mod token_issuer;

pub use basic_authenticator::*;
pub use storage_channel::*;
pub use storage_handler::*;
pub use token_issuer::*;

mod auth_service_impl;
mod basic_authenticator_fake;
mod basic_authenticator_impl;
mod state_provider_impl;
mod storage_accessor_impl;
mod token_issuer_fake;

pub use auth_service_impl::*;
pub use basic_authenticator_fake::*;
pub use basic_authenticator_impl::*;
pub use state_provider_impl::*;
pub use storage_accessor_impl::*;
pub use token_issuer_fake::*;

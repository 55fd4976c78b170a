use super::SessionError;
use crate::domain_model::{AppIdentity, LoginCredential};
use crate::domain_port::IssuerError;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("token issuer error: {0}")]
    Issuer(#[from] IssuerError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, credential: LoginCredential) -> Result<(), AuthError>;

    async fn logout(&self);

    async fn current_identity(&self) -> Arc<AppIdentity>;
}

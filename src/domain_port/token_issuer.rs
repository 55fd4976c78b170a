use crate::domain_model::LoginCredential;

#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    #[error("credentials rejected")]
    Rejected,
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Exchanges credentials for a signed token.
#[async_trait::async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, credential: &LoginCredential) -> Result<String, IssuerError>;
}

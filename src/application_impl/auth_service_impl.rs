use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::TokenIssuer;
use std::sync::Arc;

pub struct AppAuthService {
    issuer: Arc<dyn TokenIssuer>,
    provider: Arc<dyn AuthStateProvider>,
    options: IdentityOptions,
}

impl AppAuthService {
    pub fn new(
        issuer: Arc<dyn TokenIssuer>,
        provider: Arc<dyn AuthStateProvider>,
        options: IdentityOptions,
    ) -> Self {
        Self {
            issuer,
            provider,
            options,
        }
    }
}

#[async_trait::async_trait]
impl AuthService for AppAuthService {
    async fn login(&self, credential: LoginCredential) -> Result<(), AuthError> {
        if credential.username.trim().is_empty() || credential.password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issuer.issue(&credential).await?;
        let identity = AppIdentity::parse(Some(&token), &self.options);
        self.provider.login(identity).await?;
        Ok(())
    }

    async fn logout(&self) {
        self.provider.logout().await
    }

    async fn current_identity(&self) -> Arc<AppIdentity> {
        self.provider.current_state().await
    }
}

use crate::domain_model::{IdentityOptions, LoginCredential};
use crate::domain_port::*;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Map, Value};
use std::time::Duration;

/// Development stand-in for the identity provider: signs an HS256 token for any
/// credential, named after the username.
pub struct FakeTokenIssuer {
    secret: Vec<u8>,
    roles: Vec<String>,
    ttl: Duration,
    options: IdentityOptions,
}

impl FakeTokenIssuer {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            roles: Vec::new(),
            ttl: Duration::from_secs(60 * 60),
            options: IdentityOptions::default(),
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_identity_options(mut self, options: IdentityOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sign_claims(&self, claims: &Map<String, Value>) -> Result<String, IssuerError> {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| IssuerError::InternalError(e.into()))
    }
}

#[async_trait::async_trait]
impl TokenIssuer for FakeTokenIssuer {
    async fn issue(&self, credential: &LoginCredential) -> Result<String, IssuerError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX / 2);

        let mut claims = Map::new();
        claims.insert(
            self.options.name_claim.clone(),
            Value::from(credential.username.clone()),
        );
        match self.roles.as_slice() {
            [] => {}
            [role] => {
                claims.insert(self.options.role_claim.clone(), Value::from(role.clone()));
            }
            roles => {
                claims.insert(self.options.role_claim.clone(), Value::from(roles.to_vec()));
            }
        }
        claims.insert("iat".into(), Value::from(now));
        claims.insert("nbf".into(), Value::from(now));
        claims.insert("exp".into(), Value::from(now.saturating_add(ttl)));

        self.sign_claims(&claims)
    }
}

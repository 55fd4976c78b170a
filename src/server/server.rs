use super::Session;
use crate::application_impl::*;
use crate::domain_model::IdentityOptions;
use crate::domain_port::*;
use crate::infra::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::{anyhow, bail};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Process-wide services. Session scopes are created per caller with [`Server::new_session`].
pub struct Server {
    pub authenticator: Arc<dyn BasicAuthenticator>,
    pub storage: Arc<dyn StorageHandler>,
    pub issuer: Arc<dyn TokenIssuer>,
    pub identity_options: IdentityOptions,
    pub realm: String,
    pub port: u16,
    redis_channel: Option<Arc<RedisStorageChannel>>,
    cancel: CancellationToken,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let address: std::net::SocketAddr = settings.http.address.parse()?;

        let mut redis_channel = None;
        let channel: Arc<dyn StorageChannel> = match settings.storage.backend.as_str() {
            "redis" => {
                let url = settings
                    .storage
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("storage.redis_url is required for the redis backend"))?;
                let redis =
                    Arc::new(RedisStorageChannel::connect(url, settings.storage.prefix.clone()).await?);
                redis_channel = Some(redis.clone());
                redis as Arc<dyn StorageChannel>
            }
            "fake" => Arc::new(FakeStorageChannel::new()),
            other => bail!("unknown storage backend: {other}"),
        };
        let storage: Arc<dyn StorageHandler> = Arc::new(
            ChannelStorageHandler::new(channel, Arc::new(MemoryStorageHandler::new()))
                .with_options(settings.storage.options()),
        );

        let gateway = &settings.gateway;
        let authenticator: Arc<dyn BasicAuthenticator> = match gateway.backend.as_str() {
            "real" => Arc::new(Argon2BasicAuthenticator::new(
                gateway.users.clone(),
                gateway.exempt_paths.clone(),
                gateway.challenge,
            )),
            "fake" => Arc::new(FakeBasicAuthenticator::new()),
            other => bail!("unknown gateway backend: {other}"),
        };

        let key = std::env::var("WARDEN_SIGNING_KEY")
            .unwrap_or_else(|_| settings.issuer.secret.clone())
            .into_bytes();
        let issuer: Arc<dyn TokenIssuer> = Arc::new(
            FakeTokenIssuer::new(key)
                .with_roles(settings.issuer.roles.clone())
                .with_ttl(Duration::from_secs(settings.issuer.ttl_secs))
                .with_identity_options(settings.identity.clone()),
        );

        info!(
            storage = %settings.storage.backend,
            kind = %settings.storage.kind,
            gateway = %gateway.backend,
            "server started"
        );

        Ok(Self {
            authenticator,
            storage,
            issuer,
            identity_options: settings.identity.clone(),
            realm: gateway.realm.clone(),
            port: address.port(),
            redis_channel,
            cancel: CancellationToken::new(),
        })
    }

    /// A fresh session scope over the shared storage backend.
    pub fn new_session(&self) -> Session {
        Session::new(
            self.storage.clone(),
            self.issuer.clone(),
            self.identity_options.clone(),
            self.cancel.child_token(),
        )
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();
        if let Some(redis) = &self.redis_channel {
            redis.shutdown();
        }
    }
}

use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Lifetime of a value stored without any expiry.
pub const DEFAULT_VALUE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
/// Lifetime of a session token stored without an expiry.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct StorageAccessorImpl {
    handler: Arc<dyn StorageHandler>,
}

impl StorageAccessorImpl {
    pub fn new(handler: Arc<dyn StorageHandler>) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &Arc<dyn StorageHandler> {
        &self.handler
    }
}

/// Absolute expiry wins; otherwise `now + relative` (thirty days when absent). The
/// relative duration travels along so backends can honour either form.
fn resolve_expiry(
    absolute: Option<DateTime<Utc>>,
    relative: Option<Duration>,
) -> (DateTime<Utc>, Option<Duration>) {
    if let Some(at) = absolute {
        return (at, None);
    }
    let ttl = relative.unwrap_or(DEFAULT_VALUE_TTL);
    let at = chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (at, Some(ttl))
}

#[async_trait::async_trait]
impl StorageAccessor for StorageAccessorImpl {
    async fn get_text(&self, key: &str, cancel: &CancellationToken) -> Option<String> {
        match self.handler.invoke(StorageCommand::get(key), cancel).await {
            Ok(Value::Null) => None,
            Ok(Value::String(text)) => Some(text),
            Ok(other) => Some(other.to_string()),
            Err(e) => {
                tracing::error!(key, error = %e, "storage read failed");
                None
            }
        }
    }

    async fn set_text(
        &self,
        key: &str,
        text: String,
        absolute_expiry: Option<DateTime<Utc>>,
        relative_expiry: Option<Duration>,
        cancel: &CancellationToken,
    ) {
        let (expires_at, ttl) = resolve_expiry(absolute_expiry, relative_expiry);
        let command = StorageCommand::set(key, text, Some(expires_at), ttl);
        if let Err(e) = self.handler.invoke_void(command, cancel).await {
            tracing::error!(key, error = %e, "storage write failed");
        }
    }

    async fn remove_value(&self, key: &str, cancel: &CancellationToken) {
        if let Err(e) = self.handler.invoke_void(StorageCommand::delete(key), cancel).await {
            tracing::error!(key, error = %e, "storage delete failed");
        }
    }

    async fn clear_all(&self, cancel: &CancellationToken) {
        if let Err(e) = self.handler.invoke_void(StorageCommand::clear(), cancel).await {
            tracing::error!(error = %e, "storage clear failed");
        }
    }

    async fn set_token(
        &self,
        token: &str,
        expiry: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) {
        let relative = expiry.is_none().then_some(DEFAULT_TOKEN_TTL);
        self.set_text(TOKEN_KEY, token.to_string(), expiry, relative, cancel)
            .await
    }

    fn set_options(&self, options: StorageOptions) {
        tracing::debug!(kind = %options.kind, "storage options changed");
        self.handler.set_options(options);
    }

    async fn start_listening(&self, listener: ChangeListener, until: CancellationToken) -> bool {
        match self.handler.start_listening(listener, until).await {
            Ok(()) => true,
            Err(e @ StorageError::Unsupported { .. }) => {
                tracing::debug!(error = %e, "storage change notifications unavailable");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to register storage listener");
                false
            }
        }
    }
}

use crate::domain_model::StorageOptions;
use crate::domain_port::ChangeListener;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Well-known key of the session token record.
pub const TOKEN_KEY: &str = "token";

/// Best-effort storage façade. Nothing here returns an error: failures are logged by the
/// implementation and surface as an absent value.
#[async_trait::async_trait]
pub trait StorageAccessor: Send + Sync {
    async fn get_text(&self, key: &str, cancel: &CancellationToken) -> Option<String>;

    /// Stores `text` under `key`, expiring at `absolute_expiry`, else after
    /// `relative_expiry`, else after thirty days.
    async fn set_text(
        &self,
        key: &str,
        text: String,
        absolute_expiry: Option<DateTime<Utc>>,
        relative_expiry: Option<Duration>,
        cancel: &CancellationToken,
    );

    async fn remove_value(&self, key: &str, cancel: &CancellationToken);

    async fn clear_all(&self, cancel: &CancellationToken);

    async fn get_token(&self, cancel: &CancellationToken) -> Option<String> {
        self.get_text(TOKEN_KEY, cancel).await
    }

    /// Persists the session token; without `expiry` it lives for one day.
    async fn set_token(
        &self,
        token: &str,
        expiry: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    );

    async fn remove_token(&self, cancel: &CancellationToken) {
        self.remove_value(TOKEN_KEY, cancel).await
    }

    fn set_options(&self, options: StorageOptions);

    /// Returns whether the backend accepted the listener. It stays registered until
    /// `until` is cancelled.
    async fn start_listening(&self, listener: ChangeListener, until: CancellationToken) -> bool;
}

/// Typed reads and writes on top of [`StorageAccessor`].
///
/// Strings are stored verbatim, everything else as JSON text. Reads parse the text as
/// JSON first and fall back to treating it as a bare string.
#[async_trait::async_trait]
pub trait StorageAccessorExt: StorageAccessor {
    async fn get_value<T>(&self, key: &str, cancel: &CancellationToken) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        let text = self.get_text(key, cancel).await?;
        decode_text(key, text)
    }

    async fn set_value<T>(
        &self,
        key: &str,
        value: &T,
        absolute_expiry: Option<DateTime<Utc>>,
        relative_expiry: Option<Duration>,
        cancel: &CancellationToken,
    ) where
        T: Serialize + Sync + ?Sized,
    {
        let Some(text) = encode_text(key, value) else {
            return;
        };
        self.set_text(key, text, absolute_expiry, relative_expiry, cancel)
            .await
    }
}

impl<A: StorageAccessor + ?Sized> StorageAccessorExt for A {}

fn encode_text<T: Serialize + ?Sized>(key: &str, value: &T) -> Option<String> {
    match serde_json::to_value(value) {
        Ok(Value::String(text)) => Some(text),
        Ok(other) => Some(other.to_string()),
        Err(e) => {
            tracing::error!(key, error = %e, "failed to serialize storage value");
            None
        }
    }
}

fn decode_text<T: DeserializeOwned>(key: &str, text: String) -> Option<T> {
    let err = match serde_json::from_str(&text) {
        Ok(value) => return Some(value),
        Err(e) => e,
    };
    let empty = text.is_empty();
    match serde_json::from_value(Value::String(text)) {
        Ok(value) => Some(value),
        Err(_) => {
            if !empty {
                tracing::error!(key, error = %err, "failed to deserialize storage value");
            }
            None
        }
    }
}

use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

struct MemoryEntry {
    value: Value,
    expires_at: DateTime<Utc>,
    generation: CancellationToken,
}

impl MemoryEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.generation.is_cancelled() && now < self.expires_at
    }
}

/// In-process backend with per-entry expiry and O(1) bulk invalidation.
///
/// Every entry is tagged with the invalidation token current at write time. `Clear`
/// swaps in a fresh token and cancels the old one, which makes every tagged entry
/// unreachable at once; the stale entries are swept on a background task.
pub struct MemoryStorageHandler {
    entries: Arc<DashMap<String, MemoryEntry>>,
    reset_token: Mutex<CancellationToken>,
    options: RwLock<StorageOptions>,
}

impl Default for MemoryStorageHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorageHandler {
    pub fn new() -> Self {
        Self::with_options(StorageOptions::memory())
    }

    pub fn with_options(options: StorageOptions) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            reset_token: Mutex::new(CancellationToken::new()),
            options: RwLock::new(options),
        }
    }

    /// Number of stored entries, including ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn generation(&self) -> CancellationToken {
        match self.reset_token.lock() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn rotate(&self) {
        let previous = {
            let mut token = match self.reset_token.lock() {
                Ok(token) => token,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::replace(&mut *token, CancellationToken::new())
        };
        previous.cancel();

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let entries = self.entries.clone();
            runtime.spawn(async move {
                entries.retain(|_, entry| !entry.generation.is_cancelled());
            });
        }
    }

    fn get(&self, key: &str) -> Result<Value, StorageError> {
        let now = Utc::now();
        let state = self
            .entries
            .get(key)
            .map(|entry| (entry.is_live(now), entry.value.clone()));
        match state {
            Some((true, value)) => Ok(value),
            Some((false, _)) => {
                self.entries.remove_if(key, |_, entry| !entry.is_live(now));
                Err(StorageError::NotFound(key.to_string()))
            }
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    fn set(&self, command: &StorageCommand) -> Result<(), StorageError> {
        let key = command.key().ok_or(CommandError::InvalidKey)?;
        let value = command.value().cloned().ok_or(CommandError::MissingValue)?;

        let now = Utc::now();
        let expires_at = if let Some(at) = command
            .absolute_expiry_ms()
            .and_then(DateTime::from_timestamp_millis)
        {
            at
        } else {
            let ms = command
                .relative_expiry_ms()
                .map(|ms| ms.max(0))
                .unwrap_or_else(|| duration_millis(self.options().default_expiration));
            chrono::Duration::try_milliseconds(ms)
                .and_then(|ttl| now.checked_add_signed(ttl))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        };

        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at,
                generation: self.generation(),
            },
        );
        Ok(())
    }

    fn dispatch(&self, command: StorageCommand) -> Result<Value, StorageError> {
        match command.kind() {
            CommandKind::Get => self.get(command.key().ok_or(CommandError::InvalidKey)?),
            CommandKind::Set => self.set(&command).map(|_| Value::Null),
            CommandKind::Delete => {
                let key = command.key().ok_or(CommandError::InvalidKey)?;
                self.entries.remove(key);
                Ok(Value::Null)
            }
            CommandKind::Clear => {
                self.rotate();
                Ok(Value::Null)
            }
            CommandKind::Listen => Err(StorageError::Unsupported {
                command: CommandKind::Listen,
                kind: StorageKind::Memory,
            }),
        }
    }
}

#[async_trait::async_trait]
impl StorageHandler for MemoryStorageHandler {
    async fn invoke(
        &self,
        command: StorageCommand,
        cancel: &CancellationToken,
    ) -> Result<Value, StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        self.dispatch(command)
    }

    async fn invoke_void(
        &self,
        command: StorageCommand,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        self.dispatch(command).map(|_| ())
    }

    fn set_options(&self, options: StorageOptions) {
        match self.options.write() {
            Ok(mut current) => *current = options,
            Err(poisoned) => *poisoned.into_inner() = options,
        }
    }

    fn options(&self) -> StorageOptions {
        match self.options.read() {
            Ok(options) => *options,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    async fn read(handler: &MemoryStorageHandler, key: &str) -> Result<Value, StorageError> {
        handler
            .invoke(StorageCommand::get(key), &CancellationToken::new())
            .await
    }

    async fn write(handler: &MemoryStorageHandler, command: StorageCommand) {
        handler
            .invoke_void(command, &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let handler = MemoryStorageHandler::new();
        write(&handler, StorageCommand::set("k", "v", None, None)).await;
        assert_eq!(read(&handler, "k").await.unwrap(), json!("v"));
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let handler = MemoryStorageHandler::new();
        assert!(matches!(
            read(&handler, "nope").await,
            Err(StorageError::NotFound(key)) if key == "nope"
        ));
    }

    #[tokio::test]
    async fn wrong_type_is_a_mismatch() {
        let handler = MemoryStorageHandler::new();
        write(&handler, StorageCommand::set("n", 42, None, None)).await;

        let cancel = CancellationToken::new();
        let result = invoke_as::<_, String>(&handler, StorageCommand::get("n"), &cancel).await;
        assert!(matches!(result, Err(StorageError::TypeMismatch { key, .. }) if key == "n"));

        let number: i64 = invoke_as(&handler, StorageCommand::get("n"), &cancel)
            .await
            .unwrap();
        assert_eq!(number, 42);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let handler = MemoryStorageHandler::new();
        write(&handler, StorageCommand::set("k", "v", None, None)).await;
        write(&handler, StorageCommand::delete("k")).await;
        write(&handler, StorageCommand::delete("k")).await;
        assert!(matches!(read(&handler, "k").await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn clear_invalidates_every_entry_without_delete() {
        let handler = MemoryStorageHandler::new();
        for key in ["a", "b", "c"] {
            write(&handler, StorageCommand::set(key, key, None, None)).await;
        }
        write(&handler, StorageCommand::clear()).await;

        for key in ["a", "b", "c"] {
            assert!(matches!(read(&handler, key).await, Err(StorageError::NotFound(_))));
        }

        write(&handler, StorageCommand::set("a", "again", None, None)).await;
        assert_eq!(read(&handler, "a").await.unwrap(), json!("again"));
    }

    #[tokio::test]
    async fn absolute_expiry_wins_over_relative() {
        let handler = MemoryStorageHandler::new();
        let past = Utc::now() - chrono::Duration::seconds(5);
        write(
            &handler,
            StorageCommand::set("k", "v", Some(past), Some(Duration::from_secs(3600))),
        )
        .await;
        assert!(matches!(read(&handler, "k").await, Err(StorageError::NotFound(_))));
        assert!(handler.is_empty());
    }

    #[tokio::test]
    async fn negative_relative_expiry_is_already_expired() {
        let handler = MemoryStorageHandler::new();
        let command = StorageCommand::try_new(
            CommandKind::Set,
            vec![json!("k"), json!("v"), Value::Null, json!(-5000)],
        )
        .unwrap();
        write(&handler, command).await;
        assert!(matches!(read(&handler, "k").await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn relative_then_default_expiry() {
        let handler = MemoryStorageHandler::new();
        write(
            &handler,
            StorageCommand::set("short", "v", None, Some(Duration::from_millis(20))),
        )
        .await;
        write(&handler, StorageCommand::set("default", "v", None, None)).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(read(&handler, "short").await, Err(StorageError::NotFound(_))));
        assert_eq!(read(&handler, "default").await.unwrap(), json!("v"));

        handler.set_options(StorageOptions::new(StorageKind::Memory, Duration::ZERO));
        write(&handler, StorageCommand::set("default", "v", None, None)).await;
        assert!(matches!(read(&handler, "default").await, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn set_requires_key_and_value() {
        let err = StorageCommand::try_new(CommandKind::Set, vec![json!("k")]).unwrap_err();
        assert!(matches!(err, CommandError::Arity { .. }));
    }

    #[tokio::test]
    async fn cancelled_dispatch_does_not_write() {
        let handler = MemoryStorageHandler::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = handler
            .invoke_void(StorageCommand::set("k", "v", None, None), &cancel)
            .await;
        assert!(matches!(result, Err(StorageError::Cancelled)));
        assert!(handler.is_empty());
    }

    #[tokio::test]
    async fn listen_is_unsupported() {
        let handler = MemoryStorageHandler::new();
        let result = handler
            .start_listening(Arc::new(|_key: Option<String>| {}), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(StorageError::Unsupported { .. })));
    }
}

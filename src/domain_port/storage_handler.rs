use crate::domain_model::*;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Invoked with the changed key, or `None` when the whole medium was cleared.
pub type ChangeListener = Arc<dyn Fn(Option<String>) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("value type conversion failed for: {key}")]
    TypeMismatch {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),
    #[error("{command} is not supported by {kind} storage")]
    Unsupported {
        command: CommandKind,
        kind: StorageKind,
    },
    #[error("storage operation cancelled")]
    Cancelled,
    #[error("channel error: {0}")]
    Channel(String),
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A storage backend speaking the command protocol.
///
/// `invoke` answers reads, `invoke_void` applies writes. Options are read on every
/// dispatch, so `set_options` takes effect on the next call.
#[async_trait::async_trait]
pub trait StorageHandler: Send + Sync {
    async fn invoke(
        &self,
        command: StorageCommand,
        cancel: &CancellationToken,
    ) -> Result<Value, StorageError>;

    async fn invoke_void(
        &self,
        command: StorageCommand,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError>;

    fn set_options(&self, options: StorageOptions);

    fn options(&self) -> StorageOptions;

    /// Registers `listener` for mutations reported by the medium (another tab or process).
    /// The registration lasts until `until` is cancelled.
    async fn start_listening(
        &self,
        listener: ChangeListener,
        until: CancellationToken,
    ) -> Result<(), StorageError> {
        drop((listener, until));
        Err(StorageError::Unsupported {
            command: CommandKind::Listen,
            kind: self.options().kind,
        })
    }
}

/// Typed read: a stored value that does not deserialize into `T` is a `TypeMismatch`.
pub async fn invoke_as<H, T>(
    handler: &H,
    command: StorageCommand,
    cancel: &CancellationToken,
) -> Result<T, StorageError>
where
    H: StorageHandler + ?Sized,
    T: DeserializeOwned,
{
    let key = command.key().unwrap_or_default().to_string();
    let value = handler.invoke(command, cancel).await?;
    serde_json::from_value(value).map_err(|source| StorageError::TypeMismatch { key, source })
}

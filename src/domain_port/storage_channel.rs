use super::{ChangeListener, StorageError};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// The external medium behind cookie/local backends, addressed by operation name.
#[async_trait::async_trait]
pub trait StorageChannel: Send + Sync {
    async fn invoke(&self, operation: &str, args: Vec<Value>) -> Result<Value, StorageError>;

    async fn invoke_void(&self, operation: &str, args: Vec<Value>) -> Result<(), StorageError>;

    /// Subscribes to change events until `until` is cancelled; the channel calls `listener`
    /// on its own task.
    async fn listen(
        &self,
        operation: &str,
        listener: ChangeListener,
        until: CancellationToken,
    ) -> Result<(), StorageError>;
}

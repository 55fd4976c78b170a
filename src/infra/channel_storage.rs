use super::{MemoryStorageHandler, OperationTable};
use crate::domain_model::*;
use crate::domain_port::*;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

/// Cookie/local backend: forwards commands to an external channel by operation name.
///
/// When configured for [`StorageKind::Memory`] every call is routed to the in-process
/// memory backend instead. The mode is read on every dispatch.
pub struct ChannelStorageHandler {
    channel: Arc<dyn StorageChannel>,
    memory: Arc<MemoryStorageHandler>,
    options: RwLock<StorageOptions>,
}

impl ChannelStorageHandler {
    pub fn new(channel: Arc<dyn StorageChannel>, memory: Arc<MemoryStorageHandler>) -> Self {
        Self {
            channel,
            memory,
            options: RwLock::new(StorageOptions::cookies()),
        }
    }

    pub fn with_options(self, options: StorageOptions) -> Self {
        self.set_options(options);
        self
    }

    fn table(&self, kind: StorageKind, command: CommandKind) -> Result<&'static str, StorageError> {
        OperationTable::for_kind(kind)
            .map(|table| table.operation(command))
            .ok_or(StorageError::Unsupported { command, kind })
    }
}

#[async_trait::async_trait]
impl StorageHandler for ChannelStorageHandler {
    async fn invoke(
        &self,
        command: StorageCommand,
        cancel: &CancellationToken,
    ) -> Result<Value, StorageError> {
        let options = self.options();
        if options.kind == StorageKind::Memory {
            return self.memory.invoke(command, cancel).await;
        }
        match command.kind() {
            CommandKind::Listen => {
                return Err(StorageError::Unsupported {
                    command: CommandKind::Listen,
                    kind: options.kind,
                });
            }
            CommandKind::Set | CommandKind::Delete | CommandKind::Clear => {
                return self.invoke_void(command, cancel).await.map(|_| Value::Null);
            }
            CommandKind::Get => {}
        }

        let operation = self.table(options.kind, CommandKind::Get)?;
        let key = command.key().map(str::to_string);
        let args = command.into_args();

        let value = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StorageError::Cancelled),
            result = self.channel.invoke(operation, args) => result?,
        };
        match (value, key) {
            (Value::Null, Some(key)) => Err(StorageError::NotFound(key)),
            (value, _) => Ok(value),
        }
    }

    // Writes are not raced against cancellation once dispatched. A cancelled write is
    // either refused up front or runs to completion.
    async fn invoke_void(
        &self,
        command: StorageCommand,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        let options = self.options();
        if options.kind == StorageKind::Memory {
            return self.memory.invoke_void(command, cancel).await;
        }
        let operation = self.table(options.kind, command.kind())?;
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }

        let args = command.or_default_expiry(options.default_expiration).into_args();
        self.channel.invoke_void(operation, args).await
    }

    fn set_options(&self, options: StorageOptions) {
        self.memory.set_options(StorageOptions::new(
            StorageKind::Memory,
            options.default_expiration,
        ));
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

    async fn start_listening(
        &self,
        listener: ChangeListener,
        until: CancellationToken,
    ) -> Result<(), StorageError> {
        let kind = self.options().kind;
        if kind == StorageKind::Memory {
            return self.memory.start_listening(listener, until).await;
        }
        let operation = self.table(kind, CommandKind::Listen)?;
        self.channel.listen(operation, listener, until).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::FakeStorageChannel;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    fn handler(kind: StorageKind) -> (Arc<FakeStorageChannel>, ChannelStorageHandler) {
        let channel = Arc::new(FakeStorageChannel::new());
        let handler = ChannelStorageHandler::new(channel.clone(), Arc::new(MemoryStorageHandler::new()))
            .with_options(StorageOptions::new(kind, Duration::from_secs(60)));
        (channel, handler)
    }

    #[tokio::test]
    async fn cookie_commands_use_cookie_operation_names() {
        let (channel, handler) = handler(StorageKind::Cookies);
        let cancel = CancellationToken::new();

        handler
            .invoke_void(StorageCommand::set("k", "v", None, None), &cancel)
            .await
            .unwrap();
        handler.invoke(StorageCommand::get("k"), &cancel).await.unwrap();
        handler.invoke_void(StorageCommand::delete("k"), &cancel).await.unwrap();
        handler.invoke_void(StorageCommand::clear(), &cancel).await.unwrap();

        let operations: Vec<String> = channel.calls().into_iter().map(|(op, _)| op).collect();
        assert_eq!(
            operations,
            vec![
                "cookieStorage.set",
                "cookieStorage.get",
                "cookieStorage.delete",
                "cookieStorage.clear",
            ]
        );
    }

    #[tokio::test]
    async fn set_without_expiry_carries_the_default() {
        let (channel, handler) = handler(StorageKind::Local);
        handler
            .invoke_void(StorageCommand::set("k", "v", None, None), &CancellationToken::new())
            .await
            .unwrap();

        let (operation, args) = channel.calls().remove(0);
        assert_eq!(operation, "storeLocally.set");
        assert_eq!(args, vec![json!("k"), json!("v"), Value::Null, json!(60_000)]);
    }

    #[tokio::test]
    async fn missing_key_from_channel_is_not_found() {
        let (_, handler) = handler(StorageKind::Local);
        let result = handler
            .invoke(StorageCommand::get("absent"), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(key)) if key == "absent"));
    }

    #[tokio::test]
    async fn memory_mode_bypasses_the_channel_and_switches_per_call() {
        let (channel, handler) = handler(StorageKind::Memory);
        let cancel = CancellationToken::new();

        handler
            .invoke_void(StorageCommand::set("k", "mem", None, None), &cancel)
            .await
            .unwrap();
        assert!(channel.calls().is_empty());
        assert_eq!(
            handler.invoke(StorageCommand::get("k"), &cancel).await.unwrap(),
            json!("mem")
        );

        handler.set_options(StorageOptions::new(StorageKind::Cookies, Duration::from_secs(60)));
        let result = handler.invoke(StorageCommand::get("k"), &cancel).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert_eq!(channel.calls().len(), 1);
    }

    #[tokio::test]
    async fn session_kind_is_unsupported() {
        let (_, handler) = handler(StorageKind::Session);
        let result = handler
            .invoke(StorageCommand::get("k"), &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(StorageError::Unsupported { kind: StorageKind::Session, .. })
        ));
    }

    #[tokio::test]
    async fn cancelled_write_is_refused_before_dispatch() {
        let (channel, handler) = handler(StorageKind::Cookies);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = handler
            .invoke_void(StorageCommand::set("k", "v", None, None), &cancel)
            .await;
        assert!(matches!(result, Err(StorageError::Cancelled)));
        assert!(channel.calls().is_empty());
    }

    struct SlowChannel(Arc<FakeStorageChannel>);

    #[async_trait::async_trait]
    impl StorageChannel for SlowChannel {
        async fn invoke(&self, operation: &str, args: Vec<Value>) -> Result<Value, StorageError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.0.invoke(operation, args).await
        }

        async fn invoke_void(&self, operation: &str, args: Vec<Value>) -> Result<(), StorageError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.0.invoke_void(operation, args).await
        }

        async fn listen(
            &self,
            operation: &str,
            listener: ChangeListener,
            until: CancellationToken,
        ) -> Result<(), StorageError> {
            self.0.listen(operation, listener, until).await
        }
    }

    #[tokio::test]
    async fn dispatched_write_through_invoke_outlives_cancellation() {
        let channel = Arc::new(FakeStorageChannel::new());
        let handler = ChannelStorageHandler::new(
            Arc::new(SlowChannel(channel.clone())),
            Arc::new(MemoryStorageHandler::new()),
        )
        .with_options(StorageOptions::new(StorageKind::Local, Duration::from_secs(60)));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = handler
            .invoke(StorageCommand::set("k", "v", None, None), &cancel)
            .await;

        assert_eq!(result.unwrap(), Value::Null);
        assert!(cancel.is_cancelled());
        assert_eq!(channel.peek("k"), Some(json!("v")));
    }

    #[tokio::test]
    async fn listener_receives_changed_keys() {
        let (channel, handler) = handler(StorageKind::Local);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let until = CancellationToken::new();
        handler
            .start_listening(
                Arc::new(move |key: Option<String>| {
                    sink.lock().unwrap().push(key);
                }),
                until.clone(),
            )
            .await
            .unwrap();

        channel
            .invoke_void("storeLocally.set", vec![json!("token"), json!("abc")])
            .await
            .unwrap();
        channel.invoke_void("storeLocally.clear", vec![]).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("token".to_string()), None]
        );
        assert_eq!(channel.listen_operations(), vec!["storeLocally.eventListener"]);

        until.cancel();
        channel
            .invoke_void("storeLocally.delete", vec![json!("token")])
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(channel.listener_count(), 0);
    }
}

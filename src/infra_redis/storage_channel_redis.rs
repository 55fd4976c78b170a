use crate::domain_port::*;
use crate::infra::operation_verb;
use chrono::Utc;
use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

const CLEAR_BATCH: usize = 500;

/// Durable key-value channel on Redis.
///
/// Keys live under `<prefix>:`. Change events come from keyspace notifications, so the
/// server needs `notify-keyspace-events` to include `K` plus the generic/string classes
/// (`Kg$x` is enough).
pub struct RedisStorageChannel {
    client: redis::Client,
    conn: ConnectionManager,
    prefix: String,
    shutdown: CancellationToken,
}

impl RedisStorageChannel {
    pub async fn connect(url: &str, prefix: impl Into<String>) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        Ok(Self {
            client,
            conn,
            prefix: prefix.into(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Stops every keyspace listener started by this channel.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    fn key_arg(&self, args: &[Value], operation: &str) -> Result<String, StorageError> {
        args.first()
            .and_then(Value::as_str)
            .map(|key| self.key(key))
            .ok_or_else(|| StorageError::Channel(format!("{operation} without key")))
    }

    async fn dispatch(&self, operation: &str, args: Vec<Value>) -> Result<Value, StorageError> {
        let mut conn = self.conn.clone();
        match operation_verb(operation) {
            "get" => {
                let key = self.key_arg(&args, operation)?;
                let value: Option<String> = conn.get(&key).await.map_err(channel_error)?;
                Ok(value.map(Value::String).unwrap_or(Value::Null))
            }
            "set" => {
                let key = self.key_arg(&args, operation)?;
                let text = match args.get(1) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                let absolute = args.get(2).and_then(Value::as_i64);
                let relative = args.get(3).and_then(Value::as_i64);
                let expires_at_ms =
                    absolute.or(relative.map(|ms| Utc::now().timestamp_millis() + ms));

                match expires_at_ms {
                    Some(at) => {
                        let _: () = redis::pipe()
                            .atomic()
                            .set(&key, text)
                            .ignore()
                            .pexpire_at(&key, at)
                            .ignore()
                            .query_async(&mut conn)
                            .await
                            .map_err(channel_error)?;
                    }
                    None => {
                        let _: () = conn.set(&key, text).await.map_err(channel_error)?;
                    }
                }
                Ok(Value::Null)
            }
            "delete" => {
                let key = self.key_arg(&args, operation)?;
                let _: () = conn.del(&key).await.map_err(channel_error)?;
                Ok(Value::Null)
            }
            "clear" => {
                let pattern = format!("{}:*", self.prefix);
                let mut cursor: u64 = 0;
                loop {
                    let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(CLEAR_BATCH)
                        .query_async(&mut conn)
                        .await
                        .map_err(channel_error)?;
                    if !keys.is_empty() {
                        let _: () = conn.del(keys).await.map_err(channel_error)?;
                    }
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }
                Ok(Value::Null)
            }
            other => Err(StorageError::Channel(format!("unknown operation: {other}"))),
        }
    }
}

fn channel_error(e: redis::RedisError) -> StorageError {
    StorageError::Channel(e.to_string())
}

#[async_trait::async_trait]
impl StorageChannel for RedisStorageChannel {
    async fn invoke(&self, operation: &str, args: Vec<Value>) -> Result<Value, StorageError> {
        self.dispatch(operation, args).await
    }

    async fn invoke_void(&self, operation: &str, args: Vec<Value>) -> Result<(), StorageError> {
        self.dispatch(operation, args).await.map(|_| ())
    }

    async fn listen(
        &self,
        operation: &str,
        listener: ChangeListener,
        until: CancellationToken,
    ) -> Result<(), StorageError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(channel_error)?;
        pubsub
            .psubscribe(format!("__keyspace@*__:{}:*", self.prefix))
            .await
            .map_err(channel_error)?;

        let marker = format!("__:{}:", self.prefix);
        let shutdown = self.shutdown.clone();
        tracing::debug!(operation, prefix = %self.prefix, "redis keyspace listener started");

        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = until.cancelled() => break,
                    message = messages.next() => {
                        let Some(message) = message else { break };
                        let key = message
                            .get_channel_name()
                            .split_once(&marker)
                            .map(|(_, key)| key.to_string());
                        listener(key);
                    }
                }
            }
            tracing::debug!("redis keyspace listener stopped");
        });
        Ok(())
    }
}

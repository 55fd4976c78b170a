use super::operation_verb;
use crate::domain_port::*;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

struct FakeListener {
    operation: String,
    listener: ChangeListener,
    until: CancellationToken,
}

struct FakeEntry {
    value: Value,
    expires_at_ms: Option<i64>,
}

/// In-process stand-in for a browser storage channel.
///
/// Behaves like a faithful echo: values come back as written until they expire, every
/// mutation is redelivered to registered listeners, and calls are recorded for
/// inspection. `set_failing(true)` makes every call fail. A listener is dropped once its
/// token is cancelled.
#[derive(Default)]
pub struct FakeStorageChannel {
    entries: Mutex<HashMap<String, FakeEntry>>,
    listeners: Mutex<Vec<FakeListener>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    failing: AtomicBool,
}

impl FakeStorageChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        lock(&self.calls).clone()
    }

    /// Operations of the listeners still registered.
    pub fn listen_operations(&self) -> Vec<String> {
        self.live_listeners()
            .iter()
            .map(|entry| entry.operation.clone())
            .collect()
    }

    pub fn listener_count(&self) -> usize {
        self.live_listeners().len()
    }

    fn live_listeners(&self) -> std::sync::MutexGuard<'_, Vec<FakeListener>> {
        let mut listeners = lock(&self.listeners);
        listeners.retain(|entry| !entry.until.is_cancelled());
        listeners
    }

    /// Raw stored value, ignoring expiry.
    pub fn peek(&self, key: &str) -> Option<Value> {
        lock(&self.entries).get(key).map(|entry| entry.value.clone())
    }

    /// Expiry recorded for `key`, in epoch milliseconds.
    pub fn expiry_ms(&self, key: &str) -> Option<i64> {
        lock(&self.entries).get(key).and_then(|entry| entry.expires_at_ms)
    }

    fn dispatch(&self, operation: &str, args: Vec<Value>) -> Result<Value, StorageError> {
        lock(&self.calls).push((operation.to_string(), args.clone()));
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Channel(format!("{operation} failed (simulated)")));
        }

        let key = args.first().and_then(Value::as_str).map(str::to_string);
        let now_ms = Utc::now().timestamp_millis();
        match operation_verb(operation) {
            "get" => {
                let key = key.ok_or_else(|| StorageError::Channel("get without key".into()))?;
                let mut entries = lock(&self.entries);
                let live = entries
                    .get(&key)
                    .map(|entry| entry.expires_at_ms.is_none_or(|at| now_ms < at));
                match live {
                    Some(true) => Ok(entries[&key].value.clone()),
                    Some(false) => {
                        entries.remove(&key);
                        Ok(Value::Null)
                    }
                    None => Ok(Value::Null),
                }
            }
            "set" => {
                let key = key.ok_or_else(|| StorageError::Channel("set without key".into()))?;
                let value = args.get(1).cloned().unwrap_or(Value::Null);
                let absolute = args.get(2).and_then(Value::as_i64);
                let relative = args.get(3).and_then(Value::as_i64);
                let expires_at_ms = absolute.or(relative.map(|ms| now_ms + ms));
                lock(&self.entries).insert(
                    key.clone(),
                    FakeEntry {
                        value,
                        expires_at_ms,
                    },
                );
                self.notify(Some(key));
                Ok(Value::Null)
            }
            "delete" => {
                let key = key.ok_or_else(|| StorageError::Channel("delete without key".into()))?;
                lock(&self.entries).remove(&key);
                self.notify(Some(key));
                Ok(Value::Null)
            }
            "clear" => {
                lock(&self.entries).clear();
                self.notify(None);
                Ok(Value::Null)
            }
            other => Err(StorageError::Channel(format!("unknown operation: {other}"))),
        }
    }

    fn notify(&self, key: Option<String>) {
        let listeners: Vec<ChangeListener> = self
            .live_listeners()
            .iter()
            .map(|entry| entry.listener.clone())
            .collect();
        for listener in listeners {
            listener(key.clone());
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait::async_trait]
impl StorageChannel for FakeStorageChannel {
    async fn invoke(&self, operation: &str, args: Vec<Value>) -> Result<Value, StorageError> {
        self.dispatch(operation, args)
    }

    async fn invoke_void(&self, operation: &str, args: Vec<Value>) -> Result<(), StorageError> {
        self.dispatch(operation, args).map(|_| ())
    }

    async fn listen(
        &self,
        operation: &str,
        listener: ChangeListener,
        until: CancellationToken,
    ) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Channel(format!("{operation} failed (simulated)")));
        }
        self.live_listeners().push(FakeListener {
            operation: operation.to_string(),
            listener,
            until,
        });
        Ok(())
    }
}

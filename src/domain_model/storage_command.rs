use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Get,
    Set,
    Delete,
    Clear,
    Listen,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("{kind} expects {expected} argument(s), got {actual}")]
    Arity {
        kind: CommandKind,
        expected: &'static str,
        actual: usize,
    },
    #[error("key must be a non-empty string")]
    InvalidKey,
    #[error("no value argument was specified")]
    MissingValue,
}

/// One storage request: an operation plus its positional arguments.
///
/// Argument layout per operation:
///
/// | kind   | args                                                 |
/// |--------|------------------------------------------------------|
/// | Get    | `[key]`                                              |
/// | Set    | `[key, value, absoluteExpiryMs?, relativeExpiryMs?]` |
/// | Delete | `[key]`                                              |
/// | Clear  | `[]`                                                 |
/// | Listen | `[]`                                                 |
///
/// Commands are built fresh for every call and never shared between call sites.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageCommand {
    kind: CommandKind,
    args: Vec<Value>,
}

impl StorageCommand {
    pub fn try_new(kind: CommandKind, args: Vec<Value>) -> Result<Self, CommandError> {
        let (expected, ok) = match kind {
            CommandKind::Get | CommandKind::Delete => ("1", args.len() == 1),
            CommandKind::Set => ("2 to 4", (2..=4).contains(&args.len())),
            CommandKind::Clear | CommandKind::Listen => ("0", args.is_empty()),
        };
        if !ok {
            return Err(CommandError::Arity {
                kind,
                expected,
                actual: args.len(),
            });
        }
        if !args.is_empty() && !args[0].as_str().is_some_and(|k| !k.is_empty()) {
            return Err(CommandError::InvalidKey);
        }
        Ok(Self { kind, args })
    }

    pub fn get(key: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Get,
            args: vec![Value::String(key.into())],
        }
    }

    pub fn set(
        key: impl Into<String>,
        value: impl Into<Value>,
        absolute_expiry: Option<DateTime<Utc>>,
        relative_expiry: Option<Duration>,
    ) -> Self {
        let absolute = absolute_expiry
            .map(|at| Value::from(at.timestamp_millis()))
            .unwrap_or(Value::Null);
        let relative = relative_expiry
            .map(|d| Value::from(duration_millis(d)))
            .unwrap_or(Value::Null);
        Self {
            kind: CommandKind::Set,
            args: vec![Value::String(key.into()), value.into(), absolute, relative],
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Delete,
            args: vec![Value::String(key.into())],
        }
    }

    pub fn clear() -> Self {
        Self {
            kind: CommandKind::Clear,
            args: Vec::new(),
        }
    }

    pub fn listen() -> Self {
        Self {
            kind: CommandKind::Listen,
            args: Vec::new(),
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn into_args(self) -> Vec<Value> {
        self.args
    }

    pub fn key(&self) -> Option<&str> {
        self.args.first().and_then(Value::as_str)
    }

    pub fn value(&self) -> Option<&Value> {
        match self.kind {
            CommandKind::Set => self.args.get(1),
            _ => None,
        }
    }

    pub fn absolute_expiry_ms(&self) -> Option<i64> {
        self.expiry_arg(2)
    }

    pub fn relative_expiry_ms(&self) -> Option<i64> {
        self.expiry_arg(3)
    }

    /// Fills the relative-expiry slot of a `Set` that carries no expiry at all.
    pub fn or_default_expiry(mut self, default: Duration) -> Self {
        if self.kind == CommandKind::Set
            && self.absolute_expiry_ms().is_none()
            && self.relative_expiry_ms().is_none()
        {
            self.args.resize(4, Value::Null);
            self.args[3] = Value::from(duration_millis(default));
        }
        self
    }

    fn expiry_arg(&self, index: usize) -> Option<i64> {
        match self.kind {
            CommandKind::Set => self.args.get(index).and_then(Value::as_i64),
            _ => None,
        }
    }
}

pub(crate) fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Which medium a storage handler dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    Cookies,
    Local,
    Session,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageKind::Memory => "memory",
            StorageKind::Cookies => "cookies",
            StorageKind::Local => "local",
            StorageKind::Session => "session",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageOptions {
    pub kind: StorageKind,
    pub default_expiration: Duration,
}

impl StorageOptions {
    pub fn new(kind: StorageKind, default_expiration: Duration) -> Self {
        Self {
            kind,
            default_expiration,
        }
    }

    /// Memory cache defaults: entries live for ten minutes.
    pub fn memory() -> Self {
        Self::new(StorageKind::Memory, Duration::from_secs(10 * 60))
    }

    /// Browser-style defaults: cookies that live for one day.
    pub fn cookies() -> Self {
        Self::new(StorageKind::Cookies, Duration::from_secs(24 * 60 * 60))
    }
}

use crate::domain_model::{IdentityOptions, StorageKind, StorageOptions};
use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub log: Log,
    pub http: Http,
    pub gateway: Gateway,
    pub storage: Storage,
    #[serde(default)]
    pub identity: IdentityOptions,
    pub issuer: Issuer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Http {
    pub address: String,
    // TLS is enabled only when both are set.
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Gateway {
    pub backend: String, // "fake" or "real"
    pub realm: String,
    #[serde(default)]
    pub challenge: bool,
    #[serde(default)]
    pub exempt_paths: Vec<String>,
    /// username -> argon2 PHC hash
    #[serde(default)]
    pub users: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub backend: String, // "fake" or "redis"
    pub kind: StorageKind,
    pub default_expiration_secs: u64,
    pub redis_url: Option<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Storage {
    pub fn options(&self) -> StorageOptions {
        StorageOptions::new(self.kind, Duration::from_secs(self.default_expiration_secs))
    }
}

fn default_prefix() -> String {
    "warden".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issuer {
    pub secret: String,
    pub ttl_secs: u64,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

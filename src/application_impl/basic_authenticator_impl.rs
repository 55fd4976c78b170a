use crate::domain_port::BasicAuthenticator;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use std::collections::HashMap;

/// Checks Basic-Auth credentials against a table of argon2 PHC hashes.
pub struct Argon2BasicAuthenticator {
    users: HashMap<String, String>,
    exempt_paths: Vec<String>,
    challenge: bool,
}

impl Argon2BasicAuthenticator {
    /// `exempt_paths` are matched with [`matches_path_pattern`].
    pub fn new(users: HashMap<String, String>, exempt_paths: Vec<String>, challenge: bool) -> Self {
        Self {
            users,
            exempt_paths,
            challenge,
        }
    }
}

/// PHC string for `password`, suitable for the gateway's user table.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("argon2 hash failed: {e}"))?;
    Ok(hash.to_string())
}

/// `*x*` contains, `*x` suffix, `x*` prefix, anything else exact.
pub fn matches_path_pattern(path: &str, pattern: &str) -> bool {
    if let Some(inner) = pattern.strip_prefix('*').and_then(|p| p.strip_suffix('*')) {
        return path.contains(inner);
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        return path.ends_with(suffix);
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return path.starts_with(prefix);
    }
    path == pattern
}

#[async_trait::async_trait]
impl BasicAuthenticator for Argon2BasicAuthenticator {
    async fn is_authenticated(&self, username: &str, password: &str) -> bool {
        let Some(hash) = self.users.get(username) else {
            return false;
        };
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(username, error = %e, "invalid PHC hash in user table");
                return false;
            }
        };
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                tracing::error!(username, error = %e, "password verification failed");
                false
            }
        }
    }

    fn is_authentication_required(&self, path: &str) -> bool {
        !self
            .exempt_paths
            .iter()
            .any(|pattern| matches_path_pattern(path, pattern))
    }

    fn is_challenge_required(&self, _port: u16) -> bool {
        self.challenge
    }
}

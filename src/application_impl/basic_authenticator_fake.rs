use super::matches_path_pattern;
use crate::domain_port::BasicAuthenticator;

const EXEMPT_PATHS: [&str; 5] = ["/", "*/health", "*scalar*", "*/index.html", "*.ico"];

/// Accepts `test`/`t`. Challenges only on ports divisible by ten.
#[derive(Debug, Default)]
pub struct FakeBasicAuthenticator;

impl FakeBasicAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl BasicAuthenticator for FakeBasicAuthenticator {
    async fn is_authenticated(&self, username: &str, password: &str) -> bool {
        username == "test" && password == "t"
    }

    fn is_authentication_required(&self, path: &str) -> bool {
        !EXEMPT_PATHS
            .iter()
            .any(|pattern| matches_path_pattern(path, pattern))
    }

    fn is_challenge_required(&self, port: u16) -> bool {
        port % 10 == 0
    }
}

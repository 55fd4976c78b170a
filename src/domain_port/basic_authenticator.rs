/// The capability behind the Basic-Auth gateway.
#[async_trait::async_trait]
pub trait BasicAuthenticator: Send + Sync {
    async fn is_authenticated(&self, username: &str, password: &str) -> bool;

    /// Paths that may be served without credentials return `false`.
    fn is_authentication_required(&self, path: &str) -> bool;

    /// Whether a failed request should carry a `WWW-Authenticate` challenge.
    fn is_challenge_required(&self, port: u16) -> bool;
}

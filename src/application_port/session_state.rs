use crate::domain_model::AppIdentity;
use std::sync::Arc;

/// Called with the committed state after every transition.
pub type StateListener = Arc<dyn Fn(Arc<AppIdentity>) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("login rejected: identity has no name")]
    MissingName,
    #[error("login rejected: {0} is not authenticated")]
    NotAuthenticated(String),
    #[error("login rejected: session for {0} has expired")]
    Expired(String),
}

/// Owns the current identity of one session scope.
///
/// Transitions are serialized; the new state is committed before listeners run.
#[async_trait::async_trait]
pub trait AuthStateProvider: Send + Sync {
    /// The current identity, rehydrating from storage when unauthenticated and resetting
    /// an identity whose validity window has passed.
    async fn current_state(&self) -> Arc<AppIdentity>;

    /// Snapshot of the current identity without touching storage.
    fn current(&self) -> Arc<AppIdentity>;

    async fn load_from_storage(&self) -> Arc<AppIdentity>;

    async fn login(&self, identity: AppIdentity) -> Result<(), SessionError>;

    async fn logout(&self);

    fn subscribe(&self, listener: StateListener) -> Subscription;
}

/// Keeps a listener registered until unsubscribed or dropped.
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

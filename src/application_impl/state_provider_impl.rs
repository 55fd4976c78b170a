use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::ChangeListener;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Session state for one scope (a tab, a request, a CLI run).
///
/// `gate` serializes transitions; `current` is only written while it is held, and
/// listeners are invoked after the write is committed.
pub struct AppAuthStateProvider {
    accessor: Arc<dyn StorageAccessor>,
    options: IdentityOptions,
    scope: CancellationToken,
    anonymous: Arc<AppIdentity>,
    gate: tokio::sync::Mutex<()>,
    current: RwLock<Arc<AppIdentity>>,
    listeners: Arc<DashMap<u64, StateListener>>,
    next_listener: AtomicU64,
}

impl AppAuthStateProvider {
    pub fn new(
        accessor: Arc<dyn StorageAccessor>,
        options: IdentityOptions,
        scope: CancellationToken,
    ) -> Self {
        let anonymous = Arc::new(AppIdentity::parse(None, &options));
        Self {
            accessor,
            options,
            scope,
            current: RwLock::new(anonymous.clone()),
            anonymous,
            gate: tokio::sync::Mutex::new(()),
            listeners: Arc::new(DashMap::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    pub fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    fn swap(&self, next: Arc<AppIdentity>) -> Arc<AppIdentity> {
        let mut current = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *current, next)
    }

    fn notify(&self, state: &Arc<AppIdentity>) {
        let listeners: Vec<StateListener> = self
            .listeners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for listener in listeners {
            listener(state.clone());
        }
    }

    async fn reset(&self) -> Arc<AppIdentity> {
        let anonymous = self.anonymous.clone();
        self.swap(anonymous.clone());
        self.accessor.remove_token(&self.scope).await;
        self.notify(&anonymous);
        anonymous
    }

    // Caller holds `gate`.
    async fn load_locked(&self) -> Arc<AppIdentity> {
        let token = self.accessor.get_token(&self.scope).await;
        let identity = AppIdentity::parse(token.as_deref(), &self.options);

        let next = if identity.is_authenticated() {
            Arc::new(identity)
        } else {
            if token.is_some() {
                tracing::info!(
                    error = ?identity.error(),
                    name = identity.name(),
                    "discarding stored token that does not authenticate"
                );
                self.accessor.remove_token(&self.scope).await;
            }
            self.anonymous.clone()
        };

        let previous = self.swap(next.clone());
        if *previous != *next {
            tracing::debug!(name = next.name(), "session state rehydrated from storage");
            self.notify(&next);
        }
        next
    }
}

#[async_trait::async_trait]
impl AuthStateProvider for AppAuthStateProvider {
    async fn current_state(&self) -> Arc<AppIdentity> {
        let _gate = self.gate.lock().await;
        let current = self.current();
        if current.is_authenticated() {
            return current;
        }
        if *current != *self.anonymous {
            tracing::info!(name = current.name(), "session expired");
            return self.reset().await;
        }
        self.load_locked().await
    }

    fn current(&self) -> Arc<AppIdentity> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn load_from_storage(&self) -> Arc<AppIdentity> {
        let _gate = self.gate.lock().await;
        self.load_locked().await
    }

    async fn login(&self, identity: AppIdentity) -> Result<(), SessionError> {
        let Some(name) = identity.name().map(str::to_string) else {
            tracing::warn!(error = ?identity.error(), "login rejected: identity has no name");
            return Err(SessionError::MissingName);
        };
        tracing::debug!(name = %name, "login attempt");

        if !identity.is_authenticated() {
            tracing::warn!(name = %name, error = ?identity.error(), "login rejected: not authenticated");
            return Err(SessionError::NotAuthenticated(name));
        }
        if identity.expiry_claim().is_none() {
            tracing::warn!(name = %name, "identity carries no expiry claim");
        } else if identity.expiry().is_some_and(|at| at <= Utc::now()) {
            tracing::warn!(name = %name, "login rejected: session expired");
            return Err(SessionError::Expired(name));
        }

        let _gate = self.gate.lock().await;
        let identity = Arc::new(identity);
        self.swap(identity.clone());
        match identity.token() {
            Some(token) => {
                self.accessor
                    .set_token(token, identity.valid_to(), &self.scope)
                    .await
            }
            None => self.accessor.remove_token(&self.scope).await,
        }
        tracing::info!(name = %name, "logged in");
        self.notify(&identity);
        Ok(())
    }

    async fn logout(&self) {
        let _gate = self.gate.lock().await;
        let previous = self.current();
        self.reset().await;
        tracing::info!(name = previous.name(), "logged out");
    }

    fn subscribe(&self, listener: StateListener) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, listener);
        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.remove(&id);
            }
        })
    }
}

/// Turns backend change signals for the token key into `load_from_storage` calls.
///
/// Returns `None` when the backend cannot report changes. The task ends when `cancel`
/// fires or the backend drops the listener.
pub async fn watch_storage(
    provider: Arc<dyn AuthStateProvider>,
    accessor: Arc<dyn StorageAccessor>,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Option<String>>();
    let listener: ChangeListener = Arc::new(move |key: Option<String>| {
        let _ = tx.send(key);
    });
    if !accessor.start_listening(listener, cancel.clone()).await {
        return None;
    }

    Some(tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                signal = rx.recv() => {
                    let Some(key) = signal else { break };
                    if key.as_deref().is_none_or(|key| key == TOKEN_KEY) {
                        let state = provider.load_from_storage().await;
                        tracing::debug!(name = state.name(), "storage change observed");
                    }
                }
            }
        }
        tracing::debug!("storage watcher stopped");
    }))
}

use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::IdentityOptions;
use crate::domain_port::*;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One session scope: accessor, state provider and façade sharing a cancellation token.
/// Dropping the scope cancels its pending storage calls and its watcher.
pub struct Session {
    pub accessor: Arc<dyn StorageAccessor>,
    pub provider: Arc<dyn AuthStateProvider>,
    pub auth_service: Arc<dyn AuthService>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        storage: Arc<dyn StorageHandler>,
        issuer: Arc<dyn TokenIssuer>,
        options: IdentityOptions,
        cancel: CancellationToken,
    ) -> Self {
        let accessor: Arc<dyn StorageAccessor> = Arc::new(StorageAccessorImpl::new(storage));
        let provider: Arc<dyn AuthStateProvider> = Arc::new(AppAuthStateProvider::new(
            accessor.clone(),
            options.clone(),
            cancel.clone(),
        ));
        let auth_service: Arc<dyn AuthService> =
            Arc::new(AppAuthService::new(issuer, provider.clone(), options));
        Self {
            accessor,
            provider,
            auth_service,
            cancel,
        }
    }

    /// Follows token changes made by other scopes; `None` if the backend cannot report them.
    pub async fn watch_storage(&self) -> Option<JoinHandle<()>> {
        watch_storage(
            self.provider.clone(),
            self.accessor.clone(),
            self.cancel.clone(),
        )
        .await
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

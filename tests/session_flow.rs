use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use warden::application_impl::*;
use warden::application_port::*;
use warden::domain_model::*;
use warden::domain_port::*;
use warden::infra::*;
use warden::server::Session;

fn shared_storage(kind: StorageKind) -> (Arc<FakeStorageChannel>, Arc<dyn StorageHandler>) {
    let channel = Arc::new(FakeStorageChannel::new());
    let handler = ChannelStorageHandler::new(channel.clone(), Arc::new(MemoryStorageHandler::new()))
        .with_options(StorageOptions::new(kind, Duration::from_secs(3600)));
    (channel, Arc::new(handler))
}

fn issuer() -> Arc<dyn TokenIssuer> {
    Arc::new(FakeTokenIssuer::new(b"integration".to_vec()).with_roles(vec!["admin".into()]))
}

fn tab(storage: &Arc<dyn StorageHandler>) -> Session {
    Session::new(
        storage.clone(),
        issuer(),
        IdentityOptions::default(),
        CancellationToken::new(),
    )
}

async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..50 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn login_in_one_tab_is_seen_by_another() {
    let (_, storage) = shared_storage(StorageKind::Local);
    let tab_a = tab(&storage);
    let tab_b = tab(&storage);
    let watcher = tab_b.watch_storage().await;
    assert!(watcher.is_some());

    tab_a
        .auth_service
        .login(LoginCredential::new("alice", "pw"))
        .await
        .unwrap();

    let provider = tab_b.provider.clone();
    assert!(eventually(|| {
        let provider = provider.clone();
        async move { provider.current().name() == Some("alice") }
    })
    .await);
    assert!(tab_b.provider.current().is_in_role("admin"));

    tab_a.auth_service.logout().await;

    assert!(eventually(|| {
        let provider = provider.clone();
        async move { !provider.current().is_authenticated() }
    })
    .await);
}

#[tokio::test]
async fn lazy_rehydration_without_watcher() {
    let (channel, storage) = shared_storage(StorageKind::Cookies);
    let tab_a = tab(&storage);
    let tab_b = tab(&storage);

    tab_a
        .auth_service
        .login(LoginCredential::new("bob", "pw"))
        .await
        .unwrap();
    assert!(channel.peek(TOKEN_KEY).is_some());

    let identity = tab_b.auth_service.current_identity().await;
    assert_eq!(identity.name(), Some("bob"));
}

#[tokio::test]
async fn clear_elsewhere_logs_out_watchers() {
    let (_, storage) = shared_storage(StorageKind::Local);
    let tab_a = tab(&storage);
    let tab_b = tab(&storage);
    tab_b.watch_storage().await;

    tab_a
        .auth_service
        .login(LoginCredential::new("carol", "pw"))
        .await
        .unwrap();
    assert_eq!(tab_b.provider.current_state().await.name(), Some("carol"));

    tab_a.accessor.clear_all(&CancellationToken::new()).await;

    let provider = tab_b.provider.clone();
    assert!(eventually(|| {
        let provider = provider.clone();
        async move { !provider.current().is_authenticated() }
    })
    .await);
}

#[tokio::test]
async fn memory_mode_cannot_watch() {
    let (_, storage) = shared_storage(StorageKind::Memory);
    let tab_a = tab(&storage);

    assert!(tab_a.watch_storage().await.is_none());

    tab_a
        .auth_service
        .login(LoginCredential::new("dave", "pw"))
        .await
        .unwrap();
    assert_eq!(tab_a.auth_service.current_identity().await.name(), Some("dave"));
}

#[tokio::test]
async fn closed_scope_stops_its_watcher() {
    let (_, storage) = shared_storage(StorageKind::Local);
    let tab_a = tab(&storage);
    let watcher = tab_a.watch_storage().await.unwrap();

    tab_a.close();

    tokio::time::timeout(Duration::from_secs(1), watcher)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn closed_scopes_release_their_listeners() {
    let (channel, storage) = shared_storage(StorageKind::Local);
    let keeper = tab(&storage);
    keeper.watch_storage().await.unwrap();

    for _ in 0..100 {
        let scope = tab(&storage);
        let watcher = scope.watch_storage().await.unwrap();
        scope.close();
        watcher.await.unwrap();
    }

    assert_eq!(channel.listener_count(), 1);
    keeper.close();
    assert_eq!(channel.listener_count(), 0);
}

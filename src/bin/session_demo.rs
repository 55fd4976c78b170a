use std::sync::Arc;
use std::time::Duration;
use warden::application_port::*;
use warden::domain_model::*;
use warden::logger::*;
use warden::server::*;
use warden::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logger = Logger::new_bootstrap();
    let settings = parse_settings(cli.settings.as_deref())?;
    logger.reload_from_config(&LogConfig::from(&settings.log))?;

    let server = Server::try_new(&settings).await?;
    let tab_a = server.new_session();
    let tab_b = server.new_session();
    let watcher = tab_b.watch_storage().await;

    let _subscription = tab_b
        .provider
        .subscribe(Arc::new(|state: Arc<AppIdentity>| {
            info!(name = state.name(), authenticated = state.is_authenticated(), "tab b observed");
        }));

    if let Err(e) = tab_a.auth_service.login(LoginCredential::new("", "secret")).await {
        info!("rejected as expected: {e}");
    }

    tab_a
        .auth_service
        .login(LoginCredential::new("alice", "secret"))
        .await?;
    let identity = tab_a.auth_service.current_identity().await;
    info!(
        name = identity.name(),
        roles = ?identity.roles().collect::<Vec<_>>(),
        valid_to = ?identity.valid_to(),
        "tab a logged in"
    );

    // Give the watcher a moment to pick up the token written by tab a.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let seen = tab_b.provider.current_state().await;
    info!(name = seen.name(), "tab b current state");

    tab_a.auth_service.logout().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    info!(
        authenticated = tab_b.provider.current().is_authenticated(),
        "tab b after logout"
    );

    tab_b.close();
    if let Some(watcher) = watcher {
        watcher.await?;
    }
    server.shutdown().await;
    Ok(())
}

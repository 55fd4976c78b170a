use crate::settings::Log;
use anyhow::{Context, Result};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const FALLBACK_DIRECTIVES: &str = "info";

/// Filter directives taken from the `[log]` settings section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub filter: String,
}

impl From<&Log> for LogConfig {
    fn from(log: &Log) -> Self {
        Self {
            filter: log.filter.clone(),
        }
    }
}

/// Process-wide subscriber whose filter is swapped once settings are loaded.
///
/// A non-empty `RUST_LOG` pins the filter: settings reloads are then ignored.
pub struct Logger {
    reload_handle: reload::Handle<EnvFilter, Registry>,
    installed: bool,
    pinned: bool,
}

impl Logger {
    /// Installs the global subscriber. If one is already installed the existing one is
    /// kept and later reloads only validate their directives.
    pub fn new_bootstrap() -> Self {
        let from_env = bootstrap_directives();
        let filter = parse_filter(from_env.as_deref().unwrap_or(FALLBACK_DIRECTIVES))
            .unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVES));
        let (filter, reload_handle) = reload::Layer::new(filter);

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .is_ok();
        if !installed {
            tracing::debug!("global subscriber already installed");
        }

        Self {
            reload_handle,
            installed,
            pinned: from_env.is_some(),
        }
    }

    pub fn reload_from_config(&self, config: &LogConfig) -> Result<()> {
        let filter = parse_filter(&config.filter)?;
        if self.pinned {
            tracing::debug!(settings = %config.filter, "RUST_LOG set, keeping its filter");
            return Ok(());
        }
        if !self.installed {
            return Ok(());
        }
        self.reload_handle
            .reload(filter)
            .context("failed to swap log filter")?;
        tracing::debug!(filter = %config.filter, "log filter reloaded");
        Ok(())
    }
}

fn bootstrap_directives() -> Option<String> {
    std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|directives| !directives.trim().is_empty())
}

fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives).with_context(|| format!("invalid log filter {directives:?}"))
}

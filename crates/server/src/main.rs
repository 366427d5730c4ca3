//! Critique server binary.

use anyhow::{Context, Result};
use clap::Parser;
use critique_core::config::AppConfig;
use critique_server::bootstrap::ensure_admins;
use critique_server::{AppState, create_router};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Critique - media review service
#[derive(Parser, Debug)]
#[command(name = "critiqued")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "CRITIQUE_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from an optional TOML file overlaid with `CRITIQUE_` variables.
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();
    let has_config_file = Path::new(path).exists();

    if has_config_file {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    // CRITIQUE_CONFIG only names the file
    let has_env_config = std::env::vars()
        .any(|(key, _)| key.starts_with("CRITIQUE_") && key != "CRITIQUE_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: critiqued --config /path/to/config.toml\n  \
             2. Environment variables: CRITIQUE_SERVER__BIND=0.0.0.0:3000 \
             CRITIQUE_DATABASE__TYPE=sqlite CRITIQUE_DATABASE__PATH=critique.db critiqued\n\n\
             See config/server.example.toml for example configuration.\n\
             Set CRITIQUE_CONFIG env var to specify a default config file path."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("CRITIQUE_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Critique v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    critique_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let store = critique_store::from_config(&config.database)
        .await
        .context("failed to initialize primary store")?;
    store
        .health_check()
        .await
        .context("primary store health check failed")?;
    tracing::info!("Primary store initialized");

    let mirror = critique_store::mirror_from_config(config.mirror.as_ref())
        .await
        .context("failed to initialize review mirror")?;

    let events = critique_events::from_config(&config.events)
        .context("failed to open authentication event queue")?;

    let promoted = ensure_admins(store.as_ref(), &config.auth)
        .await
        .context("failed to assign admin roles")?;
    if promoted > 0 {
        tracing::info!(promoted, "Admin roles assigned");
    }

    let state = AppState::new(config.clone(), store.clone(), mirror, events.clone());
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // In-flight requests are done; drain events before the pool goes away.
    events.close().await;
    store.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use critique_core::config::DatabaseConfig;

    #[test]
    fn load_config_from_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("server.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "127.0.0.1:4100"
max_page_size = 25

[database]
type = "sqlite"
path = "/tmp/critique-test.db"

[auth]
admin_emails = ["root@example.com"]

[events]
enabled = false
"#,
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:4100");
        assert_eq!(config.server.max_page_size, 25);
        assert!(matches!(config.database, DatabaseConfig::Sqlite { .. }));
        assert!(config.mirror.is_none());
        assert_eq!(config.auth.admin_emails, vec!["root@example.com"]);
        assert!(!config.events.enabled);
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("server.toml");
        std::fs::write(&path, "[server]\nmax_page_size = 0\n").unwrap();

        let err = load_config(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("max_page_size"));
    }
}

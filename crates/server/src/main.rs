//! Herald server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use herald_core::config::{AppConfig, SecretSource, SigningConfig};
use herald_server::{AppState, create_router};
use herald_signer::{SecretKey, TokenSigner};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Herald - mailing lists for code-host projects
#[derive(Parser, Debug)]
#[command(name = "heraldd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "HERALD_CONFIG",
        default_value = "config/herald.toml"
    )]
    config: String,
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

    tracing::info!("Herald v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    herald_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let metadata = herald_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    tracing::info!("Metadata store initialized");

    let signer = load_signer(&config.signing)?;

    let bind = config.server.bind.clone();
    let dispatcher_enabled = config.dispatcher.enabled;
    let state =
        AppState::new(config, metadata, signer).context("failed to build application state")?;

    let shutdown = CancellationToken::new();

    let dispatcher = if dispatcher_enabled {
        let dispatcher = state
            .invite_dispatcher()
            .context("failed to build invite dispatcher")?;
        Some(dispatcher.spawn(shutdown.clone()))
    } else {
        tracing::info!("Invite dispatcher disabled in this process");
        None
    };

    let app = create_router(state);

    tracing::info!(bind = %bind, "Starting server");
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind to {}", bind))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Some(handle) = dispatcher {
        handle.await.context("invite dispatcher panicked")?;
    }
    tracing::info!("Server stopped");

    Ok(())
}

/// Load configuration from an optional TOML file and `HERALD_` environment
/// variables.
fn load_config(path: &str) -> Result<AppConfig> {
    let config_path = std::path::Path::new(path);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("HERALD_") && key != "HERALD_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: heraldd --config /path/to/herald.toml\n  \
             2. Environment variables: HERALD_SIGNING__SECRET__TYPE=env \
             HERALD_SIGNING__SECRET__VAR=HERALD_SECRET HERALD_GROUPS__CLIENT_ID=... heraldd\n\n\
             Set HERALD_CONFIG env var to specify a default config file path."
        );
    }

    figment
        .merge(Env::prefixed("HERALD_").split("__"))
        .extract()
        .context("failed to load configuration")
}

/// Load the process-wide signing secret.
fn load_signer(config: &SigningConfig) -> Result<TokenSigner> {
    if matches!(config.secret, SecretSource::Generate) {
        tracing::warn!("Using a generated signing secret; XSRF tokens will not survive a restart");
    }
    let key = SecretKey::from_source(&config.secret).context("failed to load signing secret")?;
    TokenSigner::new(&key).context("failed to initialize signer")
}

/// Resolve on Ctrl-C or SIGTERM, or when `shutdown` is cancelled elsewhere.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => {},
    }
    tracing::info!("Shutdown requested");
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_signer::SignatureStatus;
    use std::io::Write;

    #[test]
    fn load_signer_from_value() {
        let signer = load_signer(&SigningConfig::for_testing()).unwrap();
        let token = signer.sign("create_list:s").unwrap();
        assert_eq!(
            signer.verify("create_list:s", &token, None),
            SignatureStatus::Ok
        );
    }

    #[test]
    fn load_signer_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "file-secret").unwrap();
        let config = SigningConfig {
            secret: SecretSource::File {
                path: file.path().to_path_buf(),
            },
        };

        let from_file = load_signer(&config).unwrap();
        let inline = load_signer(&SigningConfig {
            secret: SecretSource::Value {
                secret: "file-secret".to_string(),
            },
        })
        .unwrap();
        assert_eq!(from_file.sign_untimed("x"), inline.sign_untimed("x"));
    }

    #[test]
    fn load_signer_generate() {
        let config = SigningConfig {
            secret: SecretSource::Generate,
        };
        assert!(load_signer(&config).is_ok());
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0:9000"

[signing.secret]
type = "value"
secret = "s3cret"

[groups]
client_id = "id"
client_secret = "secret"
list_domain = "lists.example.com"

[dispatcher]
sleep_interval_ms = 3000
"#,
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.groups.list_domain, "lists.example.com");
        assert_eq!(config.dispatcher.sleep_interval_ms, 3000);
        assert!(config.validate().is_ok());
    }
}

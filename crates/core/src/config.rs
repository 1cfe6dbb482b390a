//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:7176").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Lifetime of XSRF tokens in seconds (default: 1 hour).
    #[serde(default = "default_xsrf_timeout_secs")]
    pub xsrf_timeout_secs: u64,
}

fn default_bind() -> String {
    "127.0.0.1:7176".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_xsrf_timeout_secs() -> u64 {
    60 * 60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
            xsrf_timeout_secs: default_xsrf_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// XSRF token lifetime in seconds, saturated to `i64`.
    pub fn xsrf_timeout(&self) -> i64 {
        i64::try_from(self.xsrf_timeout_secs).unwrap_or(i64::MAX)
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Metadata store configuration.
///
/// The store holds the response cache, the invite queue and user profiles.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (single host deployments).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// PostgreSQL database (required when several processes share the queue
    /// across hosts).
    Postgres {
        /// Connection URL (optional if using individual fields).
        /// Takes precedence over individual fields if both are provided.
        url: Option<String>,
        /// Database host.
        host: Option<String>,
        /// Database port (default: 5432).
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        /// Database username.
        username: Option<String>,
        /// Database password.
        /// WARNING: Prefer HERALD_METADATA__PASSWORD env var over storing in config.
        password: Option<String>,
        /// Database name.
        database: Option<String>,
        /// SSL mode for connections.
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

fn default_max_connections() -> u32 {
    10
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/herald.db"),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { .. } => Ok(()),
            MetadataConfig::Postgres {
                url,
                host,
                database,
                ..
            } => match (url.as_ref(), host.as_ref(), database.as_ref()) {
                (Some(_), _, _) => Ok(()),
                (None, Some(_), Some(_)) => Ok(()),
                (None, None, _) => Err(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ),
                (None, Some(_), None) => Err(
                    "postgres config requires 'database' when using individual fields".to_string(),
                ),
            },
        }
    }
}

/// Signing configuration for XSRF tokens and cache key segments.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Where the process-wide HMAC secret comes from.
    pub secret: SecretSource,
}

impl SigningConfig {
    /// Create a test configuration with an inline secret.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            secret: SecretSource::Value {
                secret: "test-signing-secret".to_string(),
            },
        }
    }
}

/// Secret source configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SecretSource {
    /// Secret stored in a file (trailing whitespace is trimmed).
    File {
        /// Path to the secret file.
        path: PathBuf,
    },
    /// Secret stored in an environment variable.
    Env {
        /// Environment variable name.
        var: String,
    },
    /// Secret provided directly as a value (NOT recommended for production).
    Value {
        /// The secret.
        secret: String,
    },
    /// Generate a random secret at startup (development only: tokens do not
    /// survive a restart).
    Generate,
}

/// Code-host API configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// API base URL.
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,
    /// Page size requested from list endpoints.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Token used by the background dispatcher for profile lookups.
    /// Lookups are anonymous when unset.
    #[serde(default)]
    pub service_token: Option<String>,
}

fn default_upstream_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_user_agent() -> String {
    concat!("herald/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            page_size: default_page_size(),
            user_agent: default_user_agent(),
            service_token: None,
        }
    }
}

impl UpstreamConfig {
    /// Validate upstream configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 || self.page_size > 100 {
            return Err(format!(
                "upstream.page_size must be between 1 and 100, got {}",
                self.page_size
            ));
        }
        Ok(())
    }
}

/// List service configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupsConfig {
    /// API base URL.
    #[serde(default = "default_groups_base_url")]
    pub base_url: String,
    /// OAuth client identifier.
    pub client_id: String,
    /// OAuth client secret.
    /// WARNING: Prefer HERALD_GROUPS__CLIENT_SECRET env var over storing in config.
    pub client_secret: String,
    /// Domain lists are addressed under (e.g. "lists.example.com").
    pub list_domain: String,
}

fn default_groups_base_url() -> String {
    "https://api.fiesta.cc".to_string()
}

impl GroupsConfig {
    /// Create a test configuration with dummy credentials.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            base_url: "http://127.0.0.1:9".to_string(),
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            list_domain: "lists.example.com".to_string(),
        }
    }
}

/// Invite dispatcher configuration.
///
/// Every process running a dispatcher spends one upstream call per
/// `sleep_interval_ms` at most, so `processes × 60s / sleep_interval` must
/// stay within the upstream per-minute budget.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Run the dispatcher in this process (default: true).
    #[serde(default = "default_dispatcher_enabled")]
    pub enabled: bool,
    /// Delay after each upstream lookup and after an empty poll.
    #[serde(default = "default_sleep_interval_ms")]
    pub sleep_interval_ms: u64,
    /// Number of processes sharing the upstream budget.
    #[serde(default = "default_processes")]
    pub processes: u32,
    /// Upstream call budget per minute.
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
}

fn default_dispatcher_enabled() -> bool {
    true
}

fn default_sleep_interval_ms() -> u64 {
    2100
}

fn default_processes() -> u32 {
    2
}

fn default_rate_limit_per_minute() -> u32 {
    60
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_dispatcher_enabled(),
            sleep_interval_ms: default_sleep_interval_ms(),
            processes: default_processes(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
        }
    }
}

impl DispatcherConfig {
    /// Get the sleep interval as a Duration.
    pub fn sleep_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_interval_ms)
    }

    /// Validate that the configured interval respects the upstream budget.
    pub fn validate(&self) -> Result<(), String> {
        if self.sleep_interval_ms == 0 {
            return Err("dispatcher.sleep_interval_ms cannot be 0".to_string());
        }
        if self.processes == 0 {
            return Err("dispatcher.processes cannot be 0".to_string());
        }

        let demand = u128::from(self.processes) * 60_000;
        let budget = u128::from(self.rate_limit_per_minute) * u128::from(self.sleep_interval_ms);
        if demand > budget {
            let minimum_ms = demand.div_ceil(u128::from(self.rate_limit_per_minute.max(1)));
            return Err(format!(
                "dispatcher.sleep_interval_ms={} lets {} processes exceed {} calls per minute; \
                 use at least {} ms",
                self.sleep_interval_ms, self.processes, self.rate_limit_per_minute, minimum_ms
            ));
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Signing configuration (required).
    pub signing: SigningConfig,
    /// Code-host API configuration.
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// List service configuration (required).
    pub groups: GroupsConfig,
    /// Invite dispatcher configuration.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses SQLite metadata, an inline signing secret
    /// and dummy list service credentials.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            metadata: MetadataConfig::default(),
            signing: SigningConfig::for_testing(),
            upstream: UpstreamConfig::default(),
            groups: GroupsConfig::for_testing(),
            dispatcher: DispatcherConfig::default(),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.metadata.validate()?;
        self.upstream.validate()?;
        self.dispatcher.validate()?;
        Ok(())
    }
}

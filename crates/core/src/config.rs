//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Upper bound for the `max` parameter of paginated review listings.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// Maximum accepted JSON request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Upper bound on one review mirror write in milliseconds. A slower
    /// write is abandoned and logged.
    #[serde(default = "default_mirror_timeout_ms")]
    pub mirror_timeout_ms: u64,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_page_size() -> u32 {
    crate::MAX_PAGE_SIZE
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_mirror_timeout_ms() -> u64 {
    2_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_page_size: default_max_page_size(),
            max_body_bytes: default_max_body_bytes(),
            metrics_enabled: default_metrics_enabled(),
            mirror_timeout_ms: default_mirror_timeout_ms(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_page_size == 0 {
            return Err("server.max_page_size must be at least 1".to_string());
        }
        if self.max_body_bytes == 0 {
            return Err("server.max_body_bytes must be at least 1".to_string());
        }
        if self.mirror_timeout_ms == 0 {
            return Err("server.mirror_timeout_ms must be at least 1".to_string());
        }
        Ok(())
    }

    /// Mirror write bound as a std Duration.
    pub fn mirror_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.mirror_timeout_ms)
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

/// Database configuration, used for both the primary store and the mirror.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// SQLite database (single-node deployments and tests).
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Query timeout in seconds. Advisory only: SQLite cannot cancel a
        /// running statement.
        #[serde(default = "default_sqlite_query_timeout_secs")]
        query_timeout_secs: Option<u64>,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL. Takes precedence over individual fields.
        url: Option<String>,
        host: Option<String>,
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        username: Option<String>,
        /// Prefer CRITIQUE_DATABASE__PASSWORD over storing this in a file.
        password: Option<String>,
        database: Option<String>,
        ssl_mode: Option<PgSslMode>,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Statement timeout in milliseconds, enforced by PostgreSQL.
        #[serde(default = "default_statement_timeout_ms")]
        statement_timeout_ms: Option<u64>,
    },
}

fn default_max_connections() -> u32 {
    10
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(30_000)
}

fn default_sqlite_query_timeout_secs() -> Option<u64> {
    Some(30)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/critique.db"),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    /// Validate database configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            DatabaseConfig::Sqlite { .. } => Ok(()),
            DatabaseConfig::Postgres {
                url,
                host,
                database,
                max_connections,
                ..
            } => {
                if *max_connections == 0 {
                    return Err("postgres max_connections must be at least 1".to_string());
                }
                match (url.as_ref(), host.as_ref(), database.as_ref()) {
                    (Some(_), _, _) => Ok(()),
                    (None, Some(_), Some(_)) => Ok(()),
                    (None, None, _) => Err(
                        "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                    ),
                    (None, Some(_), None) => Err(
                        "postgres config requires 'database' when using individual fields"
                            .to_string(),
                    ),
                }
            }
        }
    }
}

/// Session and account configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of a login session in seconds (default: 7 days).
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Accounts promoted to the admin role at startup.
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

fn default_session_ttl_secs() -> u64 {
    7 * 24 * 3600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl_secs(),
            admin_emails: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Session lifetime as a Duration.
    pub fn session_ttl(&self) -> Duration {
        // Saturate at i64::MAX to prevent overflow wrapping to negative
        let secs = i64::try_from(self.session_ttl_secs).unwrap_or(i64::MAX);
        Duration::seconds(secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.session_ttl_secs == 0 {
            return Err("auth.session_ttl_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Authentication event queue configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Publish signup and login events (default: true).
    #[serde(default = "default_events_enabled")]
    pub enabled: bool,
    /// Name of the durable queue events are published to.
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    /// Number of events buffered before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

fn default_events_enabled() -> bool {
    true
}

fn default_queue_name() -> String {
    "authentication queue".to_string()
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: default_events_enabled(),
            queue_name: default_queue_name(),
            capacity: default_queue_capacity(),
        }
    }
}

impl EventsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if self.capacity == 0 {
            return Err("events.capacity must be at least 1".to_string());
        }
        if self.queue_name.trim().is_empty() {
            return Err("events.queue_name must not be empty".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Primary database.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Secondary database receiving best-effort review copies.
    /// Mirroring is disabled when absent.
    #[serde(default)]
    pub mirror: Option<DatabaseConfig>,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

impl AppConfig {
    /// Create a test configuration.
    ///
    /// **For testing only.** Uses SQLite at the given path with no mirror.
    pub fn for_testing(db_path: impl Into<PathBuf>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: db_path.into(),
                query_timeout_secs: None,
            },
            ..Default::default()
        }
    }

    /// Validate every section, reporting the first failure.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.database.validate()?;
        if let Some(mirror) = &self.mirror {
            mirror
                .validate()
                .map_err(|e| format!("mirror: {e}"))?;
        }
        self.auth.validate()?;
        self.events.validate()
    }
}

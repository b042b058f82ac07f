use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_SNAPSHOT_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Relay configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: IpAddr,
    pub server_port: u16,
    pub environment: Environment,
    pub log_level: String,
    pub frontend_url: String,
    /// Selects the SeaORM snapshot backend when present; in-memory otherwise.
    pub database_url: Option<String>,
    pub snapshot_ttl: Duration,
    /// Capacity of each session's outbound queue.
    pub outbound_buffer: usize,
}

/// Deployment environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Config {
    /// Load configuration from environment variables (and a `.env` file if present).
    ///
    /// All variables are optional: `PORT` / `SERVER_PORT`, `SERVER_HOST`, `ENVIRONMENT`,
    /// `LOG_LEVEL`, `FRONTEND_URL`, `DATABASE_URL`, `SNAPSHOT_TTL_SECS`, `OUTBOUND_BUFFER`.
    ///
    /// # Errors
    ///
    /// Returns an error if any numeric or address variable holds an invalid value.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if any numeric or address variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let environment = match lookup("ENVIRONMENT").as_deref() {
            Some("production") => Environment::Production,
            Some("staging") => Environment::Staging,
            _ => Environment::Development,
        };

        // PORT (set by most hosts) wins over SERVER_PORT
        let server_port = match lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT / PORT must be a valid u16"))?,
            None => DEFAULT_PORT,
        };

        let default_host = if environment == Environment::Production {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        };

        let server_host = lookup("SERVER_HOST")
            .unwrap_or_else(|| default_host.to_string())
            .parse::<IpAddr>()
            .map_err(|_| anyhow::anyhow!("SERVER_HOST must be a valid IP address"))?;

        let snapshot_ttl = match lookup("SNAPSHOT_TTL_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("SNAPSHOT_TTL_SECS must be a whole number"))?,
            ),
            None => Duration::from_secs(DEFAULT_SNAPSHOT_TTL_SECS),
        };

        let outbound_buffer = match lookup("OUTBOUND_BUFFER") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow::anyhow!("OUTBOUND_BUFFER must be a positive number"))?,
            None => DEFAULT_OUTBOUND_BUFFER,
        };

        Ok(Self {
            server_host,
            server_port,
            environment,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            frontend_url: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            snapshot_ttl,
            outbound_buffer,
        })
    }

    /// Build the socket address for the server to bind to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server_host, self.server_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: IpAddr::from([127, 0, 0, 1]),
            server_port: DEFAULT_PORT,
            environment: Environment::Development,
            log_level: "info".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            database_url: None,
            snapshot_ttl: Duration::from_secs(DEFAULT_SNAPSHOT_TTL_SECS),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

//! Configuration types for relay-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Where finished files land and how they are addressed from outside
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory served by the file exporter (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Public base URL of the file exporter, used to build retrieval links
    /// (default: "http://localhost:3000")
    #[serde(default = "default_public_host")]
    pub public_host: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            public_host: default_public_host(),
        }
    }
}

/// Progress reporting cadence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Minimum time between two status edits of the same job (default: 5s)
    #[serde(default = "default_throttle_interval", with = "duration_serde")]
    pub throttle_interval: Duration,

    /// How often the HTTP adapter samples its byte counters (default: 5s)
    #[serde(default = "default_http_poll_interval", with = "duration_serde")]
    pub http_poll_interval: Duration,

    /// How often the swarm adapter polls the swarm client (default: 1s)
    #[serde(default = "default_swarm_poll_interval", with = "duration_serde")]
    pub swarm_poll_interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            throttle_interval: default_throttle_interval(),
            http_poll_interval: default_http_poll_interval(),
            swarm_poll_interval: default_swarm_poll_interval(),
        }
    }
}

/// Telegram Bot API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather
    #[serde(default)]
    pub token: String,

    /// Bot API base URL (default: "https://api.telegram.org")
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Long-poll timeout for getUpdates (default: 30s)
    #[serde(default = "default_poll_timeout", with = "duration_serde")]
    pub poll_timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_telegram_api_base(),
            poll_timeout: default_poll_timeout(),
        }
    }
}

/// Swarm (Transmission RPC) settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// RPC endpoint (default: "http://127.0.0.1:9091/transmission/rpc")
    #[serde(default = "default_transmission_url")]
    pub rpc_url: String,

    /// Optional RPC username
    #[serde(default)]
    pub username: Option<String>,

    /// Optional RPC password
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_transmission_url(),
            username: None,
            password: None,
        }
    }
}

/// HTTP server (file export + status API) settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Main configuration for the relay
///
/// Sub-configs:
/// - [`output`](OutputConfig) - output directory and public host
/// - [`progress`](ProgressConfig) - throttle and polling intervals
/// - [`telegram`](TelegramConfig) - Bot API credentials
/// - [`swarm`](SwarmConfig) - Transmission RPC endpoint
/// - [`server`](ServerConfig) - file export / status API listener
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output directory and link host
    #[serde(default)]
    pub output: OutputConfig,

    /// Progress cadence
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Telegram Bot API
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Swarm client
    #[serde(default)]
    pub swarm: SwarmConfig,

    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Output directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.output.output_dir
    }

    /// Build a configuration from process environment variables.
    ///
    /// Recognized variables: `token`, `host`, `OUTPUT_DIR`, `BIND_ADDRESS`,
    /// `TELEGRAM_API_BASE`, `TRANSMISSION_URL`, `TRANSMISSION_USERNAME`,
    /// `TRANSMISSION_PASSWORD`, `THROTTLE_INTERVAL_SECS`. Anything unset keeps its default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reading from an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(token) = lookup("token") {
            config.telegram.token = token;
        }
        if let Some(host) = lookup("host") {
            config.output.public_host = host;
        }
        if let Some(dir) = lookup("OUTPUT_DIR") {
            config.output.output_dir = PathBuf::from(dir);
        }
        if let Some(base) = lookup("TELEGRAM_API_BASE") {
            config.telegram.api_base = base;
        }
        if let Some(addr) = lookup("BIND_ADDRESS") {
            config.server.bind_address = addr.parse().map_err(|e| Error::Config {
                message: format!("invalid bind address '{}': {}", addr, e),
                key: Some("BIND_ADDRESS".to_string()),
            })?;
        }
        if let Some(url) = lookup("TRANSMISSION_URL") {
            config.swarm.rpc_url = url;
        }
        config.swarm.username = lookup("TRANSMISSION_USERNAME").or(config.swarm.username);
        config.swarm.password = lookup("TRANSMISSION_PASSWORD").or(config.swarm.password);
        if let Some(secs) = lookup("THROTTLE_INTERVAL_SECS") {
            let secs: u64 = secs.parse().map_err(|_| Error::Config {
                message: format!("invalid throttle interval '{}'", secs),
                key: Some("THROTTLE_INTERVAL_SECS".to_string()),
            })?;
            config.progress.throttle_interval = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.output.public_host.trim().is_empty() {
            return Err(Error::Config {
                message: "public host must not be empty".to_string(),
                key: Some("public_host".to_string()),
            });
        }
        if self.progress.throttle_interval.is_zero() {
            return Err(Error::Config {
                message: "throttle interval must be greater than zero".to_string(),
                key: Some("throttle_interval".to_string()),
            });
        }
        if self.progress.http_poll_interval.is_zero() || self.progress.swarm_poll_interval.is_zero()
        {
            return Err(Error::Config {
                message: "poll intervals must be greater than zero".to_string(),
                key: Some("poll_interval".to_string()),
            });
        }
        Ok(())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_public_host() -> String {
    "http://localhost:3000".to_string()
}

fn default_throttle_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_http_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_swarm_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_transmission_url() -> String {
    "http://127.0.0.1:9091/transmission/rpc".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

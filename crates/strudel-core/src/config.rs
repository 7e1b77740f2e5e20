//! Relay configuration: defaults, optional TOML file, then environment.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | STRUDEL_CONFIG | config/relay.toml | Path of the optional TOML file. |
//! | STRUDEL_HOST / STRUDEL_PORT (or PORT) | 0.0.0.0 / 3000 | Listen address. |
//! | STRUDEL_PROVIDER | agent | `agent`, `vertex` or `mock`. |
//! | STRUDEL_ENDPOINT (or ADK_ENDPOINT) | none | Upstream URL override. |
//! | STRUDEL_API_KEY | none | Bearer token for the upstream, when it needs one. |
//! | STRUDEL_PROJECT / STRUDEL_REGION / STRUDEL_MODEL | none / us-central1 / gemini-2.5-flash | Vertex AI target (or GOOGLE_CLOUD_PROJECT, GOOGLE_CLOUD_LOCATION, GEMINI_MODEL). |
//! | STRUDEL_PREAMBLE_PATH | ./strudel_preprompt.txt | Instructional preamble file. |
//! | STRUDEL_QUEUE_ENABLED | true | Mount `/prompt` and `/get-prompt`. |
//! | STRUDEL_SERVER_URL / STRUDEL_POLL_INTERVAL_MS | http://localhost:3000 / 1000 | Queue agent target and poll period. |

use crate::error::ConfigError;
use crate::prompts::Preamble;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Config file read by [`RelayConfig::load`] when `STRUDEL_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/relay.toml";

/// Fallback upstream for the `agent` provider.
pub const DEFAULT_AGENT_ENDPOINT: &str = "http://localhost:8000/run";

/// Which upstream response shape the relay speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// `POST {"input"}` answered by `{"result": "..."}`.
    Agent,
    /// Vertex AI Gemini, streamed over SSE and aggregated.
    Vertex,
    /// Canned patterns, no network.
    Mock,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agent" | "adk" => Ok(ProviderKind::Agent),
            "vertex" | "gemini" => Ok(ProviderKind::Vertex),
            "mock" => Ok(ProviderKind::Mock),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderKind::Agent => "agent",
            ProviderKind::Vertex => "vertex",
            ProviderKind::Mock => "mock",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub provider: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    pub region: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub preamble_path: String,
    /// Directory of the web page and its assets. Unset: the gateway's bundled `static/`.
    #[serde(default)]
    pub static_dir: Option<String>,
    pub queue_enabled: bool,
    pub server_url: String,
    pub poll_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            provider: "agent".to_string(),
            endpoint: None,
            api_key: None,
            project: None,
            region: "us-central1".to_string(),
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 2048,
            preamble_path: "./strudel_preprompt.txt".to_string(),
            static_dir: None,
            queue_enabled: true,
            server_url: "http://localhost:3000".to_string(),
            poll_interval_ms: 1000,
        }
    }
}

impl RelayConfig {
    /// Load config. Precedence: legacy env (`PORT`, `ADK_ENDPOINT`, ...) >
    /// `STRUDEL_*` env > `STRUDEL_CONFIG` file (default `config/relay.toml`) > defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("STRUDEL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_sources(Some(Path::new(&path)), true)
    }

    /// Load from an explicit file, with or without the environment layers.
    pub fn from_sources(file: Option<&Path>, with_env: bool) -> Result<Self, ConfigError> {
        let defaults = RelayConfig::default();
        let mut builder = config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port as i64)?
            .set_default("provider", defaults.provider)?
            .set_default("region", defaults.region)?
            .set_default("model", defaults.model)?
            .set_default("temperature", defaults.temperature as f64)?
            .set_default("top_p", defaults.top_p as f64)?
            .set_default("top_k", defaults.top_k as i64)?
            .set_default("max_output_tokens", defaults.max_output_tokens as i64)?
            .set_default("preamble_path", defaults.preamble_path)?
            .set_default("queue_enabled", defaults.queue_enabled)?
            .set_default("server_url", defaults.server_url)?
            .set_default("poll_interval_ms", defaults.poll_interval_ms as i64)?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        if with_env {
            builder = builder
                .add_source(
                    config::Environment::with_prefix("STRUDEL")
                        .prefix_separator("_")
                        .separator("__"),
                )
                .set_override_option("port", env_opt("PORT"))?
                .set_override_option("endpoint", env_opt("ADK_ENDPOINT"))?
                .set_override_option("project", env_opt("GOOGLE_CLOUD_PROJECT"))?
                .set_override_option("region", env_opt("GOOGLE_CLOUD_LOCATION"))?
                .set_override_option("model", env_opt("GEMINI_MODEL"))?;
        }

        let cfg: RelayConfig = builder.build()?.try_deserialize()?;
        cfg.provider_kind()?;
        Ok(cfg)
    }

    pub fn provider_kind(&self) -> Result<ProviderKind, ConfigError> {
        self.provider.parse()
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "host",
                value: self.host.clone(),
            })
    }

    pub fn preamble(&self) -> Preamble {
        Preamble::File(PathBuf::from(&self.preamble_path))
    }

    /// Non-empty API key, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Prefix of environment overrides, e.g. `ORCID_ANALYST__REGISTRY__BASE_URL`
pub const ENV_PREFIX: &str = "ORCID_ANALYST";

/// Conventional variable holding the text-generation API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Value shipped in sample `.env` files; treated as "not set"
const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub generation: GenerationConfig,
    pub history: HistoryConfig,
    pub server: ServerConfig,
}

/// ORCID public API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL of the public registry API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pub.orcid.org/v3.0".to_string(),
            timeout_secs: 30,
            user_agent: format!("orcid-analyst/{} (Publication Analytics)", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Text-generation backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// API key for direct calls to the generation API
    pub api_key: Option<String>,
    /// Chat proxy endpoint used when no API key is available locally
    pub proxy_url: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Language the assistant answers in
    pub response_language: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            proxy_url: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            response_language: "Ukrainian".to_string(),
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
            timeout_secs: 60,
        }
    }
}

impl GenerationConfig {
    /// API key, unless it is missing, blank or the sample placeholder
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }

    /// Whether any generation backend (direct or proxy) is reachable
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key().is_some() || self.proxy_url.is_some()
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Local history storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub directory: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("orcid-analyst")
                .join("history"),
        }
    }
}

/// HTTP API / chat proxy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub graceful_shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7860,
            graceful_shutdown_timeout_secs: 5,
        }
    }
}

/// Values supplied on the command line, applied after file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub registry_url: Option<String>,
    pub api_key: Option<String>,
    pub proxy_url: Option<String>,
    pub history_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    /// Default location of the configuration file
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("orcid-analyst").join("config.toml"))
    }

    /// Load defaults, then the TOML file, then `ORCID_ANALYST__*` variables.
    ///
    /// An explicitly given file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    debug!("Looking for configuration at {}", default_path.display());
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;

        if config.generation.api_key().is_none() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                debug!("Using API key from {}", API_KEY_ENV);
                config.generation.api_key = Some(key);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and re-validate
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(url) = &overrides.registry_url {
            self.registry.base_url.clone_from(url);
        }
        if let Some(key) = &overrides.api_key {
            self.generation.api_key = Some(key.clone());
        }
        if let Some(proxy) = &overrides.proxy_url {
            self.generation.proxy_url = Some(proxy.clone());
        }
        if let Some(dir) = &overrides.history_dir {
            self.history.directory.clone_from(dir);
        }
        if let Some(host) = &overrides.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        self.validate()
    }

    /// Check value ranges and URL shapes
    pub fn validate(&self) -> Result<()> {
        validate_http_url("registry.base_url", &self.registry.base_url)?;
        validate_http_url("generation.base_url", &self.generation.base_url)?;
        if let Some(proxy) = &self.generation.proxy_url {
            validate_http_url("generation.proxy_url", proxy)?;
        }

        if self.registry.timeout_secs == 0 {
            return Err(Error::invalid_input(
                "registry.timeout_secs",
                "timeout must be greater than 0",
            ));
        }

        if self.generation.timeout_secs == 0 {
            return Err(Error::invalid_input(
                "generation.timeout_secs",
                "timeout must be greater than 0",
            ));
        }

        if self.generation.model.trim().is_empty() {
            return Err(Error::invalid_input(
                "generation.model",
                "model name cannot be empty",
            ));
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(Error::invalid_input(
                "generation.temperature",
                "temperature must be between 0.0 and 2.0",
            ));
        }

        if !(0.0..=1.0).contains(&self.generation.top_p) {
            return Err(Error::invalid_input(
                "generation.top_p",
                "top_p must be between 0.0 and 1.0",
            ));
        }

        if self.generation.max_output_tokens == 0 {
            return Err(Error::invalid_input(
                "generation.max_output_tokens",
                "max_output_tokens must be greater than 0",
            ));
        }

        if self.server.port == 0 {
            return Err(Error::invalid_input("server.port", "port cannot be 0"));
        }

        Ok(())
    }

    /// TOML rendering with the API key masked
    pub fn to_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.generation.api_key.is_some() {
            shown.generation.api_key = Some("***".to_string());
        }
        toml::to_string_pretty(&shown).map_err(|e| Error::Storage {
            operation: "render configuration".to_string(),
            reason: e.to_string(),
        })
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| Error::invalid_input(field, format!("invalid URL '{value}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_input(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(())
}

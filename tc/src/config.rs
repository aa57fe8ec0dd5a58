//! Configuration types and loading
//!
//! Collaborator endpoints and tuning knobs live in a YAML config file with
//! per-field defaults, so a missing or partial file always yields a working
//! configuration. API keys are never stored in the file, only the names of
//! the environment variables that hold them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub geocoding: GeocodingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub limits: Limits,
}

/// Generation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// OpenAI-compatible chat completions base URL
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,

    /// Hard cap on response tokens
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "llama3.3-70b-instruct".to_string()
}

fn default_llm_base_url() -> String {
    "https://inference.do-ai.run/v1".to_string()
}

fn default_llm_api_key_env() -> String {
    "GRADIENT_API_KEY".to_string()
}

fn default_llm_timeout_ms() -> u64 {
    60_000
}

fn default_llm_max_tokens() -> u32 {
    8192
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_llm_base_url(),
            api_key_env: default_llm_api_key_env(),
            timeout_ms: default_llm_timeout_ms(),
            max_tokens: default_llm_max_tokens(),
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .wrap_err_with(|| format!("API key not found in environment variable {}", self.api_key_env))
    }
}

/// Geocoding collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Mapbox forward-geocoding base URL
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,

    /// Environment variable holding the access token
    #[serde(default = "default_geocoding_token_env")]
    pub token_env: String,

    /// Short fixed per-call timeout in seconds
    #[serde(default = "default_geocoding_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_geocoding_base_url() -> String {
    "https://api.mapbox.com/geocoding/v5/mapbox.places".to_string()
}

fn default_geocoding_token_env() -> String {
    "MAPBOX_ACCESS_TOKEN".to_string()
}

fn default_geocoding_timeout_secs() -> u64 {
    10
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            token_env: default_geocoding_token_env(),
            timeout_secs: default_geocoding_timeout_secs(),
        }
    }
}

impl GeocodingConfig {
    pub fn token(&self) -> Result<String> {
        std::env::var(&self.token_env)
            .wrap_err_with(|| format!("Geocoding token not found in environment variable {}", self.token_env))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Web search collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,
}

fn default_search_base_url() -> String {
    "https://serpapi.com/search".to_string()
}

fn default_search_api_key_env() -> String {
    "SERP_API_KEY".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            api_key_env: default_search_api_key_env(),
        }
    }
}

impl SearchConfig {
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .wrap_err_with(|| format!("Search API key not found in environment variable {}", self.api_key_env))
    }
}

/// Pipeline limits
///
/// The day cap is a subscription-tier value, not a constant: free sessions
/// clamp to `free_max_days`, premium to `premium_max_days`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_free_max_days")]
    pub free_max_days: u32,

    #[serde(default = "default_premium_max_days")]
    pub premium_max_days: u32,

    /// Max places surfaced per generation turn (latency control)
    #[serde(default = "default_presentation_cap")]
    pub presentation_cap: usize,

    /// Most-recent-N window over caller-supplied chat history
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_free_max_days() -> u32 {
    7
}

fn default_premium_max_days() -> u32 {
    30
}

fn default_presentation_cap() -> usize {
    6
}

fn default_history_window() -> usize {
    8
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            free_max_days: default_free_max_days(),
            premium_max_days: default_premium_max_days(),
            presentation_cap: default_presentation_cap(),
            history_window: default_history_window(),
        }
    }
}

impl Limits {
    /// Day cap for the given subscription tier
    pub fn max_days(&self, premium: bool) -> u32 {
        if premium {
            self.premium_max_days
        } else {
            self.free_max_days
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults when no file exists
    ///
    /// An explicitly passed path must exist and parse; the default location
    /// (`<config dir>/tripcraft/config.yml`) is optional.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        debug!(?path, "Config::load: called");
        if let Some(path) = path {
            let text = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
            return serde_yaml::from_str(&text)
                .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e));
        }

        let default_path = Self::default_path();
        if let Some(ref path) = default_path
            && path.exists()
        {
            debug!(path = %path.display(), "Config::load: using default config location");
            let text = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
            return serde_yaml::from_str(&text)
                .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e));
        }

        debug!("Config::load: no config file, using defaults");
        Ok(Config::default())
    }

    /// Default config location under the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tripcraft").join("config.yml"))
    }
}

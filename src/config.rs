use serde::Deserialize;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Model API credential, given inline
    #[serde(default)]
    pub model_api_key: Option<String>,

    /// Path to a file holding the model API credential
    #[serde(default)]
    pub model_api_key_file: Option<String>,

    /// Model API endpoint
    #[serde(default = "default_model_api_url")]
    pub model_api_url: String,

    /// Model identifier, also recorded as the model version on results
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Per-attempt timeout for model calls
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    /// How long a model response stays memoized
    #[serde(default = "default_response_cache_ttl_secs")]
    pub response_cache_ttl_secs: u64,

    /// Redis connection URL; the response cache stays in-process when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_model_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_model_id() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_model_timeout_secs() -> u64 {
    10
}

fn default_response_cache_ttl_secs() -> u64 {
    300
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Resolves the model credential, preferring the inline value over the key file
    pub fn api_key(&self) -> anyhow::Result<String> {
        if let Some(key) = self.model_api_key.as_deref().map(str::trim) {
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        let path = self.model_api_key_file.as_deref().ok_or_else(|| {
            anyhow::anyhow!("No model credential: set MODEL_API_KEY or MODEL_API_KEY_FILE")
        })?;

        let key = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read key file {}: {}", path, e))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow::anyhow!("Key file {} is empty", path));
        }

        Ok(key.to_string())
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn response_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.response_cache_ttl_secs)
    }
}

//! Taskcapture configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main taskcapture configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Pipeline thresholds and limits
    pub pipeline: PipelineConfig,

    /// Concurrency limits
    pub concurrency: ConcurrencyConfig,

    /// HTTP server binding
    pub server: ServerConfig,

    /// Knowledge-graph store location
    pub knowledge: KnowledgeConfig,

    /// Session persistence location
    pub storage: StorageConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.llm.provider == "anthropic" && std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable or use provider 'none'.",
                self.llm.api_key_env
            ));
        }
        if self.pipeline.confidence_threshold <= 0.0 || self.pipeline.confidence_threshold > 1.0 {
            return Err(eyre::eyre!(
                "confidence-threshold must be in (0, 1], got {}",
                self.pipeline.confidence_threshold
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .taskcapture.yml
        let local_config = PathBuf::from(".taskcapture.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/taskcapture/taskcapture.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("taskcapture").join("taskcapture.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("anthropic" or "none")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds; on expiry the stage falls back
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .context(format!("Environment variable {} is not set", self.api_key_env))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 4096,
            timeout_ms: 15_000,
        }
    }
}

/// Pipeline thresholds and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum accepted input length in characters
    #[serde(rename = "max-input-chars")]
    pub max_input_chars: usize,

    /// Target decomposition size
    #[serde(rename = "min-steps")]
    pub min_steps: usize,

    #[serde(rename = "max-steps")]
    pub max_steps: usize,

    /// Confidence at or above which a classification is accepted
    #[serde(rename = "confidence-threshold")]
    pub confidence_threshold: f32,

    /// Weight of the LLM signal when merged with the rule pass
    #[serde(rename = "llm-weight")]
    pub llm_weight: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 5_000,
            min_steps: 3,
            max_steps: 7,
            confidence_threshold: 0.75,
            llm_weight: 0.6,
        }
    }
}

/// Concurrency limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Maximum concurrent LLM-backed requests
    #[serde(rename = "max-llm-requests")]
    pub max_llm_requests: usize,

    /// How long admission may queue before failing busy
    #[serde(rename = "admission-timeout-ms")]
    pub admission_timeout_ms: u64,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_llm_requests: 4,
            admission_timeout_ms: 500,
        }
    }
}

/// HTTP server binding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

/// Knowledge-graph store location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Entity store directory
    #[serde(rename = "store-path")]
    pub store_path: PathBuf,

    /// User assumed when the caller supplies none
    #[serde(rename = "default-user")]
    pub default_user: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            store_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("entitystore"),
            default_user: entitystore::DEFAULT_USER.to_string(),
        }
    }
}

/// Session persistence location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON document per capture session
    #[serde(rename = "sessions-dir")]
    pub sessions_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sessions_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("taskcapture")
                .join("sessions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.pipeline.max_input_chars, 5_000);
        assert_eq!(config.pipeline.confidence_threshold, 0.75);
        assert_eq!(config.server.port, 8787);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
llm:
  provider: none
  timeout-ms: 10000
pipeline:
  max-steps: 5
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.llm.provider, "none");
        assert_eq!(config.llm.timeout_ms, 10_000);
        assert_eq!(config.pipeline.max_steps, 5);
        // Untouched sections keep defaults
        assert_eq!(config.pipeline.min_steps, 3);
        assert_eq!(config.concurrency.max_llm_requests, 4);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = Config::default();
        config.llm.provider = "none".to_string();
        config.pipeline.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        config.pipeline.confidence_threshold = 0.75;
        assert!(config.validate().is_ok());
    }
}

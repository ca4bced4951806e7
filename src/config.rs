use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Prediction store configuration
    pub state: StateConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Classifier model configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Local explanation configuration
    #[serde(default)]
    pub explainer: ExplainerConfig,

    /// Token importance ranking configuration
    #[serde(default)]
    pub ranker: RankerConfig,

    /// Language gate configuration
    #[serde(default)]
    pub language: LanguageConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: ISSUE_TRIAGE_)
            .add_source(
                config::Environment::with_prefix("ISSUE_TRIAGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Reject values the explainer and ranker cannot work with
    pub fn validate(&self) -> Result<()> {
        self.explainer.validate()?;

        if self.ranker.top_k == 0 {
            return Err(AppError::Configuration(
                "ranker.top_k must be at least 1".to_string(),
            ));
        }

        if self.state.backend == StateBackend::Sled && self.state.path.is_none() {
            return Err(AppError::Configuration(
                "Sled backend requires 'state.path'".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            state: StateConfig::default(),
            observability: ObservabilityConfig::default(),
            classifier: ClassifierConfig::default(),
            explainer: ExplainerConfig::default(),
            ranker: RankerConfig::default(),
            language: LanguageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Prediction store backend
    #[serde(default)]
    pub backend: StateBackend,

    /// Path for the embedded database
    pub path: Option<PathBuf>,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: StateBackend::Sled,
            path: Some(PathBuf::from("./data/predictions")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StateBackend {
    #[default]
    Sled,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            prometheus_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClassifierConfig {
    /// JSON model artifact; the embedded default model is used when unset
    pub model_path: Option<PathBuf>,
}

/// Local explanation (perturb, query, fit) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainerConfig {
    /// Perturbed samples per explanation, the unmasked baseline included
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,

    /// Width of the exponential proximity kernel over normalized Hamming distance
    #[serde(default = "default_kernel_width")]
    pub kernel_width: f64,

    /// L2 penalty of the weighted ridge surrogate
    #[serde(default = "default_ridge_alpha")]
    pub ridge_alpha: f64,

    /// Default number of tokens returned per explanation
    #[serde(default = "default_num_features")]
    pub num_features: usize,

    /// Fixed sampling seed; sampling is non-deterministic when unset
    #[serde(default)]
    pub seed: Option<u64>,

    /// Attach an explanation to every prediction response
    #[serde(default)]
    pub explain_on_predict: bool,
}

impl ExplainerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_samples == 0 {
            return Err(AppError::Configuration(
                "explainer.num_samples must be at least 1".to_string(),
            ));
        }
        if !(self.kernel_width > 0.0) {
            return Err(AppError::Configuration(
                "explainer.kernel_width must be positive".to_string(),
            ));
        }
        if !(self.ridge_alpha > 0.0) {
            return Err(AppError::Configuration(
                "explainer.ridge_alpha must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            num_samples: default_num_samples(),
            kernel_width: default_kernel_width(),
            ridge_alpha: default_ridge_alpha(),
            num_features: default_num_features(),
            seed: None,
            explain_on_predict: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerConfig {
    /// Number of important tokens returned with each prediction
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Reject texts outside the accepted languages
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// ISO-639-1 codes accepted by the classifier
    #[serde(default = "default_accepted_languages")]
    pub accepted: Vec<String>,

    /// Let through texts too short or ambiguous for a reliable detection
    #[serde(default = "default_true")]
    pub allow_unknown: bool,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            accepted: default_accepted_languages(),
            allow_unknown: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    5000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "issue-triage".to_string()
}

fn default_true() -> bool {
    true
}

fn default_num_samples() -> usize {
    300
}

fn default_kernel_width() -> f64 {
    0.75
}

fn default_ridge_alpha() -> f64 {
    1.0
}

fn default_num_features() -> usize {
    10
}

fn default_top_k() -> usize {
    10
}

fn default_accepted_languages() -> Vec<String> {
    vec!["en".to_string()]
}

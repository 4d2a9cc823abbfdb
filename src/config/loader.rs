//! Configuration Loader
//!
//! Environment-aware loading on top of the `config` crate: base TOML file,
//! optional per-environment overlay, then `REAPER__` variables.

use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::ReaperConfig;

const BASE_FILE_NAME: &str = "reaper.toml";
const ENV_PREFIX: &str = "REAPER";
const ENV_SEPARATOR: &str = "__";

/// Validated configuration together with where it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    config: ReaperConfig,
    environment: String,
    config_directory: PathBuf,
}

impl LoadedConfig {
    pub fn config(&self) -> &ReaperConfig {
        &self.config
    }

    pub fn into_config(self) -> ReaperConfig {
        self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON with endpoint-like and secret-like fields masked
    pub fn sanitized(&self) -> serde_json::Value {
        let mut value = serde_json::json!(self.config);
        sanitize_json_recursive(&mut value, &["secret", "token", "credential", "url"]);
        value
    }
}

/// Builder for layered configuration loading
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_directory: PathBuf,
    environment: String,
    env_vars: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new(config_directory: impl Into<PathBuf>, environment: impl Into<String>) -> Self {
        Self {
            config_directory: config_directory.into(),
            environment: environment.into().to_lowercase(),
            env_vars: None,
        }
    }

    /// Load from `./config` for the detected environment
    pub fn load() -> ConfigResult<LoadedConfig> {
        Self::new(Self::default_config_directory(), Self::detect_environment()).build()
    }

    /// Read overrides from the given map instead of the process environment
    pub fn with_env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.env_vars = Some(vars);
        self
    }

    /// `REAPER_ENV`, defaulting to `development`
    pub fn detect_environment() -> String {
        env::var("REAPER_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    pub fn default_config_directory() -> PathBuf {
        PathBuf::from("config")
    }

    pub fn build(&self) -> ConfigResult<LoadedConfig> {
        let base_file = self.config_directory.join(BASE_FILE_NAME);
        if !base_file.is_file() {
            return Err(ConfigurationError::config_file_not_found(vec![base_file]));
        }

        let overlay_file = self
            .config_directory
            .join(format!("reaper.{}.toml", self.environment));

        debug!(
            environment = %self.environment,
            directory = %self.config_directory.display(),
            overlay_present = overlay_file.is_file(),
            "Loading configuration"
        );

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("policies.branch_deletion.protected_branches")
            .source(self.env_vars.clone());

        let config: ReaperConfig = Config::builder()
            .add_source(File::from(base_file.as_path()).format(FileFormat::Toml))
            .add_source(
                File::from(overlay_file.as_path())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(environment)
            .build()
            .map_err(|e| ConfigurationError::load_error(base_file.display().to_string(), e))?
            .try_deserialize()
            .map_err(|e| ConfigurationError::load_error(base_file.display().to_string(), e))?;

        config.validate()?;

        info!(
            environment = %self.environment,
            max_concurrent_workflows = config.workflow.max_concurrent_workflows,
            tick_period_seconds = config.scheduler.tick_period_seconds,
            branch_queue_configured = config.policies.branch_deletion.queue_url.is_some(),
            "Configuration loaded successfully"
        );

        Ok(LoadedConfig {
            config,
            environment: self.environment.clone(),
            config_directory: self.config_directory.clone(),
        })
    }
}

fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                let is_sensitive = sensitive_patterns
                    .iter()
                    .any(|pattern| key_lower.contains(pattern));

                if is_sensitive {
                    if let serde_json::Value::String(s) = val {
                        let chars: Vec<char> = s.chars().collect();
                        let masked = if chars.len() > 8 {
                            let head: String = chars[..4].iter().collect();
                            let tail: String = chars[chars.len() - 4..].iter().collect();
                            format!("{head}***{tail}")
                        } else {
                            "***".to_string()
                        };
                        *val = serde_json::Value::String(format!("[MASKED: {masked}]"));
                    }
                } else {
                    sanitize_json_recursive(val, sensitive_patterns);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                sanitize_json_recursive(item, sensitive_patterns);
            }
        }
        _ => {}
    }
}

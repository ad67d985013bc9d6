use std::path::Path;

use crate::ai::QAgentConfig;
use crate::error::ConfigError;
use crate::training::trainer::TrainerConfig;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub training: TrainerConfig,
    pub agent: QAgentConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.training.num_epochs == 0 {
            return Err(ConfigError::Validation(
                "training.num_epochs must be > 0".into(),
            ));
        }
        self.training.validate()?;

        let agent = &self.agent;
        if !(0.0..=1.0).contains(&agent.epsilon) {
            return Err(ConfigError::Validation(
                "agent.epsilon must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&agent.epsilon_max) {
            return Err(ConfigError::Validation(
                "agent.epsilon_max must be in [0, 1]".into(),
            ));
        }
        if agent.epsilon_increment < 0.0 {
            return Err(ConfigError::Validation(
                "agent.epsilon_increment must be >= 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&agent.discount) {
            return Err(ConfigError::Validation(
                "agent.discount must be in [0, 1]".into(),
            ));
        }
        if agent.learning_rate <= 0.0 || agent.learning_rate > 1.0 {
            return Err(ConfigError::Validation(
                "agent.learning_rate must be in (0, 1]".into(),
            ));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&AppConfig::default())?)
    }
}

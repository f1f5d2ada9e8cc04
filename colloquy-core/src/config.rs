//! Configuration types for Colloquy

use serde::{Deserialize, Serialize};

use crate::compression::CompressionConfig;
use crate::context::ContextConfig;
use crate::error::{ColloquyError, Result};

/// Main configuration for Colloquy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ColloquyConfig {
    /// Budget thresholds
    pub context: ContextConfig,

    /// Compression behavior
    pub compression: CompressionConfig,

    /// Archival sweep settings
    pub archive: ArchiveConfig,
}

/// Archival sweep configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Days of inactivity after which a conversation is archived
    pub stale_after_days: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            stale_after_days: 30,
        }
    }
}

impl ColloquyConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (colloquy.toml, then the path in COLLOQUY_CONFIG_PATH)
    /// 3. Environment variable overrides (`COLLOQUY_CONTEXT__MAX_MESSAGE_THRESHOLD=40`)
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source is invalid.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(ColloquyConfig::default()))
            .merge(Toml::file("colloquy.toml"));

        if let Ok(path) = std::env::var("COLLOQUY_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: ColloquyConfig = figment
            .merge(Env::prefixed("COLLOQUY_").ignore(&["CONFIG_PATH"]).split("__"))
            .extract()
            .map_err(|e| {
                ColloquyError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or fails validation.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: ColloquyConfig = Figment::from(Serialized::defaults(ColloquyConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .extract()
            .map_err(|e| {
                ColloquyError::Configuration(format!(
                    "Failed to load configuration file: {}",
                    e
                ))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a threshold is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.context.max_context_tokens == 0 {
            return Err(ColloquyError::Configuration(
                "context.max_context_tokens must be greater than 0".to_string(),
            ));
        }
        if self.context.max_message_threshold == 0 {
            return Err(ColloquyError::Configuration(
                "context.max_message_threshold must be at least 1".to_string(),
            ));
        }
        let percentage = self.context.max_token_percentage;
        if !(percentage > 0.0 && percentage <= 100.0) {
            return Err(ColloquyError::Configuration(format!(
                "context.max_token_percentage must be within (0, 100], got {}",
                percentage
            )));
        }
        if self.compression.preserve_recent_messages >= self.context.max_message_threshold {
            return Err(ColloquyError::Configuration(format!(
                "compression.preserve_recent_messages ({}) must be below context.max_message_threshold ({})",
                self.compression.preserve_recent_messages, self.context.max_message_threshold
            )));
        }
        if self.compression.target_tokens == 0 {
            return Err(ColloquyError::Configuration(
                "compression.target_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

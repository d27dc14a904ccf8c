//! Configuration module for the order desk system.
//!
//! This module provides structures and utilities for managing desk
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required configuration values are
//! properly set. The configuration is constructed once at startup and
//! injected into the services; there is no ambient global.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the order desk.
///
/// This structure contains all configuration sections required for the
/// desk to operate: instance identity, storage backend, broadcast
/// channel, and the optional HTTP admin API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this desk instance.
	pub desk: DeskSettings,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the broadcast channel sink.
	#[serde(default)]
	pub channel: ChannelConfig,
	/// Configuration for the HTTP admin API.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to this desk instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeskSettings {
	/// Unique identifier for this desk instance.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the broadcast channel sink.
///
/// Announcing is optional: with `enabled = false` (the default) orders
/// are never published and the desk operates storage-only.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
	/// Whether announcement publishing is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Which implementation to use as primary.
	pub primary: Option<String>,
	/// Map of channel implementation names to their configurations.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
	/// Total delivery attempts per call, including the first.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	/// Backoff before the second attempt, in milliseconds; doubles per attempt.
	#[serde(default = "default_base_delay_ms")]
	pub base_delay_ms: u64,
	/// Upper bound for a single backoff delay, in milliseconds.
	#[serde(default = "default_max_delay_ms")]
	pub max_delay_ms: u64,
	/// Contact affordance rendered into every announcement.
	pub contact_url: Option<String>,
}

impl Default for ChannelConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			primary: None,
			implementations: HashMap::new(),
			max_attempts: default_max_attempts(),
			base_delay_ms: default_base_delay_ms(),
			max_delay_ms: default_max_delay_ms(),
			contact_url: None,
		}
	}
}

fn default_max_attempts() -> u32 {
	3
}

fn default_base_delay_ms() -> u64 {
	500
}

fn default_max_delay_ms() -> u64 {
	8000
}

/// Configuration for the HTTP admin API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

impl Config {
	/// Loads configuration from a TOML file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path).await?;
		content.parse()
	}

	/// Validates the configuration.
	///
	/// Checks that all required sections reference implementations that
	/// are actually configured.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.desk.id.is_empty() {
			return Err(ConfigError::Validation("desk.id cannot be empty".into()));
		}

		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"storage.primary cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"storage.primary '{}' has no configuration",
				self.storage.primary
			)));
		}

		if self.channel.enabled {
			let primary = self.channel.primary.as_deref().ok_or_else(|| {
				ConfigError::Validation("channel.primary is required when channel is enabled".into())
			})?;
			if !self.channel.implementations.contains_key(primary) {
				return Err(ConfigError::Validation(format!(
					"channel.primary '{}' has no configuration",
					primary
				)));
			}
			if self.channel.max_attempts == 0 {
				return Err(ConfigError::Validation(
					"channel.max_attempts must be at least 1".into(),
				));
			}
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let config: Config = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
		[desk]
		id = "orderdesk"

		[storage]
		primary = "memory"
		[storage.implementations.memory]
	"#;

	#[test]
	fn test_minimal_config_parses_with_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.desk.id, "orderdesk");
		assert_eq!(config.storage.primary, "memory");
		assert!(!config.channel.enabled);
		assert_eq!(config.channel.max_attempts, 3);
		assert_eq!(config.channel.base_delay_ms, 500);
		assert!(config.api.is_none());
	}

	#[test]
	fn test_full_config_parses() {
		let config: Config = r#"
			[desk]
			id = "orderdesk"

			[storage]
			primary = "file"
			[storage.implementations.file]
			storage_path = "./data/desk.json"

			[channel]
			enabled = true
			primary = "telegram"
			max_attempts = 5
			contact_url = "https://t.me/desk_operator"
			[channel.implementations.telegram]
			bot_token = "token"
			chat_id = -1001234

			[api]
			enabled = true
			port = 8080
		"#
		.parse::<Config>()
		.unwrap();

		assert_eq!(config.channel.max_attempts, 5);
		assert_eq!(
			config.channel.contact_url.as_deref(),
			Some("https://t.me/desk_operator")
		);
		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 8080);
	}

	#[test]
	fn test_unknown_primary_is_rejected() {
		let result = r#"
			[desk]
			id = "orderdesk"

			[storage]
			primary = "redis"
			[storage.implementations.memory]
		"#
		.parse::<Config>();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_enabled_channel_requires_primary() {
		let result = r#"
			[desk]
			id = "orderdesk"

			[storage]
			primary = "memory"
			[storage.implementations.memory]

			[channel]
			enabled = true
		"#
		.parse::<Config>();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}
}

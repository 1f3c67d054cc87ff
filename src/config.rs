//! Client configuration
//!
//! Settings follow a priority chain:
//! 1. Built-in defaults (ClientConfig::default())
//! 2. Config file (`--config`, else ~/.config/bzrc/config.toml when present)
//! 3. Environment variables (BZRC_* prefix)
//! 4. CLI flags (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable overriding the server host
pub const ENV_HOST: &str = "BZRC_HOST";

/// Environment variable overriding the server port
pub const ENV_PORT: &str = "BZRC_PORT";

/// Connection settings for one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
	/// Server host name or address
	pub host: String,

	/// Server port; the simulator picks one per team, so there is no default
	pub port: Option<u16>,

	/// Longest inbound line accepted before the connection is dropped
	/// (None = unbounded)
	pub max_line_bytes: Option<usize>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		ClientConfig { host: "localhost".to_string(), port: None, max_line_bytes: None }
	}
}

impl ClientConfig {
	/// Parse a TOML config file
	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		let text = fs::read_to_string(path)
			.map_err(|e| ConfigError::Read { path: path.to_path_buf(), source: e })?;
		toml::from_str(&text)
			.map_err(|e| ConfigError::Parse { path: path.to_path_buf(), message: e.to_string() })
	}

	/// Per-user config file location
	pub fn default_path() -> Option<PathBuf> {
		let base = match std::env::var_os("XDG_CONFIG_HOME") {
			Some(dir) if !dir.is_empty() => PathBuf::from(dir),
			_ => PathBuf::from(std::env::var_os("HOME")?).join(".config"),
		};
		Some(base.join("bzrc").join("config.toml"))
	}

	/// Defaults, then the config file, then the environment
	///
	/// An explicitly given file must exist; the per-user file is optional.
	pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
		let mut config = match explicit {
			Some(path) => Self::from_file(path)?,
			None => match Self::default_path() {
				Some(path) if path.is_file() => Self::from_file(&path)?,
				_ => Self::default(),
			},
		};
		config.apply_env_from(|key| std::env::var(key).ok())?;
		Ok(config)
	}

	/// Apply BZRC_* overrides through `lookup`
	pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(host) = lookup(ENV_HOST) {
			self.host = host;
		}
		if let Some(port) = lookup(ENV_PORT) {
			self.port = Some(parse_port(ENV_PORT, &port)?);
		}
		Ok(())
	}

	/// Check the settings and return the port to connect to
	pub fn validate(&self) -> Result<u16, ConfigError> {
		if self.host.trim().is_empty() {
			return Err(ConfigError::InvalidValue {
				key: "host".to_string(),
				message: "must not be empty".to_string(),
			});
		}
		if self.max_line_bytes == Some(0) {
			return Err(ConfigError::InvalidValue {
				key: "maxLineBytes".to_string(),
				message: "must be positive".to_string(),
			});
		}
		match self.port {
			Some(0) | None => Err(ConfigError::InvalidValue {
				key: "port".to_string(),
				message: "a server port is required".to_string(),
			}),
			Some(port) => Ok(port),
		}
	}
}

/// Parse a port number from user input
pub fn parse_port(key: &str, value: &str) -> Result<u16, ConfigError> {
	value.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
		key: key.to_string(),
		message: format!("'{}' is not a port number: {}", value, e),
	})
}


// vim: ts=4

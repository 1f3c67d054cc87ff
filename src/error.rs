//! Error types for client operations

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::protocol::ProtocolError;

/// Main error type for the client
#[derive(Debug)]
pub enum ClientError {
	/// Failed to reach the server
	Connect { address: String, source: io::Error },

	/// Protocol error (nested)
	Protocol(ProtocolError),

	/// Configuration error (nested)
	Config(ConfigError),
}

impl fmt::Display for ClientError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ClientError::Connect { address, source } => {
				write!(f, "Failed to connect to {}: {}", address, source)
			}
			ClientError::Protocol(e) => write!(f, "Protocol error: {}", e),
			ClientError::Config(e) => write!(f, "Configuration error: {}", e),
		}
	}
}

impl Error for ClientError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			ClientError::Connect { source, .. } => Some(source),
			ClientError::Protocol(e) => Some(e),
			ClientError::Config(e) => Some(e),
		}
	}
}

impl From<ProtocolError> for ClientError {
	fn from(e: ProtocolError) -> Self {
		ClientError::Protocol(e)
	}
}

impl From<ConfigError> for ClientError {
	fn from(e: ConfigError) -> Self {
		ClientError::Config(e)
	}
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
	/// Config file could not be read
	Read { path: PathBuf, source: io::Error },

	/// Config file is not valid TOML or has wrong types
	Parse { path: PathBuf, message: String },

	/// A setting has an unusable value
	InvalidValue { key: String, message: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::Read { path, source } => {
				write!(f, "Cannot read {}: {}", path.display(), source)
			}
			ConfigError::Parse { path, message } => {
				write!(f, "Cannot parse {}: {}", path.display(), message)
			}
			ConfigError::InvalidValue { key, message } => {
				write!(f, "Invalid value for '{}': {}", key, message)
			}
		}
	}
}

impl Error for ConfigError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			ConfigError::Read { source, .. } => Some(source),
			_ => None,
		}
	}
}


// vim: ts=4

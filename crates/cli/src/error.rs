use std::path::PathBuf;

use marketlink::{ProviderError, RegistryError};
use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("failed to load config {path}: {message}")]
	Config { path: PathBuf, message: String },

	#[error(transparent)]
	Registry(#[from] RegistryError),

	#[error(transparent)]
	Provider(#[from] ProviderError),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::InvalidInput(_) => ErrorCode::InvalidInput,
			CliError::Config { .. } => ErrorCode::ConfigError,
			CliError::Registry(_) => ErrorCode::RegistryError,
			CliError::Provider(_) => ErrorCode::ProviderError,
		}
	}

	pub fn to_command_error(&self) -> CommandError {
		CommandError {
			code: self.code(),
			message: self.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use marketlink::NetworkTag;

	use super::*;

	#[test]
	fn registry_errors_keep_their_message() {
		let err = CliError::from(RegistryError::Incomplete {
			network: NetworkTag::Mumbai,
			field: "nftAddress",
		});
		let command_error = err.to_command_error();
		assert_eq!(command_error.code, ErrorCode::RegistryError);
		assert_eq!(command_error.message, "address record for MUMBAI is missing nftAddress");
	}

	#[test]
	fn config_errors_name_the_file() {
		let err = CliError::Config {
			path: PathBuf::from("marketlink.json"),
			message: "expected value at line 1 column 1".into(),
		};
		assert_eq!(err.code(), ErrorCode::ConfigError);
		assert!(err.to_string().contains("marketlink.json"));
	}

	#[test]
	fn provider_errors_map_to_provider_code() {
		let err = CliError::from(ProviderError::NoAccounts);
		assert_eq!(err.code(), ErrorCode::ProviderError);
		assert_eq!(err.to_command_error().message, ProviderError::NoAccounts.to_string());
	}
}

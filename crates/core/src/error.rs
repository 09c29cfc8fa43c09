//! Error types for the session pipeline.
//!
//! Three layers, innermost first:
//!
//! - [`ProviderError`] - what a wallet connector or RPC provider reports
//! - [`RegistryError`] - what the address registry client reports
//! - [`SessionError`] - the cycle-level taxonomy every failure is folded into
//!
//! None of these escape an establishment cycle. They end up in the terminal
//! state of an [`Establishment`](crate::Establishment) and in the logs.

use marketlink_protocol::{ProviderErrorCode, QuantityError, RpcErrorObject};
use thiserror::Error;

use crate::network::NetworkTag;

/// Result alias for collaborator calls.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Failure reported by a wallet connector or chain provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
	/// The user or wallet policy declined the request.
	#[error("request rejected ({code}): {message}")]
	Rejected { code: i64, message: String },

	/// The provider could not be reached or the call did not complete.
	#[error("transport failure: {0}")]
	Transport(String),

	/// The provider answered with a JSON-RPC error.
	#[error("rpc error {code}: {message}")]
	Rpc { code: i64, message: String },

	/// The provider answered with something that is not the expected shape.
	#[error("invalid provider response: {0}")]
	InvalidResponse(String),

	/// A signer was asked for its address but the wallet exposes no account.
	#[error("wallet exposes no accounts")]
	NoAccounts,
}

impl ProviderError {
	/// Whether this error means the user declined.
	pub fn is_rejection(&self) -> bool {
		matches!(self, ProviderError::Rejected { .. })
	}
}

impl From<RpcErrorObject> for ProviderError {
	fn from(err: RpcErrorObject) -> Self {
		match ProviderErrorCode::from_code(err.code) {
			Some(code) if code.is_rejection() => ProviderError::Rejected {
				code: err.code,
				message: err.message,
			},
			_ => ProviderError::Rpc {
				code: err.code,
				message: err.message,
			},
		}
	}
}

impl From<QuantityError> for ProviderError {
	fn from(err: QuantityError) -> Self {
		ProviderError::InvalidResponse(err.to_string())
	}
}

impl From<reqwest::Error> for ProviderError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_decode() {
			ProviderError::InvalidResponse(err.to_string())
		} else {
			ProviderError::Transport(err.to_string())
		}
	}
}

/// Failure fetching an address record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
	/// Transport failed or the registry answered with an error status.
	#[error("address registry unreachable: {0}")]
	Unreachable(String),

	/// The payload could not be decoded or describes another network.
	#[error("malformed address registry response: {0}")]
	MalformedResponse(String),

	/// The record lacks one of the two contract addresses.
	#[error("address record for {network} is missing {field}")]
	Incomplete { network: NetworkTag, field: &'static str },
}

/// Cycle-level failure taxonomy.
///
/// `ConnectorUnavailable` and `ConnectorRejected` are branches, not terminal
/// failures: the establisher records them and continues on the fallback path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
	#[error("no wallet connector present")]
	ConnectorUnavailable,

	#[error("wallet connection rejected: {0}")]
	ConnectorRejected(String),

	#[error("transport failure: {0}")]
	TransportFailure(String),

	#[error("malformed registry response: {0}")]
	MalformedRegistryResponse(String),

	#[error("incomplete address record for {network}: missing {field}")]
	IncompleteAddressRecord { network: NetworkTag, field: &'static str },

	#[error("unsupported network: {0}")]
	UnsupportedNetwork(String),

	#[error("{operation} timed out after {ms}ms")]
	Timeout { operation: &'static str, ms: u64 },
}

impl From<ProviderError> for SessionError {
	fn from(err: ProviderError) -> Self {
		match err {
			ProviderError::Rejected { message, .. } => SessionError::ConnectorRejected(message),
			other => SessionError::TransportFailure(other.to_string()),
		}
	}
}

impl From<RegistryError> for SessionError {
	fn from(err: RegistryError) -> Self {
		match err {
			RegistryError::Unreachable(msg) => SessionError::TransportFailure(msg),
			RegistryError::MalformedResponse(msg) => SessionError::MalformedRegistryResponse(msg),
			RegistryError::Incomplete { network, field } => SessionError::IncompleteAddressRecord { network, field },
		}
	}
}

impl SessionError {
	/// Whether this error is a transport-level failure (including timeouts).
	pub fn is_transport(&self) -> bool {
		matches!(self, SessionError::TransportFailure(_) | SessionError::Timeout { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejection_codes_map_to_rejected() {
		let err: ProviderError = RpcErrorObject {
			code: 4001,
			message: "User rejected the request.".into(),
			data: None,
		}
		.into();
		assert!(err.is_rejection());
		assert_eq!(
			SessionError::from(err),
			SessionError::ConnectorRejected("User rejected the request.".into())
		);
	}

	#[test]
	fn other_rpc_codes_are_transport_failures() {
		let err: ProviderError = RpcErrorObject {
			code: -32603,
			message: "internal error".into(),
			data: None,
		}
		.into();
		assert!(!err.is_rejection());
		assert!(SessionError::from(err).is_transport());
	}

	#[test]
	fn registry_errors_fold_into_session_taxonomy() {
		assert!(SessionError::from(RegistryError::Unreachable("status 503".into())).is_transport());
		assert_eq!(
			SessionError::from(RegistryError::Incomplete {
				network: NetworkTag::Mumbai,
				field: "marketplaceAddress",
			}),
			SessionError::IncompleteAddressRecord {
				network: NetworkTag::Mumbai,
				field: "marketplaceAddress",
			}
		);
		assert!(matches!(
			SessionError::from(RegistryError::MalformedResponse("eof".into())),
			SessionError::MalformedRegistryResponse(_)
		));
	}
}

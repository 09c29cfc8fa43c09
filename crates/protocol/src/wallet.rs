//! EIP-1193 wallet provider vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Event channels a wallet provider emits that the session reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WalletEventKind {
	/// The selected account set changed (switch, lock, or disconnect).
	AccountsChanged,
	/// The wallet moved to a different chain.
	ChainChanged,
}

impl WalletEventKind {
	/// All kinds, in subscription order.
	pub const ALL: [WalletEventKind; 2] = [WalletEventKind::AccountsChanged, WalletEventKind::ChainChanged];

	/// Event name as passed to `provider.on(...)`.
	pub fn as_str(self) -> &'static str {
		match self {
			WalletEventKind::AccountsChanged => "accountsChanged",
			WalletEventKind::ChainChanged => "chainChanged",
		}
	}
}

impl fmt::Display for WalletEventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Provider error codes defined by EIP-1193 plus the common "request pending"
/// JSON-RPC extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorCode {
	UserRejected,
	Unauthorized,
	UnsupportedMethod,
	Disconnected,
	ChainDisconnected,
	RequestPending,
}

impl ProviderErrorCode {
	pub fn code(self) -> i64 {
		match self {
			ProviderErrorCode::UserRejected => 4001,
			ProviderErrorCode::Unauthorized => 4100,
			ProviderErrorCode::UnsupportedMethod => 4200,
			ProviderErrorCode::Disconnected => 4900,
			ProviderErrorCode::ChainDisconnected => 4901,
			ProviderErrorCode::RequestPending => -32002,
		}
	}

	pub fn from_code(code: i64) -> Option<Self> {
		match code {
			4001 => Some(ProviderErrorCode::UserRejected),
			4100 => Some(ProviderErrorCode::Unauthorized),
			4200 => Some(ProviderErrorCode::UnsupportedMethod),
			4900 => Some(ProviderErrorCode::Disconnected),
			4901 => Some(ProviderErrorCode::ChainDisconnected),
			-32002 => Some(ProviderErrorCode::RequestPending),
			_ => None,
		}
	}

	/// Whether the code means the user (or wallet policy) declined access.
	pub fn is_rejection(self) -> bool {
		matches!(
			self,
			ProviderErrorCode::UserRejected | ProviderErrorCode::Unauthorized | ProviderErrorCode::RequestPending
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn event_names_match_eip1193() {
		assert_eq!(WalletEventKind::AccountsChanged.as_str(), "accountsChanged");
		assert_eq!(WalletEventKind::ChainChanged.to_string(), "chainChanged");
		assert_eq!(
			serde_json::to_string(&WalletEventKind::ChainChanged).unwrap(),
			"\"chainChanged\""
		);
	}

	#[test]
	fn codes_round_trip_and_classify() {
		for code in [4001, 4100, 4200, 4900, 4901, -32002] {
			assert_eq!(ProviderErrorCode::from_code(code).map(ProviderErrorCode::code), Some(code));
		}
		assert!(ProviderErrorCode::UserRejected.is_rejection());
		assert!(!ProviderErrorCode::Disconnected.is_rejection());
		assert_eq!(ProviderErrorCode::from_code(-32603), None);
	}
}

//! The published contract session.

use serde::{Serialize, Serializer};

use crate::contract::{ContractBinding, ContractSet};
use crate::network::NetworkTag;
use crate::units::format_ether;

/// Label reported for the network before any cycle has resolved one.
pub const UNKNOWN_NETWORK: &str = "unknown";

/// Snapshot of the connection state the UI renders from.
///
/// Values are replaced whole on publication; a reader holding a `Session`
/// always sees fields that belong together.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	/// Connected account address; empty when no wallet is connected.
	pub account: String,
	/// Resolved network; `None` until the first cycle completes.
	#[serde(serialize_with = "serialize_network")]
	pub network: Option<NetworkTag>,
	/// Account balance in ether as a decimal string.
	pub balance: String,
	/// Whether an interactive wallet connector backs this session.
	pub has_wallet_connector: bool,
	/// Whether the fields are consistent and safe to act on.
	pub is_ready: bool,
	pub marketplace: Option<ContractBinding>,
	pub nft: Option<ContractBinding>,
}

fn serialize_network<S: Serializer>(network: &Option<NetworkTag>, serializer: S) -> Result<S::Ok, S::Error> {
	match network {
		Some(tag) => serializer.serialize_str(tag.as_str()),
		None => serializer.serialize_str(UNKNOWN_NETWORK),
	}
}

impl Default for Session {
	fn default() -> Self {
		Self {
			account: String::new(),
			network: None,
			balance: format_ether(0),
			has_wallet_connector: false,
			is_ready: false,
			marketplace: None,
			nft: None,
		}
	}
}

impl Session {
	/// Network label as shown to users (`"MUMBAI"`, `"UNSUPPORTED"`, `"unknown"`).
	pub fn network_label(&self) -> &'static str {
		self.network.map(NetworkTag::as_str).unwrap_or(UNKNOWN_NETWORK)
	}

	/// Whether both contract bindings are present.
	pub fn has_contracts(&self) -> bool {
		self.marketplace.is_some() && self.nft.is_some()
	}

	/// Both bindings as a pair, if present.
	pub fn contracts(&self) -> Option<(&ContractBinding, &ContractBinding)> {
		self.marketplace.as_ref().zip(self.nft.as_ref())
	}

	/// Whether the session is authenticated with a wallet account.
	pub fn is_authenticated(&self) -> bool {
		!self.account.is_empty()
	}

	pub(crate) fn set_contracts(&mut self, contracts: Option<ContractSet>) {
		match contracts {
			Some(set) => {
				self.marketplace = Some(set.marketplace);
				self.nft = Some(set.nft);
			}
			None => {
				self.marketplace = None;
				self.nft = None;
			}
		}
	}

	/// Checks the publication invariant: bindings are both present and bound
	/// to the session's network, or both absent.
	pub fn is_consistent(&self) -> bool {
		match (&self.marketplace, &self.nft) {
			(None, None) => true,
			(Some(marketplace), Some(nft)) => {
				Some(marketplace.network()) == self.network
					&& nft.network() == marketplace.network()
					&& marketplace.access().same_as(nft.access())
			}
			_ => false,
		}
	}
}

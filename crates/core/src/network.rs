//! Chain identifier resolution.
//!
//! [`resolve`] is the only producer of [`NetworkTag`] values. It is total:
//! anything it does not recognise becomes [`NetworkTag::Unsupported`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Chain id of the Polygon Mumbai testnet.
pub const MUMBAI_CHAIN_ID: u64 = 80_001;

/// Chain ids used by local development nodes (Hardhat, Ganache/Anvil).
pub const LOCAL_CHAIN_IDS: [u64; 2] = [31_337, 1_337];

const MUMBAI_NAMES: [&str; 2] = ["maticmum", "mumbai"];
const LOCAL_NAMES: [&str; 3] = ["localhost", "hardhat", "anvil"];

/// Deployment targets the marketplace contracts exist on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetworkTag {
	Mumbai,
	Localhost,
	/// Any chain the marketplace is not deployed to.
	Unsupported,
}

impl NetworkTag {
	/// Registry key / display label.
	pub fn as_str(self) -> &'static str {
		match self {
			NetworkTag::Mumbai => "MUMBAI",
			NetworkTag::Localhost => "LOCALHOST",
			NetworkTag::Unsupported => "UNSUPPORTED",
		}
	}

	pub fn is_supported(self) -> bool {
		self != NetworkTag::Unsupported
	}
}

impl fmt::Display for NetworkTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for NetworkTag {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"MUMBAI" => Ok(NetworkTag::Mumbai),
			"LOCALHOST" => Ok(NetworkTag::Localhost),
			"UNSUPPORTED" => Ok(NetworkTag::Unsupported),
			other => Err(format!("unknown network tag: {other}")),
		}
	}
}

/// Raw chain identity as reported by a wallet or provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChainIdentifier {
	/// Numeric EIP-155 chain id.
	Id(u64),
	/// Provider network name (`"maticmum"`, `"hardhat"`, ...).
	Name(String),
}

impl ChainIdentifier {
	/// Interprets a raw string from a wallet event or config value.
	///
	/// `0x`-prefixed hex and plain decimal become [`ChainIdentifier::Id`];
	/// anything else (including hex that overflows) is kept as a name.
	pub fn parse(raw: &str) -> Self {
		let trimmed = raw.trim();
		let hex = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X"));
		let parsed = match hex {
			Some(digits) => u64::from_str_radix(digits, 16).ok(),
			None if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) => trimmed.parse().ok(),
			None => None,
		};
		match parsed {
			Some(id) => ChainIdentifier::Id(id),
			None => ChainIdentifier::Name(trimmed.to_ascii_lowercase()),
		}
	}
}

impl From<u64> for ChainIdentifier {
	fn from(id: u64) -> Self {
		ChainIdentifier::Id(id)
	}
}

impl fmt::Display for ChainIdentifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChainIdentifier::Id(id) => write!(f, "{id}"),
			ChainIdentifier::Name(name) => f.write_str(name),
		}
	}
}

/// Maps a raw chain identity onto a supported deployment target.
pub fn resolve(chain: &ChainIdentifier) -> NetworkTag {
	match chain {
		ChainIdentifier::Id(MUMBAI_CHAIN_ID) => NetworkTag::Mumbai,
		ChainIdentifier::Id(id) if LOCAL_CHAIN_IDS.contains(id) => NetworkTag::Localhost,
		ChainIdentifier::Id(_) => NetworkTag::Unsupported,
		ChainIdentifier::Name(name) => {
			let name = name.to_ascii_lowercase();
			if MUMBAI_NAMES.contains(&name.as_str()) {
				NetworkTag::Mumbai
			} else if LOCAL_NAMES.contains(&name.as_str()) {
				NetworkTag::Localhost
			} else {
				NetworkTag::Unsupported
			}
		}
	}
}

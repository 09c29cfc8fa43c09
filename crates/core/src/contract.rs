//! Contract bindings and the fail-closed session builder.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};
use tracing::warn;

use crate::network::NetworkTag;
use crate::provider::ChainAccess;
use crate::registry::AddressRecord;

/// A contract's interface description (name plus ABI).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractInterface {
	#[serde(rename = "contractName")]
	pub name: String,
	pub abi: Value,
}

impl ContractInterface {
	pub fn new(name: impl Into<String>, abi: Value) -> Self {
		Self { name: name.into(), abi }
	}

	/// Reads a Hardhat compilation artifact (`{"contractName", "abi", ...}`).
	pub fn from_artifact(json: &str) -> serde_json::Result<Self> {
		serde_json::from_str(json)
	}

	/// Names of the functions declared in the ABI.
	pub fn functions(&self) -> Vec<&str> {
		self.abi
			.as_array()
			.map(|entries| {
				entries
					.iter()
					.filter(|entry| entry.get("type").and_then(Value::as_str) == Some("function"))
					.filter_map(|entry| entry.get("name").and_then(Value::as_str))
					.collect()
			})
			.unwrap_or_default()
	}

	pub fn has_function(&self, name: &str) -> bool {
		self.functions().contains(&name)
	}

	/// Marketplace interface the front end calls into.
	pub fn marketplace() -> Self {
		Self::new(
			"Marketplace",
			json!([
				function("getListingFee", json!([]), json!([uint("")]), "view"),
				function(
					"createMarketItem",
					json!([address("nftContractAddress"), uint("tokenId"), uint("price")]),
					json!([uint("")]),
					"payable"
				),
				function(
					"createMarketSale",
					json!([address("nftContractAddress"), uint("marketItemId")]),
					json!([]),
					"payable"
				),
				function(
					"cancelMarketItem",
					json!([address("nftContractAddress"), uint("marketItemId")]),
					json!([]),
					"nonpayable"
				),
				function("fetchAvailableMarketItems", json!([]), json!([market_items()]), "view"),
				function("fetchOwnedMarketItems", json!([]), json!([market_items()]), "view"),
				function("fetchSellingMarketItems", json!([]), json!([market_items()]), "view"),
			]),
		)
	}

	/// NFT interface the front end calls into.
	pub fn nft() -> Self {
		Self::new(
			"NFT",
			json!([
				function("mintToken", json!([string("tokenURI")]), json!([uint("")]), "nonpayable"),
				function("tokenURI", json!([uint("tokenId")]), json!([string("")]), "view"),
				function("ownerOf", json!([uint("tokenId")]), json!([address("")]), "view"),
				function(
					"setApprovalForAll",
					json!([address("operator"), bool_param("approved")]),
					json!([]),
					"nonpayable"
				),
				function("getTokensOwnedByMe", json!([]), json!([uint_array("")]), "view"),
				function("getTokensCreatedByMe", json!([]), json!([uint_array("")]), "view"),
			]),
		)
	}
}

fn function(name: &str, inputs: Value, outputs: Value, mutability: &str) -> Value {
	json!({
		"type": "function",
		"name": name,
		"inputs": inputs,
		"outputs": outputs,
		"stateMutability": mutability,
	})
}

fn param(name: &str, ty: &str) -> Value {
	json!({ "name": name, "type": ty, "internalType": ty })
}

fn uint(name: &str) -> Value {
	param(name, "uint256")
}

fn uint_array(name: &str) -> Value {
	param(name, "uint256[]")
}

fn address(name: &str) -> Value {
	param(name, "address")
}

fn string(name: &str) -> Value {
	param(name, "string")
}

fn bool_param(name: &str) -> Value {
	param(name, "bool")
}

fn market_items() -> Value {
	json!({
		"name": "",
		"type": "tuple[]",
		"internalType": "struct Marketplace.MarketItem[]",
		"components": [
			uint("marketItemId"),
			address("nftContractAddress"),
			uint("tokenId"),
			address("creator"),
			address("seller"),
			address("owner"),
			uint("price"),
			bool_param("sold"),
			bool_param("canceled"),
		],
	})
}

/// A remote contract handle: address + interface + the access it was bound with.
///
/// Immutable; a network or account change produces new bindings rather than
/// mutating these.
#[derive(Clone)]
pub struct ContractBinding {
	address: String,
	interface: Rc<ContractInterface>,
	access: ChainAccess,
	network: NetworkTag,
}

impl ContractBinding {
	pub fn new(address: impl Into<String>, interface: Rc<ContractInterface>, access: ChainAccess, network: NetworkTag) -> Self {
		Self {
			address: address.into(),
			interface,
			access,
			network,
		}
	}

	pub fn address(&self) -> &str {
		&self.address
	}

	pub fn interface(&self) -> &ContractInterface {
		&self.interface
	}

	pub fn access(&self) -> &ChainAccess {
		&self.access
	}

	pub fn network(&self) -> NetworkTag {
		self.network
	}

	/// Whether the binding can authorize calls (bound to a signer).
	pub fn can_sign(&self) -> bool {
		self.access.is_signer()
	}
}

impl fmt::Debug for ContractBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ContractBinding")
			.field("address", &self.address)
			.field("interface", &self.interface.name)
			.field("access", &self.access)
			.field("network", &self.network)
			.finish()
	}
}

impl Serialize for ContractBinding {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		use serde::ser::SerializeStruct;

		let mut state = serializer.serialize_struct("ContractBinding", 4)?;
		state.serialize_field("address", &self.address)?;
		state.serialize_field("interface", &self.interface.name)?;
		state.serialize_field("network", &self.network)?;
		state.serialize_field("signer", &self.can_sign())?;
		state.end()
	}
}

/// Both marketplace bindings, always produced together.
#[derive(Debug, Clone)]
pub struct ContractSet {
	pub marketplace: ContractBinding,
	pub nft: ContractBinding,
}

/// Builds [`ContractSet`]s from address records.
#[derive(Debug, Clone)]
pub struct ContractSessionBuilder {
	marketplace: Rc<ContractInterface>,
	nft: Rc<ContractInterface>,
}

impl Default for ContractSessionBuilder {
	fn default() -> Self {
		Self::new(ContractInterface::marketplace(), ContractInterface::nft())
	}
}

impl ContractSessionBuilder {
	pub fn new(marketplace: ContractInterface, nft: ContractInterface) -> Self {
		Self {
			marketplace: Rc::new(marketplace),
			nft: Rc::new(nft),
		}
	}

	/// Binds both contracts in `record` to `access`.
	///
	/// Returns `None` unless both addresses are present; a session never
	/// carries one working binding next to a missing one.
	pub fn build(&self, access: &ChainAccess, record: &AddressRecord) -> Option<ContractSet> {
		let marketplace_address = record.marketplace_address.trim();
		let nft_address = record.nft_address.trim();
		if marketplace_address.is_empty() || nft_address.is_empty() {
			warn!(
				target = "marketlink.contracts",
				network = %record.network,
				"address record incomplete; leaving contracts unbound"
			);
			return None;
		}

		Some(ContractSet {
			marketplace: ContractBinding::new(marketplace_address, Rc::clone(&self.marketplace), access.clone(), record.network),
			nft: ContractBinding::new(nft_address, Rc::clone(&self.nft), access.clone(), record.network),
		})
	}
}

//! Address registry payloads.
//!
//! The registry answers `GET /addresses?network={TAG}` with a single record.
//! The deploy tooling writes the same shape to `addresses/{TAG}.json`, so the
//! payload type doubles as the on-disk format.

use serde::{Deserialize, Serialize};

/// Record as it appears on the wire.
///
/// Every field is optional here: a registry may omit or null out an address
/// for a network that was only partially deployed. Completeness is checked by
/// the registry client, not by deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecordPayload {
	/// Network tag the record was published for (e.g. `"MUMBAI"`).
	#[serde(default)]
	pub network: Option<String>,
	/// Address of the marketplace contract.
	#[serde(default)]
	pub marketplace_address: Option<String>,
	/// Address of the NFT contract.
	#[serde(default)]
	pub nft_address: Option<String>,
}

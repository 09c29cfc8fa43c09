//! Address registry backed by a deploy output directory.
//!
//! The deploy script writes one `{TAG}.json` per network
//! (`addresses/MUMBAI.json`, `addresses/LOCALHOST.json`) with the same shape
//! the HTTP registry serves.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use marketlink::protocol::AddressRecordPayload;
use marketlink::{AddressRecord, AddressRegistry, NetworkTag, RegistryError};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileAddressRegistry {
	dir: PathBuf,
}

impl FileAddressRegistry {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// File holding the record for `network`.
	pub fn record_path(&self, network: NetworkTag) -> PathBuf {
		self.dir.join(format!("{}.json", network.as_str()))
	}
}

#[async_trait(?Send)]
impl AddressRegistry for FileAddressRegistry {
	async fn fetch_addresses(&self, network: NetworkTag) -> Result<AddressRecord, RegistryError> {
		let path = self.record_path(network);
		debug!(target = "marketlink.registry", path = %path.display(), "reading address record");

		let raw = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
			ErrorKind::NotFound => RegistryError::Unreachable(format!("no deployment recorded at {}", path.display())),
			_ => RegistryError::Unreachable(format!("{}: {e}", path.display())),
		})?;
		let payload: AddressRecordPayload =
			serde_json::from_slice(&raw).map_err(|e| RegistryError::MalformedResponse(format!("{}: {e}", path.display())))?;

		AddressRecord::from_payload(network, payload)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn write(dir: &Path, name: &str, body: &str) {
		std::fs::write(dir.join(name), body).unwrap();
	}

	#[tokio::test]
	async fn reads_deploy_output() {
		let dir = tempfile::tempdir().unwrap();
		write(
			dir.path(),
			"LOCALHOST.json",
			r#"{
  "network": "LOCALHOST",
  "nftAddress": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
  "marketplaceAddress": "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
}"#,
		);

		let registry = FileAddressRegistry::new(dir.path());
		let record = registry.fetch_addresses(NetworkTag::Localhost).await.unwrap();
		assert_eq!(record.marketplace_address, "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
		assert_eq!(record.nft_address, "0x5FbDB2315678afecb367f032d93F642f64180aa3");
	}

	#[tokio::test]
	async fn missing_file_is_unreachable() {
		let dir = tempfile::tempdir().unwrap();
		let registry = FileAddressRegistry::new(dir.path());
		let err = registry.fetch_addresses(NetworkTag::Mumbai).await.unwrap_err();
		assert!(matches!(err, RegistryError::Unreachable(msg) if msg.contains("MUMBAI.json")));
	}

	#[tokio::test]
	async fn garbage_is_malformed() {
		let dir = tempfile::tempdir().unwrap();
		write(dir.path(), "MUMBAI.json", "Deploying contracts with: 0x...");
		let err = FileAddressRegistry::new(dir.path()).fetch_addresses(NetworkTag::Mumbai).await.unwrap_err();
		assert!(matches!(err, RegistryError::MalformedResponse(_)));
	}

	#[tokio::test]
	async fn null_address_is_incomplete() {
		let dir = tempfile::tempdir().unwrap();
		write(dir.path(), "MUMBAI.json", r#"{"network": "MUMBAI", "marketplaceAddress": null, "nftAddress": "0xBB"}"#);
		let err = FileAddressRegistry::new(dir.path()).fetch_addresses(NetworkTag::Mumbai).await.unwrap_err();
		assert_eq!(
			err,
			RegistryError::Incomplete {
				network: NetworkTag::Mumbai,
				field: "marketplaceAddress"
			}
		);
	}

	#[test]
	fn record_path_uses_tag() {
		let registry = FileAddressRegistry::new("addresses");
		assert_eq!(registry.record_path(NetworkTag::Mumbai), PathBuf::from("addresses/MUMBAI.json"));
	}
}

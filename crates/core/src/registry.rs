//! Address registry client.
//!
//! Looks up where the marketplace and NFT contracts are deployed for a
//! [`NetworkTag`]. One request per lookup; retry policy belongs to the caller.

use async_trait::async_trait;
use marketlink_protocol::AddressRecordPayload;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::RegistryError;
use crate::network::NetworkTag;

/// A complete set of deployed contract addresses for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
	pub network: NetworkTag,
	pub marketplace_address: String,
	pub nft_address: String,
}

impl AddressRecord {
	pub fn new(network: NetworkTag, marketplace_address: impl Into<String>, nft_address: impl Into<String>) -> Self {
		Self {
			network,
			marketplace_address: marketplace_address.into(),
			nft_address: nft_address.into(),
		}
	}

	/// Validates a wire payload fetched for `requested`.
	///
	/// A payload naming a different network is malformed; a payload missing
	/// either address (absent, null, or blank) is incomplete.
	pub fn from_payload(requested: NetworkTag, payload: AddressRecordPayload) -> Result<Self, RegistryError> {
		if let Some(network) = payload.network.as_deref() {
			if !network.eq_ignore_ascii_case(requested.as_str()) {
				return Err(RegistryError::MalformedResponse(format!(
					"requested {requested} but registry answered for {network}"
				)));
			}
		}

		let marketplace_address = non_blank(payload.marketplace_address).ok_or(RegistryError::Incomplete {
			network: requested,
			field: "marketplaceAddress",
		})?;
		let nft_address = non_blank(payload.nft_address).ok_or(RegistryError::Incomplete {
			network: requested,
			field: "nftAddress",
		})?;

		Ok(Self {
			network: requested,
			marketplace_address,
			nft_address,
		})
	}
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Source of address records.
#[async_trait(?Send)]
pub trait AddressRegistry {
	async fn fetch_addresses(&self, network: NetworkTag) -> Result<AddressRecord, RegistryError>;
}

/// Registry reached over HTTP at `GET {base}/addresses?network={TAG}`.
#[derive(Debug, Clone)]
pub struct HttpAddressRegistry {
	client: reqwest::Client,
	endpoint: Url,
}

impl HttpAddressRegistry {
	/// Creates a client for the registry rooted at `base_url`.
	pub fn new(base_url: &str) -> Result<Self, RegistryError> {
		Self::with_client(reqwest::Client::new(), base_url)
	}

	/// Creates a client sharing an existing `reqwest` client.
	pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, RegistryError> {
		let endpoint = addresses_endpoint(base_url)?;
		Ok(Self { client, endpoint })
	}

	/// Full lookup URL for `network`.
	pub fn lookup_url(&self, network: NetworkTag) -> Url {
		let mut url = self.endpoint.clone();
		url.query_pairs_mut().clear().append_pair("network", network.as_str());
		url
	}
}

fn addresses_endpoint(base_url: &str) -> Result<Url, RegistryError> {
	let mut base = Url::parse(base_url).map_err(|e| RegistryError::Unreachable(format!("invalid registry url {base_url:?}: {e}")))?;
	if !base.path().ends_with('/') {
		let path = format!("{}/", base.path());
		base.set_path(&path);
	}
	base.join("addresses")
		.map_err(|e| RegistryError::Unreachable(format!("invalid registry url {base_url:?}: {e}")))
}

#[async_trait(?Send)]
impl AddressRegistry for HttpAddressRegistry {
	async fn fetch_addresses(&self, network: NetworkTag) -> Result<AddressRecord, RegistryError> {
		let url = self.lookup_url(network);
		debug!(target = "marketlink.registry", %url, "fetching address record");

		let response = self
			.client
			.get(url.clone())
			.send()
			.await
			.map_err(|e| RegistryError::Unreachable(format!("{url}: {e}")))?;

		let status = response.status();
		if !status.is_success() {
			return Err(RegistryError::Unreachable(format!("{url} answered {status}")));
		}

		let body = response
			.bytes()
			.await
			.map_err(|e| RegistryError::Unreachable(format!("{url}: {e}")))?;
		let payload: AddressRecordPayload =
			serde_json::from_slice(&body).map_err(|e| RegistryError::MalformedResponse(e.to_string()))?;

		AddressRecord::from_payload(network, payload)
	}
}

//! Read-only chain provider over HTTP JSON-RPC.
//!
//! Used as the fallback provider when no wallet is connected, and as the
//! transport for node-backed wallets on native hosts.

use std::cell::Cell;

use async_trait::async_trait;
use marketlink_protocol::{RpcRequest, RpcResponse, parse_quantity};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;
use url::Url;

use crate::error::{ProviderError, Result};
use crate::network::ChainIdentifier;
use crate::provider::ChainProvider;

/// JSON-RPC client bound to one node URL.
#[derive(Debug)]
pub struct HttpRpcProvider {
	client: reqwest::Client,
	url: Url,
	next_id: Cell<u64>,
}

impl HttpRpcProvider {
	pub fn new(url: &str) -> Result<Self> {
		Self::with_client(reqwest::Client::new(), url)
	}

	pub fn with_client(client: reqwest::Client, url: &str) -> Result<Self> {
		let url = Url::parse(url).map_err(|e| ProviderError::Transport(format!("invalid rpc url {url:?}: {e}")))?;
		Ok(Self {
			client,
			url,
			next_id: Cell::new(1),
		})
	}

	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Performs one JSON-RPC call and decodes its result.
	pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
		let id = self.next_id.get();
		self.next_id.set(id.wrapping_add(1));

		trace!(target = "marketlink.rpc", id, method, "rpc request");
		let response = self
			.client
			.post(self.url.clone())
			.json(&RpcRequest::new(id, method, params))
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(ProviderError::Transport(format!("{method}: node answered {status}")));
		}

		let envelope: RpcResponse = response.json().await?;
		if let Some(error) = envelope.error {
			return Err(error.into());
		}
		let result = envelope.result.unwrap_or(Value::Null);
		serde_json::from_value(result).map_err(|e| ProviderError::InvalidResponse(format!("{method}: {e}")))
	}

	/// `eth_accounts`.
	pub async fn accounts(&self) -> Result<Vec<String>> {
		self.request("eth_accounts", Vec::new()).await
	}

	/// `eth_requestAccounts`, falling back to `eth_accounts` on nodes that do
	/// not implement the EIP-1102 method.
	pub async fn request_accounts(&self) -> Result<Vec<String>> {
		match self.request("eth_requestAccounts", Vec::new()).await {
			Err(ProviderError::Rpc { code: -32601, .. }) => self.accounts().await,
			other => other,
		}
	}
}

#[async_trait(?Send)]
impl ChainProvider for HttpRpcProvider {
	async fn chain_id(&self) -> Result<ChainIdentifier> {
		let raw: String = self.request("eth_chainId", Vec::new()).await?;
		let id = parse_quantity(&raw)?;
		u64::try_from(id)
			.map(ChainIdentifier::Id)
			.map_err(|_| ProviderError::InvalidResponse(format!("chain id {raw} out of range")))
	}

	async fn balance(&self, address: &str) -> Result<u128> {
		let raw: String = self
			.request("eth_getBalance", vec![Value::from(address), Value::from("latest")])
			.await?;
		Ok(parse_quantity(&raw)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_invalid_urls() {
		assert!(matches!(HttpRpcProvider::new("::"), Err(ProviderError::Transport(_))));
	}

	#[test]
	fn keeps_configured_url() {
		let provider = HttpRpcProvider::new("http://127.0.0.1:8545").unwrap();
		assert_eq!(provider.url().as_str(), "http://127.0.0.1:8545/");
	}
}

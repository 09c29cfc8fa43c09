//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::network::NetworkTag;

/// Registry base URL used when none is configured.
pub const DEFAULT_REGISTRY_URL: &str = "http://127.0.0.1:3000/api";

/// Tunables for the establishment pipeline.
///
/// Deserializes from camelCase JSON with every field optional:
///
/// ```json
/// { "registryUrl": "https://market.example/api", "callTimeoutMs": 8000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
	/// Base URL of the address registry; `/addresses` is appended.
	pub registry_url: String,
	/// Network assumed when no wallet is connected.
	pub fallback_network: NetworkTag,
	/// Upper bound for each provider and registry call. `None` waits forever.
	pub call_timeout_ms: Option<u64>,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			registry_url: DEFAULT_REGISTRY_URL.to_string(),
			fallback_network: NetworkTag::Mumbai,
			call_timeout_ms: None,
		}
	}
}

impl SessionConfig {
	pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
		self.registry_url = url.into();
		self
	}

	pub fn with_fallback_network(mut self, network: NetworkTag) -> Self {
		self.fallback_network = network;
		self
	}

	pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.call_timeout_ms = timeout.map(whole_millis);
		self
	}

	pub fn call_timeout(&self) -> Option<Duration> {
		self.call_timeout_ms.map(Duration::from_millis)
	}
}

/// Milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn whole_millis(duration: Duration) -> u64 {
	u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

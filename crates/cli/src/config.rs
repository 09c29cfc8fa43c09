//! CLI configuration: optional JSON file, then command-line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use marketlink::{NetworkTag, SessionConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// JSON-RPC endpoint of a local development node.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Everything a command needs to build a session.
///
/// ```json
/// {
///   "registryUrl": "http://127.0.0.1:3000/api",
///   "fallbackNetwork": "MUMBAI",
///   "rpcUrl": "https://rpc-mumbai.maticvigil.com",
///   "walletRpcUrl": "http://127.0.0.1:8545"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CliConfig {
	#[serde(flatten)]
	pub session: SessionConfig,
	/// Read-only node used when no wallet is connected.
	pub rpc_url: String,
	/// Node whose unlocked accounts act as the wallet. Absent means no wallet.
	pub wallet_rpc_url: Option<String>,
	/// Read address records from `{dir}/{TAG}.json` instead of the registry.
	pub addresses_dir: Option<PathBuf>,
}

impl Default for CliConfig {
	fn default() -> Self {
		Self {
			session: SessionConfig::default(),
			rpc_url: DEFAULT_RPC_URL.to_string(),
			wallet_rpc_url: None,
			addresses_dir: None,
		}
	}
}

impl CliConfig {
	/// Reads a config file.
	pub async fn load(path: &Path) -> Result<Self> {
		let raw = tokio::fs::read_to_string(path).await.map_err(|e| CliError::Config {
			path: path.to_path_buf(),
			message: e.to_string(),
		})?;
		serde_json::from_str(&raw).map_err(|e| CliError::Config {
			path: path.to_path_buf(),
			message: e.to_string(),
		})
	}

	/// Builds the effective config for `cli`: file (if any), then flags.
	pub async fn resolve(cli: &Cli) -> Result<Self> {
		let base = match &cli.config {
			Some(path) => {
				debug!(target = "marketlink.cli", path = %path.display(), "loading config file");
				Self::load(path).await?
			}
			None => Self::default(),
		};
		base.with_overrides(cli)
	}

	/// Applies command-line flags on top of `self`.
	pub fn with_overrides(mut self, cli: &Cli) -> Result<Self> {
		if let Some(url) = &cli.registry_url {
			self.session.registry_url = url.clone();
		}
		if let Some(network) = &cli.fallback_network {
			let tag: NetworkTag = network.parse().map_err(|_| CliError::InvalidInput(format!("unknown network {network:?}")))?;
			if !tag.is_supported() {
				return Err(CliError::InvalidInput(format!("{tag} cannot be the fallback network")));
			}
			self.session.fallback_network = tag;
		}
		if let Some(ms) = cli.timeout_ms {
			self.session = self.session.with_call_timeout(Some(Duration::from_millis(ms)));
		}
		if let Some(url) = &cli.rpc_url {
			self.rpc_url = url.clone();
		}
		if let Some(url) = &cli.wallet_rpc_url {
			self.wallet_rpc_url = Some(url.clone());
		}
		if cli.no_wallet {
			self.wallet_rpc_url = None;
		}
		if let Some(dir) = &cli.addresses_dir {
			self.addresses_dir = Some(dir.clone());
		}
		Ok(self)
	}
}

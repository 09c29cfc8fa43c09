//! Wires CLI configuration into session collaborators.

use std::rc::Rc;

use marketlink::{AddressRegistry, Establisher, HttpAddressRegistry, HttpRpcProvider, StaticDiscovery, WalletDiscovery};
use tracing::info;

use crate::config::CliConfig;
use crate::error::Result;
use crate::registry_dir::FileAddressRegistry;
use crate::wallet::NodeWallet;

/// Collaborators for one CLI invocation.
pub struct Host {
	pub establisher: Establisher,
	/// Node wallet to poll for changes, when one is configured.
	pub wallet: Option<Rc<NodeWallet>>,
	/// Where address records come from, for display.
	pub registry_source: String,
}

/// Builds the address registry named by `config`.
pub fn registry(config: &CliConfig) -> Result<(Rc<dyn AddressRegistry>, String)> {
	match &config.addresses_dir {
		Some(dir) => Ok((Rc::new(FileAddressRegistry::new(dir)), dir.display().to_string())),
		None => {
			let registry = HttpAddressRegistry::new(&config.session.registry_url)?;
			Ok((Rc::new(registry), config.session.registry_url.clone()))
		}
	}
}

impl Host {
	pub fn build(config: &CliConfig) -> Result<Self> {
		let (registry, registry_source) = registry(config)?;
		let fallback = Rc::new(HttpRpcProvider::new(&config.rpc_url)?);

		let wallet = match &config.wallet_rpc_url {
			Some(url) => Some(Rc::new(NodeWallet::new(url)?)),
			None => None,
		};
		let discovery: Rc<dyn WalletDiscovery> = match &wallet {
			Some(wallet) => Rc::new(StaticDiscovery::found(wallet.clone())),
			None => Rc::new(StaticDiscovery::absent()),
		};

		info!(
			target = "marketlink.cli",
			registry = %registry_source,
			rpc = %config.rpc_url,
			wallet = config.wallet_rpc_url.as_deref().unwrap_or("none"),
			"session collaborators ready"
		);

		Ok(Self {
			establisher: Establisher::new(&config.session, discovery, registry, fallback),
			wallet,
			registry_source,
		})
	}
}

use marketlink::{ChainIdentifier, NetworkTag, resolve};
use tracing::info;

use crate::commands::emit_success;
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::host;
use crate::output::{AddressesData, OutputFormat};

pub async fn execute(network: &str, config: &CliConfig, format: OutputFormat) -> Result<()> {
	let tag = parse_network(network)?;
	let (registry, source) = host::registry(config)?;

	info!(target = "marketlink.cli", network = %tag, %source, "addresses");
	let record = registry.fetch_addresses(tag).await?;
	emit_success("addresses", AddressesData { source, record }, format);
	Ok(())
}

/// Accepts a tag (`MUMBAI`) or anything [`resolve`] understands (`80001`, `hardhat`).
fn parse_network(raw: &str) -> Result<NetworkTag> {
	let tag = raw
		.parse::<NetworkTag>()
		.unwrap_or_else(|_| resolve(&ChainIdentifier::parse(raw)));
	if !tag.is_supported() {
		return Err(CliError::InvalidInput(format!("{raw:?} is not a supported network")));
	}
	Ok(tag)
}

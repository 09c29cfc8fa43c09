use marketlink::{ChainIdentifier, resolve};

use crate::commands::emit_success;
use crate::error::Result;
use crate::output::{OutputFormat, ResolveData};

pub fn execute(chain: &str, format: OutputFormat) -> Result<()> {
	emit_success("resolve", resolve_data(chain), format);
	Ok(())
}

pub(crate) fn resolve_data(chain: &str) -> ResolveData {
	let identifier = ChainIdentifier::parse(chain);
	let network = resolve(&identifier);
	ResolveData {
		chain: identifier.to_string(),
		network,
		supported: network.is_supported(),
	}
}

#[cfg(test)]
mod tests {
	use marketlink::NetworkTag;

	use super::*;

	#[test]
	fn hex_and_names_resolve() {
		let data = resolve_data("0x13881");
		assert_eq!(data.chain, "80001");
		assert_eq!(data.network, NetworkTag::Mumbai);
		assert!(data.supported);

		assert_eq!(resolve_data("Hardhat").network, NetworkTag::Localhost);
	}

	#[test]
	fn mainnet_is_unsupported() {
		let data = resolve_data("1");
		assert_eq!(data.network, NetworkTag::Unsupported);
		assert!(!data.supported);
	}
}

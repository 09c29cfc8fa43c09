use marketlink::Establishment;
use tracing::info;

use crate::commands::emit_success;
use crate::config::CliConfig;
use crate::error::Result;
use crate::host::Host;
use crate::output::{OutputFormat, SessionData};

pub async fn execute(config: &CliConfig, format: OutputFormat) -> Result<()> {
	let host = Host::build(config)?;
	info!(target = "marketlink.cli", registry = %host.registry_source, "establish");

	let outcome = host.establisher.establish().await;
	emit_success("establish", session_data(outcome), format);
	Ok(())
}

/// Renders a finished cycle the way the session store would publish it.
pub(crate) fn session_data(outcome: Establishment) -> SessionData {
	let mut session = outcome.session;
	session.is_ready = true;
	SessionData {
		state: outcome.terminal.state(),
		path: outcome.path,
		session,
		fallback_reason: outcome.fallback_reason.map(|reason| reason.to_string()),
		error: outcome.terminal.error().map(ToString::to_string),
	}
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use marketlink::testing::{MockProvider, MockRegistry};
	use marketlink::{AddressRecord, EstablishState, Establisher, NetworkTag, SessionConfig, StaticDiscovery};

	use super::*;

	#[tokio::test]
	async fn fallback_cycle_renders_reason_and_bindings() {
		let registry = Rc::new(MockRegistry::new());
		registry.set(NetworkTag::Mumbai, Ok(AddressRecord::new(NetworkTag::Mumbai, "0xAA", "0xBB")));
		let establisher = Establisher::new(
			&SessionConfig::default(),
			Rc::new(StaticDiscovery::absent()),
			registry,
			Rc::new(MockProvider::new(80_001)),
		);

		let data = session_data(establisher.establish().await);
		assert_eq!(data.state, EstablishState::Ready);
		assert!(data.session.is_ready);
		assert_eq!(data.fallback_reason.as_deref(), Some("no wallet connector present"));
		assert!(data.error.is_none());

		let json = serde_json::to_value(&data).unwrap();
		assert_eq!(json["session"]["marketplace"]["address"], "0xAA");
		assert_eq!(json["session"]["hasWalletConnector"], false);
	}
}

use std::future;
use std::time::Duration;

use marketlink::{EstablishState, NetworkTag, Session, SessionController};
use tracing::{info, warn};

use crate::commands::emit_success;
use crate::config::CliConfig;
use crate::error::Result;
use crate::host::Host;
use crate::output::{OutputFormat, SessionData};

const MIN_POLL: Duration = Duration::from_millis(100);

pub async fn execute(config: &CliConfig, poll_ms: u64, format: OutputFormat) -> Result<()> {
	let host = Host::build(config)?;
	let wallet = host.wallet.clone();
	let (controller, handle) = SessionController::new(host.establisher);
	let mut updates = handle.reader();
	let interval = Duration::from_millis(poll_ms).max(MIN_POLL);

	let poll_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
	info!(target = "marketlink.cli", registry = %host.registry_source, poll_ms, "watching session");

	let printer = async {
		while let Ok(session) = updates.changed().await {
			if session.is_ready {
				emit_success("watch", update_data(session), format);
			}
		}
	};
	let poller = async {
		match &wallet {
			Some(wallet) => wallet.watch(interval).await,
			None => future::pending::<()>().await,
		}
	};
	let session = async {
		tokio::select! {
			_ = printer => {}
			_ = poller => {}
			signal = tokio::signal::ctrl_c() => match signal {
				Ok(()) => info!(target = "marketlink.cli", "interrupted; tearing down session"),
				Err(err) => warn!(target = "marketlink.cli", error = %err, "failed to listen for ctrl-c"),
			},
		}
		handle.teardown();
	};

	tokio::join!(controller.run(), session);
	Ok(())
}

/// Publication snapshot rendered without the cycle that produced it.
fn update_data(session: Session) -> SessionData {
	let state = if session.has_contracts() {
		EstablishState::Ready
	} else if session.network == Some(NetworkTag::Unsupported) {
		EstablishState::Unsupported
	} else {
		EstablishState::Error
	};
	SessionData {
		state,
		path: Vec::new(),
		session,
		fallback_reason: None,
		error: None,
	}
}

//! Connection establishment state machine.
//!
//! ```text
//! Uninitialized -> Discovering -> ConnectedInteractive -> Resolving -> Ready
//!                             \-> ConnectedFallback   -/          \-> Unsupported
//!                          (any step) -> Error
//! ```
//!
//! A cycle never fails outward. Every path ends in a terminal state carrying a
//! fully-formed [`Session`]; the cause of a failure is logged and kept on the
//! [`Establishment`] for callers that want it.

use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{SessionConfig, whole_millis};
use crate::contract::ContractSessionBuilder;
use crate::error::SessionError;
use crate::network::{NetworkTag, resolve};
use crate::provider::{ChainAccess, ChainProvider, Signer, WalletConnector, WalletDiscovery};
use crate::registry::AddressRegistry;
use crate::session::Session;
use crate::units::format_ether;

/// States visited by an establishment cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EstablishState {
	Uninitialized,
	Discovering,
	ConnectedInteractive,
	ConnectedFallback,
	Resolving,
	Ready,
	Unsupported,
	Error,
}

impl EstablishState {
	pub fn is_terminal(self) -> bool {
		matches!(self, EstablishState::Ready | EstablishState::Unsupported | EstablishState::Error)
	}
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
	/// Both contracts bound.
	Ready,
	/// The connected chain is not a supported deployment target.
	Unsupported,
	/// A step failed; the session degrades like `Unsupported`.
	Error(SessionError),
}

impl Terminal {
	pub fn state(&self) -> EstablishState {
		match self {
			Terminal::Ready => EstablishState::Ready,
			Terminal::Unsupported => EstablishState::Unsupported,
			Terminal::Error(_) => EstablishState::Error,
		}
	}

	pub fn error(&self) -> Option<&SessionError> {
		match self {
			Terminal::Error(err) => Some(err),
			_ => None,
		}
	}
}

/// A connected wallet retained for event-driven re-runs.
#[derive(Clone)]
pub struct WalletLink {
	pub connector: Rc<dyn WalletConnector>,
	pub signer: Rc<dyn Signer>,
}

impl WalletLink {
	/// Whether both links wrap the same connector.
	pub fn same_connector(&self, other: &WalletLink) -> bool {
		Rc::ptr_eq(&self.connector, &other.connector)
	}
}

impl fmt::Debug for WalletLink {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("WalletLink")
	}
}

/// Outcome of one establishment cycle.
#[derive(Debug, Clone)]
pub struct Establishment {
	/// Session to publish (with `is_ready` still false; the store sets it).
	pub session: Session,
	/// Terminal state and, for `Error`, the cause.
	pub terminal: Terminal,
	/// Every state visited, in order, ending with the terminal state.
	pub path: Vec<EstablishState>,
	/// Wallet link used, for interactive cycles.
	pub link: Option<WalletLink>,
	/// Why the fallback path was taken, when it was.
	pub fallback_reason: Option<SessionError>,
}

impl Establishment {
	pub fn state(&self) -> EstablishState {
		self.terminal.state()
	}
}

/// Running record of a cycle under construction.
struct Cycle {
	path: Vec<EstablishState>,
	fallback_reason: Option<SessionError>,
}

impl Cycle {
	fn new() -> Self {
		Self {
			path: vec![EstablishState::Uninitialized],
			fallback_reason: None,
		}
	}

	fn enter(&mut self, state: EstablishState) {
		debug!(target = "marketlink.establish", ?state, "enter");
		self.path.push(state);
	}

	fn finish(mut self, session: Session, terminal: Terminal, link: Option<WalletLink>) -> Establishment {
		self.path.push(terminal.state());
		match &terminal {
			Terminal::Error(err) => warn!(
				target = "marketlink.establish",
				network = session.network_label(),
				error = %err,
				"establishment failed; publishing empty contract session"
			),
			_ => info!(
				target = "marketlink.establish",
				network = session.network_label(),
				account = %session.account,
				state = ?terminal.state(),
				"establishment finished"
			),
		}
		Establishment {
			session,
			terminal,
			path: self.path,
			link,
			fallback_reason: self.fallback_reason,
		}
	}
}

/// Runs establishment cycles against a fixed set of collaborators.
pub struct Establisher {
	discovery: Rc<dyn WalletDiscovery>,
	registry: Rc<dyn AddressRegistry>,
	fallback: Rc<dyn ChainProvider>,
	builder: ContractSessionBuilder,
	fallback_network: NetworkTag,
	call_timeout: Option<Duration>,
}

impl Establisher {
	pub fn new(
		config: &SessionConfig,
		discovery: Rc<dyn WalletDiscovery>,
		registry: Rc<dyn AddressRegistry>,
		fallback: Rc<dyn ChainProvider>,
	) -> Self {
		Self {
			discovery,
			registry,
			fallback,
			builder: ContractSessionBuilder::default(),
			fallback_network: config.fallback_network,
			call_timeout: config.call_timeout(),
		}
	}

	/// Replaces the contract builder (custom ABIs).
	pub fn with_builder(mut self, builder: ContractSessionBuilder) -> Self {
		self.builder = builder;
		self
	}

	/// Full cycle: discover, connect or fall back, resolve, bind.
	pub async fn establish(&self) -> Establishment {
		let mut cycle = Cycle::new();
		cycle.enter(EstablishState::Discovering);

		let Some(connector) = self.discovery.discover() else {
			debug!(target = "marketlink.establish", "no injected wallet; using read-only provider");
			cycle.fallback_reason = Some(SessionError::ConnectorUnavailable);
			return self.fallback(cycle).await;
		};

		match connector.connect().await {
			Ok(signer) => {
				let link = WalletLink { connector, signer };
				self.interactive(cycle, link).await
			}
			Err(err) => {
				warn!(
					target = "marketlink.establish",
					error = %err,
					"wallet connection failed; falling back to read-only provider"
				);
				cycle.fallback_reason = Some(SessionError::from(err));
				self.fallback(cycle).await
			}
		}
	}

	/// Steps 2–5 using an already-connected wallet. Never prompts.
	pub async fn reestablish(&self, link: &WalletLink) -> Establishment {
		self.interactive(Cycle::new(), link.clone()).await
	}

	async fn fallback(&self, mut cycle: Cycle) -> Establishment {
		cycle.enter(EstablishState::ConnectedFallback);
		let session = Session {
			network: Some(self.fallback_network),
			has_wallet_connector: false,
			..Session::default()
		};
		let access = ChainAccess::Provider(Rc::clone(&self.fallback));
		self.resolve_contracts(cycle, session, access, None).await
	}

	async fn interactive(&self, mut cycle: Cycle, link: WalletLink) -> Establishment {
		cycle.enter(EstablishState::ConnectedInteractive);
		let mut session = Session {
			has_wallet_connector: true,
			..Session::default()
		};

		let account = match self.timed("getAddress", link.signer.address()).await {
			Ok(account) => account,
			Err(err) => {
				session.network = Some(NetworkTag::Unsupported);
				return cycle.finish(session, Terminal::Error(err), Some(link));
			}
		};
		session.account = account;

		let chain = match self.timed("getNetwork", link.signer.chain_id()).await {
			Ok(chain) => chain,
			Err(err) => {
				session.network = Some(NetworkTag::Unsupported);
				return cycle.finish(session, Terminal::Error(err), Some(link));
			}
		};
		let network = resolve(&chain);
		debug!(target = "marketlink.establish", %chain, %network, "resolved wallet chain");
		session.network = Some(network);

		match self.timed("getBalance", link.signer.balance(&session.account)).await {
			Ok(wei) => session.balance = format_ether(wei),
			Err(err) => warn!(
				target = "marketlink.establish",
				account = %session.account,
				error = %err,
				"balance unavailable; reporting zero"
			),
		}

		let access = ChainAccess::Signer(Rc::clone(&link.signer));
		self.resolve_contracts(cycle, session, access, Some(link)).await
	}

	async fn resolve_contracts(&self, mut cycle: Cycle, mut session: Session, access: ChainAccess, link: Option<WalletLink>) -> Establishment {
		cycle.enter(EstablishState::Resolving);

		let network = session.network.unwrap_or(NetworkTag::Unsupported);
		if !network.is_supported() {
			debug!(target = "marketlink.establish", "network unsupported; skipping registry lookup");
			session.set_contracts(None);
			return cycle.finish(session, Terminal::Unsupported, link);
		}

		let record = match self.timed_registry(network).await {
			Ok(record) => record,
			Err(err) => {
				session.set_contracts(None);
				return cycle.finish(session, Terminal::Error(err), link);
			}
		};

		match self.builder.build(&access, &record) {
			Some(contracts) => {
				session.set_contracts(Some(contracts));
				cycle.finish(session, Terminal::Ready, link)
			}
			None => {
				session.set_contracts(None);
				let err = SessionError::IncompleteAddressRecord {
					network,
					field: if record.marketplace_address.trim().is_empty() {
						"marketplaceAddress"
					} else {
						"nftAddress"
					},
				};
				cycle.finish(session, Terminal::Error(err), link)
			}
		}
	}

	async fn timed_registry(&self, network: NetworkTag) -> Result<crate::registry::AddressRecord, SessionError> {
		let fetch = async { self.registry.fetch_addresses(network).await.map_err(SessionError::from) };
		bounded(self.call_timeout, "registry fetch", fetch).await
	}

	async fn timed<T>(&self, operation: &'static str, call: impl Future<Output = crate::error::Result<T>>) -> Result<T, SessionError> {
		bounded(self.call_timeout, operation, async { call.await.map_err(SessionError::from) }).await
	}
}

async fn bounded<T>(
	limit: Option<Duration>,
	operation: &'static str,
	call: impl Future<Output = Result<T, SessionError>>,
) -> Result<T, SessionError> {
	match limit {
		None => call.await,
		Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
			Err(SessionError::Timeout {
				operation,
				ms: whole_millis(limit),
			})
		}),
	}
}

//! Collaborator capabilities: wallet connectors, signers and chain providers.
//!
//! The session manager never talks to a wallet or node directly. Hosts hand it
//! implementations of these traits (an injected EIP-1193 wallet in the
//! browser, a JSON-RPC node natively, in-memory doubles in tests).
//!
//! Everything here is `?Send`: the session runs on a single logical thread and
//! browser-side implementations hold JS handles that cannot cross threads.

use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
pub use marketlink_protocol::WalletEventKind;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::network::ChainIdentifier;

/// Read-only chain access.
#[async_trait(?Send)]
pub trait ChainProvider {
	/// Chain the provider is currently attached to.
	async fn chain_id(&self) -> Result<ChainIdentifier>;

	/// Balance of `address` in wei.
	async fn balance(&self, address: &str) -> Result<u128>;
}

/// Account-bound chain access.
///
/// A signer answers "who am I" on every call, so an account switch inside the
/// wallet is visible without reconnecting.
#[async_trait(?Send)]
pub trait Signer: ChainProvider {
	/// Address of the currently selected account.
	async fn address(&self) -> Result<String>;
}

/// Identifier returned by [`WalletConnector::subscribe`].
pub type SubscriptionId = u64;

/// An interactive wallet that can be connected and observed.
#[async_trait(?Send)]
pub trait WalletConnector {
	/// Requests account access. May prompt the user.
	async fn connect(&self) -> Result<Rc<dyn Signer>>;

	/// Registers `sink` for events of `kind`.
	fn subscribe(&self, kind: WalletEventKind, sink: WalletEventSink) -> SubscriptionId;

	/// Removes a registration made by [`subscribe`](Self::subscribe).
	fn unsubscribe(&self, id: SubscriptionId);
}

/// Probes the host environment for an injected wallet.
pub trait WalletDiscovery {
	fn discover(&self) -> Option<Rc<dyn WalletConnector>>;
}

/// Discovery with a fixed answer.
#[derive(Clone, Default)]
pub struct StaticDiscovery {
	connector: Option<Rc<dyn WalletConnector>>,
}

impl StaticDiscovery {
	/// Discovery that always finds `connector`.
	pub fn found(connector: Rc<dyn WalletConnector>) -> Self {
		Self {
			connector: Some(connector),
		}
	}

	/// Discovery that never finds a wallet.
	pub fn absent() -> Self {
		Self { connector: None }
	}
}

impl WalletDiscovery for StaticDiscovery {
	fn discover(&self) -> Option<Rc<dyn WalletConnector>> {
		self.connector.clone()
	}
}

/// An unsolicited wallet notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
	AccountsChanged(Vec<String>),
	ChainChanged(String),
}

impl WalletEvent {
	pub fn kind(&self) -> WalletEventKind {
		match self {
			WalletEvent::AccountsChanged(_) => WalletEventKind::AccountsChanged,
			WalletEvent::ChainChanged(_) => WalletEventKind::ChainChanged,
		}
	}
}

/// Messages accepted by the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Trigger {
	/// A wallet event, tagged with the subscription epoch it arrived through.
	Wallet { epoch: u64, event: WalletEvent },
	Refresh,
	Teardown,
}

/// Write end handed to connectors; delivers events into the controller.
///
/// Holds a weak sender: a connector keeping its sinks does not keep the
/// controller alive once every session handle is gone.
#[derive(Clone)]
pub struct WalletEventSink {
	tx: mpsc::WeakUnboundedSender<Trigger>,
	epoch: u64,
}

impl WalletEventSink {
	pub(crate) fn new(tx: mpsc::WeakUnboundedSender<Trigger>, epoch: u64) -> Self {
		Self { tx, epoch }
	}

	/// Delivers `event`. Returns `false` once the controller has stopped.
	pub fn emit(&self, event: WalletEvent) -> bool {
		self.tx
			.upgrade()
			.is_some_and(|tx| tx.send(Trigger::Wallet { epoch: self.epoch, event }).is_ok())
	}

	/// Whether the receiving controller is gone.
	pub fn is_closed(&self) -> bool {
		self.tx.upgrade().is_none_or(|tx| tx.is_closed())
	}
}

impl fmt::Debug for WalletEventSink {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WalletEventSink")
			.field("epoch", &self.epoch)
			.field("closed", &self.is_closed())
			.finish()
	}
}

/// The signer-or-provider a contract binding is attached to.
#[derive(Clone)]
pub enum ChainAccess {
	Signer(Rc<dyn Signer>),
	Provider(Rc<dyn ChainProvider>),
}

impl ChainAccess {
	pub fn is_signer(&self) -> bool {
		matches!(self, ChainAccess::Signer(_))
	}

	/// Whether two handles refer to the same underlying signer/provider.
	pub fn same_as(&self, other: &ChainAccess) -> bool {
		match (self, other) {
			(ChainAccess::Signer(a), ChainAccess::Signer(b)) => Rc::ptr_eq(a, b),
			(ChainAccess::Provider(a), ChainAccess::Provider(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl fmt::Debug for ChainAccess {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChainAccess::Signer(_) => f.write_str("ChainAccess::Signer"),
			ChainAccess::Provider(_) => f.write_str("ChainAccess::Provider"),
		}
	}
}

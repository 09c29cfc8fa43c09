//! Wallet connector backed by a development node's unlocked accounts.
//!
//! Nodes do not push `accountsChanged`/`chainChanged`, so the wallet polls
//! `eth_accounts` and `eth_chainId` and emits an event whenever either moves.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use marketlink::{
	ChainIdentifier, ChainProvider, HttpRpcProvider, ProviderError, Result, Signer, SubscriptionId, WalletConnector, WalletEvent,
	WalletEventKind, WalletEventSink,
};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Observed {
	accounts: Vec<String>,
	chain: String,
}

pub struct NodeWallet {
	provider: Rc<HttpRpcProvider>,
	subscriptions: RefCell<Vec<(SubscriptionId, WalletEventKind, WalletEventSink)>>,
	next_id: Cell<SubscriptionId>,
	observed: RefCell<Option<Observed>>,
}

impl NodeWallet {
	pub fn new(url: &str) -> Result<Self> {
		Ok(Self {
			provider: Rc::new(HttpRpcProvider::new(url)?),
			subscriptions: RefCell::new(Vec::new()),
			next_id: Cell::new(1),
			observed: RefCell::new(None),
		})
	}

	pub fn url(&self) -> &str {
		self.provider.url().as_str()
	}

	pub fn subscriber_count(&self) -> usize {
		self.subscriptions.borrow().len()
	}

	async fn observe(&self) -> Result<Observed> {
		let accounts = self.provider.accounts().await?;
		let chain: String = self.provider.request("eth_chainId", Vec::new()).await?;
		Ok(Observed { accounts, chain })
	}

	/// Compares the node against the last observation and emits the differences.
	///
	/// The first observation only records a baseline.
	pub async fn poll_changes(&self) -> Result<Vec<WalletEvent>> {
		let now = self.observe().await?;
		let previous = self.observed.replace(Some(now.clone()));

		let mut events = Vec::new();
		if let Some(previous) = previous {
			if previous.accounts != now.accounts {
				events.push(WalletEvent::AccountsChanged(now.accounts.clone()));
			}
			if previous.chain != now.chain {
				events.push(WalletEvent::ChainChanged(now.chain.clone()));
			}
		}
		for event in &events {
			self.emit(event);
		}
		Ok(events)
	}

	fn emit(&self, event: &WalletEvent) {
		let kind = event.kind();
		let sinks: Vec<WalletEventSink> = self
			.subscriptions
			.borrow()
			.iter()
			.filter(|(_, k, _)| *k == kind)
			.map(|(_, _, sink)| sink.clone())
			.collect();
		debug!(target = "marketlink.wallet", ?event, subscribers = sinks.len(), "node wallet changed");
		for sink in sinks {
			sink.emit(event.clone());
		}
	}

	/// Polls forever at `interval`. Poll failures are logged and retried on the next tick.
	pub async fn watch(&self, interval: Duration) {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		loop {
			ticker.tick().await;
			if let Err(err) = self.poll_changes().await {
				warn!(target = "marketlink.wallet", url = self.url(), error = %err, "wallet poll failed");
			}
		}
	}
}

#[async_trait(?Send)]
impl WalletConnector for NodeWallet {
	async fn connect(&self) -> Result<Rc<dyn Signer>> {
		let accounts = self.provider.request_accounts().await?;
		if accounts.is_empty() {
			return Err(ProviderError::NoAccounts);
		}
		if self.observed.borrow().is_none() {
			let baseline = self.observe().await?;
			*self.observed.borrow_mut() = Some(baseline);
		}
		Ok(Rc::new(NodeSigner {
			provider: Rc::clone(&self.provider),
		}))
	}

	fn subscribe(&self, kind: WalletEventKind, sink: WalletEventSink) -> SubscriptionId {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		self.subscriptions.borrow_mut().push((id, kind, sink));
		id
	}

	fn unsubscribe(&self, id: SubscriptionId) {
		self.subscriptions.borrow_mut().retain(|(sub, _, _)| *sub != id);
	}
}

/// Signer for whichever account the node lists first.
struct NodeSigner {
	provider: Rc<HttpRpcProvider>,
}

#[async_trait(?Send)]
impl ChainProvider for NodeSigner {
	async fn chain_id(&self) -> Result<ChainIdentifier> {
		self.provider.chain_id().await
	}

	async fn balance(&self, address: &str) -> Result<u128> {
		self.provider.balance(address).await
	}
}

#[async_trait(?Send)]
impl Signer for NodeSigner {
	async fn address(&self) -> Result<String> {
		self.provider.accounts().await?.into_iter().next().ok_or(ProviderError::NoAccounts)
	}
}

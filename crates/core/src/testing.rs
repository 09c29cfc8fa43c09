//! In-memory collaborators for tests and offline demos.
//!
//! Every double is single-threaded and mutable through `&self`, so a test can
//! keep an `Rc` to it, hand a clone to the session, and change its answers
//! between cycles.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};

use crate::error::{ProviderError, RegistryError, Result};
use crate::network::{ChainIdentifier, NetworkTag};
use crate::provider::{
	ChainProvider, Signer, SubscriptionId, WalletConnector, WalletDiscovery, WalletEvent, WalletEventKind, WalletEventSink,
};
use crate::registry::{AddressRecord, AddressRegistry};
use crate::units::WEI_PER_ETHER;

/// Read-only provider pinned to a chain.
#[derive(Debug)]
pub struct MockProvider {
	chain: Cell<u64>,
	balance: Cell<u128>,
}

impl MockProvider {
	pub fn new(chain_id: u64) -> Self {
		Self {
			chain: Cell::new(chain_id),
			balance: Cell::new(0),
		}
	}

	pub fn set_chain(&self, chain_id: u64) {
		self.chain.set(chain_id);
	}
}

#[async_trait(?Send)]
impl ChainProvider for MockProvider {
	async fn chain_id(&self) -> Result<ChainIdentifier> {
		Ok(ChainIdentifier::Id(self.chain.get()))
	}

	async fn balance(&self, _address: &str) -> Result<u128> {
		Ok(self.balance.get())
	}
}

/// Signer with a switchable account and chain. Starts with 1.5 ether.
#[derive(Debug)]
pub struct MockSigner {
	account: RefCell<String>,
	chain: Cell<u64>,
	balance: Cell<u128>,
	address_failure: RefCell<Option<ProviderError>>,
	balance_failure: RefCell<Option<ProviderError>>,
}

impl MockSigner {
	pub fn new(account: &str, chain_id: u64) -> Self {
		Self {
			account: RefCell::new(account.to_string()),
			chain: Cell::new(chain_id),
			balance: Cell::new(WEI_PER_ETHER + WEI_PER_ETHER / 2),
			address_failure: RefCell::new(None),
			balance_failure: RefCell::new(None),
		}
	}

	pub fn set_account(&self, account: &str) {
		*self.account.borrow_mut() = account.to_string();
	}

	pub fn set_chain(&self, chain_id: u64) {
		self.chain.set(chain_id);
	}

	pub fn set_balance(&self, wei: u128) {
		self.balance.set(wei);
	}

	/// Makes every `address()` call fail with `err`.
	pub fn fail_address(&self, err: ProviderError) {
		*self.address_failure.borrow_mut() = Some(err);
	}

	/// Makes every `balance()` call fail with `err`.
	pub fn fail_balance(&self, err: ProviderError) {
		*self.balance_failure.borrow_mut() = Some(err);
	}
}

#[async_trait(?Send)]
impl ChainProvider for MockSigner {
	async fn chain_id(&self) -> Result<ChainIdentifier> {
		Ok(ChainIdentifier::Id(self.chain.get()))
	}

	async fn balance(&self, _address: &str) -> Result<u128> {
		match self.balance_failure.borrow().clone() {
			Some(err) => Err(err),
			None => Ok(self.balance.get()),
		}
	}
}

#[async_trait(?Send)]
impl Signer for MockSigner {
	async fn address(&self) -> Result<String> {
		match self.address_failure.borrow().clone() {
			Some(err) => Err(err),
			None => Ok(self.account.borrow().clone()),
		}
	}
}

/// Wallet connector that hands out one signer and records subscriptions.
pub struct MockConnector {
	signer: Rc<MockSigner>,
	rejection: RefCell<Option<String>>,
	connects: Cell<usize>,
	next_id: Cell<SubscriptionId>,
	subscriptions: RefCell<Vec<(SubscriptionId, WalletEventKind, WalletEventSink)>>,
}

impl MockConnector {
	pub fn new(signer: Rc<MockSigner>) -> Self {
		Self {
			signer,
			rejection: RefCell::new(None),
			connects: Cell::new(0),
			next_id: Cell::new(1),
			subscriptions: RefCell::new(Vec::new()),
		}
	}

	pub fn signer(&self) -> &Rc<MockSigner> {
		&self.signer
	}

	/// Rejects the next `connect()` the way a user dismissing the prompt would.
	pub fn reject_next(&self, message: &str) {
		*self.rejection.borrow_mut() = Some(message.to_string());
	}

	pub fn connect_calls(&self) -> usize {
		self.connects.get()
	}

	pub fn subscription_count(&self) -> usize {
		self.subscriptions.borrow().len()
	}

	pub fn is_subscribed(&self, kind: WalletEventKind) -> bool {
		self.subscriptions.borrow().iter().any(|(_, k, _)| *k == kind)
	}

	/// Delivers `event` to every matching subscriber; returns how many accepted it.
	pub fn emit(&self, event: WalletEvent) -> usize {
		let kind = event.kind();
		let sinks: Vec<WalletEventSink> = self
			.subscriptions
			.borrow()
			.iter()
			.filter(|(_, k, _)| *k == kind)
			.map(|(_, _, sink)| sink.clone())
			.collect();
		sinks.iter().filter(|sink| sink.emit(event.clone())).count()
	}
}

#[async_trait(?Send)]
impl WalletConnector for MockConnector {
	async fn connect(&self) -> Result<Rc<dyn Signer>> {
		self.connects.set(self.connects.get() + 1);
		if let Some(message) = self.rejection.borrow_mut().take() {
			return Err(ProviderError::Rejected { code: 4001, message });
		}
		Ok(self.signer.clone())
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

/// Discovery whose answer can change between cycles.
#[derive(Default)]
pub struct MockDiscovery {
	connector: RefCell<Option<Rc<dyn WalletConnector>>>,
}

impl MockDiscovery {
	/// Makes the next discovery find `connector`.
	pub fn install(&self, connector: Rc<dyn WalletConnector>) {
		*self.connector.borrow_mut() = Some(connector);
	}

	/// Makes the next discovery find nothing.
	pub fn clear(&self) {
		self.connector.borrow_mut().take();
	}
}

impl WalletDiscovery for MockDiscovery {
	fn discover(&self) -> Option<Rc<dyn WalletConnector>> {
		self.connector.borrow().clone()
	}
}

/// Holds one registry lookup until released or dropped.
pub struct RegistryGate(oneshot::Sender<()>);

impl RegistryGate {
	pub fn release(self) {
		let _ = self.0.send(());
	}
}

/// Registry answering from a per-network table.
///
/// Lookups consume queued gates in order, so a test can hold the first
/// lookup open while a later one completes. The answer is read after the
/// gate opens.
pub struct MockRegistry {
	records: RefCell<HashMap<NetworkTag, std::result::Result<AddressRecord, RegistryError>>>,
	gates: RefCell<VecDeque<oneshot::Receiver<()>>>,
	calls: watch::Sender<usize>,
	answered: watch::Sender<usize>,
	requested: RefCell<Vec<NetworkTag>>,
}

impl Default for MockRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl MockRegistry {
	pub fn new() -> Self {
		Self {
			records: RefCell::new(HashMap::new()),
			gates: RefCell::new(VecDeque::new()),
			calls: watch::channel(0).0,
			answered: watch::channel(0).0,
			requested: RefCell::new(Vec::new()),
		}
	}

	pub fn set(&self, network: NetworkTag, answer: std::result::Result<AddressRecord, RegistryError>) {
		self.records.borrow_mut().insert(network, answer);
	}

	/// Gates the next lookup that has not yet started.
	pub fn hold(&self) -> RegistryGate {
		let (tx, rx) = oneshot::channel();
		self.gates.borrow_mut().push_back(rx);
		RegistryGate(tx)
	}

	pub fn calls(&self) -> usize {
		*self.calls.borrow()
	}

	/// Networks looked up, in call order.
	pub fn requested(&self) -> Vec<NetworkTag> {
		self.requested.borrow().clone()
	}

	/// Waits until at least `n` lookups have started.
	pub async fn wait_for_calls(&self, n: usize) {
		let mut rx = self.calls.subscribe();
		let _ = rx.wait_for(|calls| *calls >= n).await;
	}

	/// Waits until at least `n` lookups have returned.
	pub async fn wait_for_answers(&self, n: usize) {
		let mut rx = self.answered.subscribe();
		let _ = rx.wait_for(|answered| *answered >= n).await;
	}
}

#[async_trait(?Send)]
impl AddressRegistry for MockRegistry {
	async fn fetch_addresses(&self, network: NetworkTag) -> std::result::Result<AddressRecord, RegistryError> {
		self.requested.borrow_mut().push(network);
		self.calls.send_modify(|calls| *calls += 1);

		let gate = self.gates.borrow_mut().pop_front();
		if let Some(gate) = gate {
			let _ = gate.await;
		}

		let answer = self
			.records
			.borrow()
			.get(&network)
			.cloned()
			.unwrap_or_else(|| Err(RegistryError::Unreachable(format!("no record for {network}"))));
		self.answered.send_modify(|answered| *answered += 1);
		answer
	}
}

//! Session controller: owns the store and the wallet subscriptions, and turns
//! triggers into sequenced establishment cycles.
//!
//! Every trigger (initial mount, manual refresh, wallet event) goes through
//! one channel into [`SessionController::run`]. Overlapping cycles are polled
//! side by side inside the run loop; the [`SessionStore`] decides which of
//! them may publish.

use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::watch::error::RecvError;
use tracing::{debug, info};

use crate::establish::{Establisher, Establishment, WalletLink};
use crate::provider::{SubscriptionId, Trigger, WalletEvent, WalletEventKind, WalletEventSink};
use crate::session::Session;
use crate::store::{CycleTicket, SessionReader, SessionStore};

type CycleFuture = LocalBoxFuture<'static, (CycleTicket, Establishment)>;

enum CycleKind {
	/// Discover, connect, resolve, bind.
	Full,
	/// Resolve and bind again through an already-connected wallet.
	Rerun(WalletLink),
}

/// Subscriptions held on the connector of the current wallet link.
struct Subscriptions {
	link: WalletLink,
	ids: Vec<SubscriptionId>,
}

/// Drives establishment cycles for one session.
pub struct SessionController {
	establisher: Rc<Establisher>,
	store: SessionStore,
	triggers: mpsc::UnboundedReceiver<Trigger>,
	sink_tx: mpsc::WeakUnboundedSender<Trigger>,
	subscriptions: Option<Subscriptions>,
	epoch: u64,
}

impl SessionController {
	/// Creates a controller and the handle UI code talks to.
	///
	/// Nothing happens until [`run`](Self::run) is polled.
	pub fn new(establisher: Establisher) -> (Self, SessionHandle) {
		let (tx, rx) = mpsc::unbounded_channel();
		let store = SessionStore::new();
		let handle = SessionHandle {
			tx: tx.clone(),
			reader: store.reader(),
		};
		let controller = Self {
			establisher: Rc::new(establisher),
			store,
			triggers: rx,
			sink_tx: tx.downgrade(),
			subscriptions: None,
			epoch: 0,
		};
		(controller, handle)
	}

	/// Runs the initial cycle, then serves triggers until teardown.
	///
	/// Returns once [`SessionHandle::teardown`] is called or every handle is
	/// dropped; sinks only hold weak senders and do not keep the loop alive.
	/// Wallet subscriptions are released on the way out and any cycle still in
	/// flight is dropped, even one that finished in the same poll.
	pub async fn run(mut self) {
		let mut cycles: FuturesUnordered<CycleFuture> = FuturesUnordered::new();
		cycles.push(self.accept(CycleKind::Full));

		loop {
			tokio::select! {
				biased;

				trigger = self.triggers.recv() => match trigger {
					Some(Trigger::Refresh) => {
						debug!(target = "marketlink.reactivity", "manual refresh requested");
						cycles.push(self.accept(CycleKind::Full));
					}
					Some(Trigger::Wallet { epoch, event }) => {
						if let Some(cycle) = self.on_wallet_event(epoch, event) {
							cycles.push(cycle);
						}
					}
					Some(Trigger::Teardown) | None => break,
				},
				Some((ticket, outcome)) = cycles.next(), if !cycles.is_empty() => {
					self.complete(ticket, outcome);
				}
			}
		}

		if !cycles.is_empty() {
			debug!(target = "marketlink.reactivity", in_flight = cycles.len(), "dropping in-flight cycles");
		}
		self.release();
		info!(target = "marketlink.reactivity", "session torn down");
	}

	fn accept(&self, kind: CycleKind) -> CycleFuture {
		let ticket = self.store.begin_cycle();
		let establisher = Rc::clone(&self.establisher);
		async move {
			let outcome = match kind {
				CycleKind::Full => establisher.establish().await,
				CycleKind::Rerun(link) => establisher.reestablish(&link).await,
			};
			(ticket, outcome)
		}
		.boxed_local()
	}

	fn on_wallet_event(&self, epoch: u64, event: WalletEvent) -> Option<CycleFuture> {
		if epoch != self.epoch {
			debug!(target = "marketlink.reactivity", kind = %event.kind(), "ignoring event from released subscription");
			return None;
		}
		let subscriptions = self.subscriptions.as_ref()?;
		debug!(target = "marketlink.reactivity", ?event, "wallet changed; re-establishing");
		Some(self.accept(CycleKind::Rerun(subscriptions.link.clone())))
	}

	fn complete(&mut self, ticket: CycleTicket, outcome: Establishment) {
		if !self.store.publish(ticket, outcome.session) {
			return;
		}
		self.adopt(outcome.link);
	}

	/// Points subscriptions at the connector of the cycle that just published.
	fn adopt(&mut self, link: Option<WalletLink>) {
		if let (Some(current), Some(next)) = (self.subscriptions.as_mut(), link.as_ref()) {
			if current.link.same_connector(next) {
				current.link = next.clone();
				return;
			}
		}
		self.release();
		if let Some(link) = link {
			self.subscribe(link);
		}
	}

	fn subscribe(&mut self, link: WalletLink) {
		if self.sink_tx.upgrade().is_none() {
			return;
		}
		self.epoch += 1;
		let ids = WalletEventKind::ALL
			.iter()
			.map(|kind| link.connector.subscribe(*kind, WalletEventSink::new(self.sink_tx.clone(), self.epoch)))
			.collect();
		debug!(target = "marketlink.reactivity", epoch = self.epoch, "subscribed to wallet events");
		self.subscriptions = Some(Subscriptions { link, ids });
	}

	fn release(&mut self) {
		if let Some(subscriptions) = self.subscriptions.take() {
			for id in subscriptions.ids {
				subscriptions.link.connector.unsubscribe(id);
			}
			self.epoch += 1;
			debug!(target = "marketlink.reactivity", "released wallet subscriptions");
		}
	}
}

/// Cloneable handle onto a running session.
#[derive(Clone)]
pub struct SessionHandle {
	tx: mpsc::UnboundedSender<Trigger>,
	reader: SessionReader,
}

impl SessionHandle {
	/// Clone of the currently published session.
	pub fn snapshot(&self) -> Session {
		self.reader.snapshot()
	}

	pub fn is_ready(&self) -> bool {
		self.reader.is_ready()
	}

	/// Waits for the next change (including `is_ready` flips).
	pub async fn changed(&mut self) -> Result<Session, RecvError> {
		self.reader.changed().await
	}

	/// Waits for a ready session.
	pub async fn wait_ready(&mut self) -> Result<Session, RecvError> {
		self.reader.wait_ready().await
	}

	/// Waits for a ready session matching `predicate`.
	pub async fn wait_for(&mut self, predicate: impl FnMut(&Session) -> bool) -> Result<Session, RecvError> {
		self.reader.wait_for(predicate).await
	}

	/// Independent reader for another consumer.
	pub fn reader(&self) -> SessionReader {
		self.reader.clone()
	}

	/// Requests a full establishment cycle. Returns `false` if the controller
	/// has stopped.
	pub fn establish(&self) -> bool {
		self.tx.send(Trigger::Refresh).is_ok()
	}

	/// Stops the controller and releases wallet subscriptions.
	pub fn teardown(&self) -> bool {
		self.tx.send(Trigger::Teardown).is_ok()
	}

	/// Whether the controller is still accepting triggers.
	pub fn is_running(&self) -> bool {
		!self.tx.is_closed()
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::config::SessionConfig;
	use crate::network::NetworkTag;
	use crate::error::RegistryError;
	use crate::protocol::AddressRecordPayload;
	use crate::registry::AddressRecord;
	use crate::testing::{MockConnector, MockDiscovery, MockProvider, MockRegistry, MockSigner};

	const ALICE: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
	const BOB: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";

	struct Fixture {
		discovery: Rc<MockDiscovery>,
		registry: Rc<MockRegistry>,
		signer: Rc<MockSigner>,
		connector: Rc<MockConnector>,
	}

	impl Fixture {
		fn new() -> Self {
			let registry = Rc::new(MockRegistry::new());
			registry.set(NetworkTag::Mumbai, Ok(AddressRecord::new(NetworkTag::Mumbai, "0xAA", "0xBB")));
			registry.set(NetworkTag::Localhost, Ok(AddressRecord::new(NetworkTag::Localhost, "0xCC", "0xDD")));
			let signer = Rc::new(MockSigner::new(ALICE, 80_001));
			let connector = Rc::new(MockConnector::new(signer.clone()));
			let discovery = Rc::new(MockDiscovery::default());
			discovery.install(connector.clone());
			Self {
				discovery,
				registry,
				signer,
				connector,
			}
		}

		fn controller(&self) -> (SessionController, SessionHandle) {
			let establisher = Establisher::new(
				&SessionConfig::default(),
				self.discovery.clone(),
				self.registry.clone(),
				Rc::new(MockProvider::new(80_001)),
			);
			SessionController::new(establisher)
		}
	}

	#[tokio::test]
	async fn initial_cycle_publishes_and_subscribes() {
		let fx = Fixture::new();
		let (controller, mut handle) = fx.controller();
		assert!(!handle.is_ready());

		let script = async {
			let session = handle.wait_ready().await.unwrap();
			assert_eq!(session.account, ALICE);
			assert_eq!(session.network, Some(NetworkTag::Mumbai));
			assert!(session.has_contracts());
			assert!(fx.connector.is_subscribed(WalletEventKind::AccountsChanged));
			assert!(fx.connector.is_subscribed(WalletEventKind::ChainChanged));
			assert_eq!(fx.connector.subscription_count(), 2);
			handle.teardown();
		};
		tokio::join!(controller.run(), script);

		assert_eq!(fx.connector.subscription_count(), 0);
		assert!(!handle.is_running());
		assert!(!handle.establish());
	}

	#[tokio::test]
	async fn wallet_event_gates_readers_until_rerun_publishes() {
		let fx = Fixture::new();
		let (controller, mut handle) = fx.controller();

		let script = async {
			handle.wait_ready().await.unwrap();

			let gate = fx.registry.hold();
			fx.signer.set_chain(31_337);
			assert_eq!(fx.connector.emit(WalletEvent::ChainChanged("0x7a69".into())), 1);
			fx.registry.wait_for_calls(2).await;

			let mid = handle.snapshot();
			assert!(!mid.is_ready);
			assert_eq!(mid.network, Some(NetworkTag::Mumbai), "gating keeps the old values");

			gate.release();
			let session = handle.wait_ready().await.unwrap();
			assert_eq!(session.network, Some(NetworkTag::Localhost));
			assert_eq!(session.marketplace.as_ref().unwrap().address(), "0xCC");
			handle.teardown();
		};
		tokio::join!(controller.run(), script);

		assert_eq!(fx.connector.connect_calls(), 1, "events never re-prompt");
	}

	#[tokio::test]
	async fn superseded_cycle_result_is_discarded() {
		let fx = Fixture::new();
		let (controller, mut handle) = fx.controller();

		let script = async {
			handle.wait_ready().await.unwrap();

			// Chain switch to localhost, held at the registry.
			let gate = fx.registry.hold();
			fx.signer.set_chain(31_337);
			fx.connector.emit(WalletEvent::ChainChanged("0x7a69".into()));
			fx.registry.wait_for_calls(2).await;

			// Account and chain change again while that cycle is in flight.
			fx.signer.set_chain(80_001);
			fx.signer.set_account(BOB);
			fx.connector.emit(WalletEvent::AccountsChanged(vec![BOB.into()]));

			let fresh = handle.wait_for(|s| s.account == BOB).await.unwrap();
			assert_eq!(fresh.network, Some(NetworkTag::Mumbai));

			gate.release();
			fx.registry.wait_for_answers(3).await;

			let after = handle.snapshot();
			assert!(after.is_ready);
			assert_eq!(after.account, BOB);
			assert_eq!(after.network, Some(NetworkTag::Mumbai));
			assert_eq!(after.nft.as_ref().unwrap().address(), "0xBB");
			handle.teardown();
		};
		tokio::join!(controller.run(), script);

		assert_eq!(
			fx.registry.requested(),
			vec![NetworkTag::Mumbai, NetworkTag::Localhost, NetworkTag::Mumbai]
		);
	}

	#[tokio::test]
	async fn teardown_drops_in_flight_cycle_and_unsubscribes() {
		let fx = Fixture::new();
		let (controller, mut handle) = fx.controller();

		let script = async {
			handle.wait_ready().await.unwrap();
			let _gate = fx.registry.hold();
			fx.connector.emit(WalletEvent::AccountsChanged(vec![ALICE.into()]));
			fx.registry.wait_for_calls(2).await;
			handle.teardown();
		};
		tokio::join!(controller.run(), script);

		assert_eq!(fx.connector.subscription_count(), 0);
		assert!(!handle.is_ready());
		assert_eq!(fx.connector.emit(WalletEvent::ChainChanged("0x1".into())), 0);
	}

	#[tokio::test]
	async fn teardown_wins_over_cycle_finishing_in_same_step() {
		let fx = Fixture::new();
		let (controller, mut handle) = fx.controller();

		let script = async {
			handle.wait_ready().await.unwrap();
			let gate = fx.registry.hold();
			fx.signer.set_account(BOB);
			fx.connector.emit(WalletEvent::AccountsChanged(vec![BOB.into()]));
			fx.registry.wait_for_calls(2).await;

			// Both land before the controller is polled again.
			gate.release();
			assert!(handle.teardown());
		};
		tokio::join!(controller.run(), script);

		let session = handle.snapshot();
		assert!(!session.is_ready);
		assert_eq!(session.account, ALICE, "rerun never published");
		assert_eq!(fx.connector.subscription_count(), 0);
	}

	#[tokio::test]
	async fn dropping_every_handle_stops_controller() {
		let fx = Fixture::new();
		let (controller, mut handle) = fx.controller();
		let mut reader = handle.reader();

		let script = async move {
			handle.wait_ready().await.unwrap();
			drop(handle);
		};
		tokio::time::timeout(Duration::from_secs(2), async { tokio::join!(controller.run(), script) })
			.await
			.expect("controller kept running without handles");

		assert_eq!(fx.connector.subscription_count(), 0);
		assert_eq!(fx.connector.emit(WalletEvent::ChainChanged("0x1".into())), 0);
		let _ = reader.changed().await;
		assert!(reader.changed().await.is_err(), "store closed with the controller");
	}

	#[tokio::test]
	async fn incomplete_record_publishes_ready_session_without_contracts() {
		let fx = Fixture::new();
		let payload = AddressRecordPayload {
			network: Some("MUMBAI".into()),
			marketplace_address: None,
			nft_address: Some("0xBB".into()),
		};
		let incomplete = AddressRecord::from_payload(NetworkTag::Mumbai, payload);
		assert!(matches!(incomplete, Err(RegistryError::Incomplete { .. })));
		fx.registry.set(NetworkTag::Mumbai, incomplete);
		let (controller, mut handle) = fx.controller();

		let script = async {
			let session = handle.wait_ready().await.unwrap();
			assert!(session.is_ready);
			assert_eq!(session.network, Some(NetworkTag::Mumbai));
			assert!(session.marketplace.is_none());
			assert!(session.nft.is_none());
			assert_eq!(session.account, ALICE);
			assert!(handle.is_ready());
			handle.teardown();
		};
		tokio::join!(controller.run(), script);
	}

	#[tokio::test]
	async fn manual_establish_picks_up_new_connector() {
		let fx = Fixture::new();
		fx.discovery.clear();
		let (controller, mut handle) = fx.controller();

		let script = async {
			let fallback = handle.wait_ready().await.unwrap();
			assert!(!fallback.has_wallet_connector);
			assert_eq!(fx.connector.subscription_count(), 0);

			fx.discovery.install(fx.connector.clone());
			assert!(handle.establish());
			let session = handle.wait_for(|s| s.has_wallet_connector).await.unwrap();
			assert_eq!(session.account, ALICE);
			assert_eq!(fx.connector.subscription_count(), 2);

			let other = Rc::new(MockConnector::new(Rc::new(MockSigner::new(BOB, 31_337))));
			fx.discovery.install(other.clone());
			handle.establish();
			let switched = handle.wait_for(|s| s.account == BOB).await.unwrap();
			assert_eq!(switched.network, Some(NetworkTag::Localhost));
			assert_eq!(fx.connector.subscription_count(), 0, "old connector released");
			assert_eq!(other.subscription_count(), 2);
			assert_eq!(fx.connector.emit(WalletEvent::ChainChanged("0x1".into())), 0);

			handle.teardown();
		};
		tokio::join!(controller.run(), script);
	}

	#[tokio::test]
	async fn rerun_against_same_connector_keeps_subscriptions() {
		let fx = Fixture::new();
		let (controller, mut handle) = fx.controller();

		let script = async {
			handle.wait_ready().await.unwrap();
			fx.signer.set_account(BOB);
			fx.connector.emit(WalletEvent::AccountsChanged(vec![BOB.into()]));
			handle.wait_for(|s| s.account == BOB).await.unwrap();
			assert_eq!(fx.connector.subscription_count(), 2);
			handle.teardown();
		};
		tokio::join!(controller.run(), script);
	}
}

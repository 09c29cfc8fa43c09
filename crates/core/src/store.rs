//! Sequenced, whole-value publication of [`Session`] state.
//!
//! Every establishment cycle takes a [`CycleTicket`] when it is accepted.
//! Taking a ticket flips `is_ready` off immediately; only the holder of the
//! latest ticket may publish, and publishing flips it back on. Results from
//! superseded tickets are dropped.

use std::cell::Cell;

use tokio::sync::watch;
use tracing::debug;

use crate::session::Session;

/// Sequence number an establishment cycle carries to publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CycleTicket(u64);

impl CycleTicket {
	pub fn sequence(self) -> u64 {
		self.0
	}
}

/// Owner of the shared session value.
pub struct SessionStore {
	tx: watch::Sender<Session>,
	latest: Cell<u64>,
}

impl Default for SessionStore {
	fn default() -> Self {
		Self::new()
	}
}

impl SessionStore {
	pub fn new() -> Self {
		let (tx, _rx) = watch::channel(Session::default());
		Self { tx, latest: Cell::new(0) }
	}

	/// Read handle onto the published value.
	pub fn reader(&self) -> SessionReader {
		SessionReader { rx: self.tx.subscribe() }
	}

	/// Clone of the current value.
	pub fn current(&self) -> Session {
		self.tx.borrow().clone()
	}

	/// Sequence number of the most recently accepted cycle (0 before any).
	pub fn latest_sequence(&self) -> u64 {
		self.latest.get()
	}

	/// Accepts a new cycle: issues the next ticket and marks the session unready.
	pub fn begin_cycle(&self) -> CycleTicket {
		let sequence = self.latest.get() + 1;
		self.latest.set(sequence);
		self.tx.send_if_modified(|session| {
			let was_ready = session.is_ready;
			session.is_ready = false;
			was_ready
		});
		debug!(target = "marketlink.store", sequence, "cycle accepted; session gated");
		CycleTicket(sequence)
	}

	/// Whether `ticket` is still the latest issued.
	pub fn is_current(&self, ticket: CycleTicket) -> bool {
		ticket.0 == self.latest.get()
	}

	/// Publishes `session` if `ticket` is still current.
	///
	/// Returns whether the value was published. A stale ticket leaves the
	/// store untouched, including `is_ready`.
	pub fn publish(&self, ticket: CycleTicket, mut session: Session) -> bool {
		if !self.is_current(ticket) {
			debug!(
				target = "marketlink.store",
				sequence = ticket.0,
				latest = self.latest.get(),
				"discarding superseded cycle result"
			);
			return false;
		}

		session.is_ready = true;
		self.tx.send_replace(session);
		debug!(target = "marketlink.store", sequence = ticket.0, "session published");
		true
	}
}

/// Cloneable read handle onto the session.
#[derive(Clone)]
pub struct SessionReader {
	rx: watch::Receiver<Session>,
}

impl SessionReader {
	/// Clone of the current value.
	pub fn snapshot(&self) -> Session {
		self.rx.borrow().clone()
	}

	pub fn is_ready(&self) -> bool {
		self.rx.borrow().is_ready
	}

	/// Waits for the next change. Errors once the store is gone.
	pub async fn changed(&mut self) -> Result<Session, watch::error::RecvError> {
		self.rx.changed().await?;
		Ok(self.rx.borrow_and_update().clone())
	}

	/// Waits until a ready session is published and returns it.
	pub async fn wait_ready(&mut self) -> Result<Session, watch::error::RecvError> {
		self.wait_for(|_| true).await
	}

	/// Waits for a ready session matching `predicate`.
	pub async fn wait_for(&mut self, mut predicate: impl FnMut(&Session) -> bool) -> Result<Session, watch::error::RecvError> {
		let session = self.rx.wait_for(|session| session.is_ready && predicate(session)).await?;
		Ok(Session::clone(&session))
	}
}

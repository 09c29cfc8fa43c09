//! marketlink: wallet-or-fallback contract sessions for the marketplace front end.
//!
//! A session discovers an injected wallet (or falls back to a read-only node),
//! resolves the connected chain to a supported deployment, fetches that
//! deployment's contract addresses from the registry, and publishes a
//! [`Session`] carrying both contract bindings. Wallet account and chain
//! changes re-run the pipeline; overlapping runs are sequenced so a stale run
//! never overwrites a fresh one.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use marketlink::{Establisher, HttpAddressRegistry, HttpRpcProvider, SessionConfig, SessionController, StaticDiscovery};
//!
//! let config = SessionConfig::default();
//! let establisher = Establisher::new(
//!     &config,
//!     Rc::new(StaticDiscovery::absent()),
//!     Rc::new(HttpAddressRegistry::new(&config.registry_url)?),
//!     Rc::new(HttpRpcProvider::new("https://rpc-mumbai.maticvigil.com")?),
//! );
//! let (controller, mut handle) = SessionController::new(establisher);
//!
//! let ui = async move {
//!     let session = handle.wait_ready().await?;
//!     println!("{} on {}", session.account, session.network_label());
//!     handle.teardown();
//! };
//! tokio::join!(controller.run(), ui);
//! ```

pub mod config;
pub mod contract;
pub mod error;
pub mod establish;
pub mod network;
pub mod provider;
pub mod reactivity;
pub mod registry;
pub mod rpc;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod units;

pub use marketlink_protocol as protocol;

pub use config::{DEFAULT_REGISTRY_URL, SessionConfig};
pub use contract::{ContractBinding, ContractInterface, ContractSessionBuilder, ContractSet};
pub use error::{ProviderError, RegistryError, Result, SessionError};
pub use establish::{EstablishState, Establisher, Establishment, Terminal, WalletLink};
pub use network::{ChainIdentifier, NetworkTag, resolve};
pub use provider::{
	ChainAccess, ChainProvider, Signer, StaticDiscovery, SubscriptionId, WalletConnector, WalletDiscovery, WalletEvent,
	WalletEventKind, WalletEventSink,
};
pub use reactivity::{SessionController, SessionHandle};
pub use registry::{AddressRecord, AddressRegistry, HttpAddressRegistry};
pub use rpc::HttpRpcProvider;
pub use session::Session;
pub use store::{CycleTicket, SessionReader, SessionStore};
pub use units::format_ether;

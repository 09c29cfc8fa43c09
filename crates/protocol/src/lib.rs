//! Wire types for marketlink.
//!
//! This crate contains the serde-serializable shapes exchanged with the
//! session manager's external collaborators:
//!
//! - [`address_record`] - payloads served by the contract address registry
//! - [`rpc`] - JSON-RPC 2.0 envelopes and hex quantity encoding
//! - [`wallet`] - EIP-1193 event names and provider error codes
//!
//! Types here are pure data. Validation and behavior live in the `marketlink`
//! crate.

pub mod address_record;
pub mod rpc;
pub mod wallet;

pub use address_record::AddressRecordPayload;
pub use rpc::{QuantityError, RpcErrorObject, RpcRequest, RpcResponse, parse_quantity};
pub use wallet::{ProviderErrorCode, WalletEventKind};

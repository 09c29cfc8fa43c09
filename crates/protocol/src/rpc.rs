//! JSON-RPC 2.0 envelopes and Ethereum hex quantities.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// JSON-RPC protocol version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// Outgoing JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
	pub jsonrpc: String,
	pub id: u64,
	pub method: String,
	#[serde(default)]
	pub params: Value,
}

impl RpcRequest {
	/// Builds a request with positional params.
	pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
		Self {
			jsonrpc: JSONRPC_VERSION.to_string(),
			id,
			method: method.into(),
			params: Value::Array(params),
		}
	}
}

/// Error object carried by a failed JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
	pub code: i64,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

/// Incoming JSON-RPC response.
///
/// Exactly one of `result` / `error` is expected; a response with neither is
/// treated as a null result by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
	#[serde(default)]
	pub jsonrpc: Option<String>,
	#[serde(default)]
	pub id: Value,
	#[serde(default)]
	pub result: Option<Value>,
	#[serde(default)]
	pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
	/// Successful response for `id`.
	pub fn success(id: u64, result: Value) -> Self {
		Self {
			jsonrpc: Some(JSONRPC_VERSION.to_string()),
			id: Value::from(id),
			result: Some(result),
			error: None,
		}
	}

	/// Failed response for `id`.
	pub fn failure(id: u64, code: i64, message: impl Into<String>) -> Self {
		Self {
			jsonrpc: Some(JSONRPC_VERSION.to_string()),
			id: Value::from(id),
			result: None,
			error: Some(RpcErrorObject {
				code,
				message: message.into(),
				data: None,
			}),
		}
	}
}

/// Failure decoding a hex quantity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
	#[error("quantity is missing the 0x prefix: {0:?}")]
	MissingPrefix(String),

	#[error("quantity has no digits")]
	Empty,

	#[error("invalid hex digit in quantity {0:?}")]
	InvalidDigit(String),

	#[error("quantity {0:?} does not fit in 128 bits")]
	Overflow(String),
}

/// Parses an Ethereum JSON-RPC quantity (`"0x1a"`) into an integer.
pub fn parse_quantity(raw: &str) -> Result<u128, QuantityError> {
	let digits = raw
		.strip_prefix("0x")
		.or_else(|| raw.strip_prefix("0X"))
		.ok_or_else(|| QuantityError::MissingPrefix(raw.to_string()))?;

	if digits.is_empty() {
		return Err(QuantityError::Empty);
	}
	if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
		return Err(QuantityError::InvalidDigit(raw.to_string()));
	}

	let significant = digits.trim_start_matches('0');
	if significant.len() > 32 {
		return Err(QuantityError::Overflow(raw.to_string()));
	}
	if significant.is_empty() {
		return Ok(0);
	}

	u128::from_str_radix(significant, 16).map_err(|_| QuantityError::Overflow(raw.to_string()))
}

/// Encodes an integer as a minimal hex quantity.
pub fn format_quantity(value: u128) -> String {
	format!("0x{value:x}")
}

//! JS-facing session handle.

use std::rc::Rc;

use js_sys::{Function, Promise};
use marketlink::{Establisher, HttpAddressRegistry, HttpRpcProvider, Session, SessionConfig, SessionController, SessionHandle};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use crate::eip1193::{WindowDiscovery, describe};

/// Options accepted by `new WebSession(options)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebConfig {
	#[serde(flatten)]
	pub session: SessionConfig,
	/// Read-only JSON-RPC endpoint for the fallback network.
	pub rpc_url: String,
}

impl Default for WebConfig {
	fn default() -> Self {
		Self {
			session: SessionConfig::default(),
			rpc_url: "https://rpc-mumbai.maticvigil.com".to_string(),
		}
	}
}

/// A running session. Establishment starts as soon as it is constructed.
#[wasm_bindgen]
pub struct WebSession {
	handle: SessionHandle,
}

#[wasm_bindgen]
impl WebSession {
	#[wasm_bindgen(constructor)]
	pub fn new(options: JsValue) -> Result<WebSession, JsError> {
		let mut config: WebConfig = if options.is_undefined() || options.is_null() {
			WebConfig::default()
		} else {
			serde_wasm_bindgen::from_value(options)?
		};
		if config.session.call_timeout_ms.take().is_some() {
			// tokio's timer needs a tokio runtime, which the page does not have.
			warn!(target = "marketlink.web", "callTimeoutMs is ignored in the browser");
		}

		let registry = HttpAddressRegistry::new(&config.session.registry_url)?;
		let fallback = HttpRpcProvider::new(&config.rpc_url)?;
		let establisher = Establisher::new(&config.session, Rc::new(WindowDiscovery), Rc::new(registry), Rc::new(fallback));
		let (controller, handle) = SessionController::new(establisher);

		info!(target = "marketlink.web", registry = %config.session.registry_url, rpc = %config.rpc_url, "session starting");
		spawn_local(controller.run());
		Ok(WebSession { handle })
	}

	/// Current session as a plain object.
	pub fn snapshot(&self) -> Result<JsValue, JsError> {
		to_value(&self.handle.snapshot())
	}

	#[wasm_bindgen(js_name = isReady)]
	pub fn is_ready(&self) -> bool {
		self.handle.is_ready()
	}

	/// Starts a fresh cycle; also the retry after a rejected connection.
	pub fn establish(&self) -> bool {
		self.handle.establish()
	}

	pub fn teardown(&self) -> bool {
		self.handle.teardown()
	}

	/// Resolves with the next ready session.
	#[wasm_bindgen(js_name = whenReady)]
	pub fn when_ready(&self) -> Promise {
		let mut reader = self.handle.reader();
		future_to_promise(async move {
			let session = reader
				.wait_ready()
				.await
				.map_err(|_| JsValue::from_str("session torn down"))?;
			to_value(&session).map_err(JsValue::from)
		})
	}

	/// Calls `callback(session)` on every publication until teardown.
	#[wasm_bindgen(js_name = onChange)]
	pub fn on_change(&self, callback: Function) {
		let mut reader = self.handle.reader();
		spawn_local(async move {
			while let Ok(session) = reader.changed().await {
				let result = to_value(&session)
					.map_err(JsValue::from)
					.and_then(|value| callback.call1(&JsValue::NULL, &value));
				if let Err(err) = result {
					warn!(target = "marketlink.web", error = %describe(&err), "session listener failed");
				}
			}
		});
	}
}

impl Drop for WebSession {
	/// `free()` from JS stops the controller and removes the wallet listeners.
	fn drop(&mut self) {
		self.handle.teardown();
	}
}

fn to_value(session: &Session) -> Result<JsValue, JsError> {
	Ok(session.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
}

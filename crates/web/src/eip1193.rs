//! Injected `window.ethereum` wallet.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use marketlink::protocol::{RpcErrorObject, parse_quantity};
use marketlink::{
	ChainIdentifier, ChainProvider, ProviderError, Result, Signer, SubscriptionId, WalletConnector, WalletDiscovery, WalletEvent,
	WalletEventKind, WalletEventSink,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, trace};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
	/// EIP-1193 provider object.
	#[wasm_bindgen(extends = js_sys::Object)]
	#[derive(Clone, Debug)]
	pub type Ethereum;

	#[wasm_bindgen(method, catch)]
	fn request(this: &Ethereum, args: &JsValue) -> std::result::Result<Promise, JsValue>;

	#[wasm_bindgen(method)]
	fn on(this: &Ethereum, event: &str, listener: &Function);

	#[wasm_bindgen(method, js_name = removeListener)]
	fn remove_listener(this: &Ethereum, event: &str, listener: &Function);
}

/// Looks for `window.ethereum` each time a cycle starts.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowDiscovery;

impl WalletDiscovery for WindowDiscovery {
	fn discover(&self) -> Option<Rc<dyn WalletConnector>> {
		let window: JsValue = web_sys::window()?.into();
		let ethereum = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
		if ethereum.is_undefined() || ethereum.is_null() {
			debug!(target = "marketlink.wallet", "no injected provider");
			return None;
		}
		Some(Rc::new(InjectedWallet::new(ethereum.unchecked_into())))
	}
}

struct Listener {
	kind: WalletEventKind,
	callback: Closure<dyn FnMut(JsValue)>,
}

struct Inner {
	ethereum: Ethereum,
	listeners: RefCell<HashMap<SubscriptionId, Listener>>,
	next_id: Cell<SubscriptionId>,
}

impl Inner {
	async fn request<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
		trace!(target = "marketlink.wallet", method, "wallet request");
		let args = to_js(&json!({ "method": method, "params": params }))?;
		let promise = self.ethereum.request(&args).map_err(provider_error)?;
		let value = JsFuture::from(promise).await.map_err(provider_error)?;
		serde_wasm_bindgen::from_value(value).map_err(|e| ProviderError::InvalidResponse(format!("{method}: {e}")))
	}

	async fn accounts(&self) -> Result<Vec<String>> {
		self.request("eth_accounts", Vec::new()).await
	}
}

/// Wallet connector over an injected EIP-1193 provider.
#[derive(Clone)]
pub struct InjectedWallet {
	inner: Rc<Inner>,
}

impl InjectedWallet {
	pub fn new(ethereum: Ethereum) -> Self {
		Self {
			inner: Rc::new(Inner {
				ethereum,
				listeners: RefCell::new(HashMap::new()),
				next_id: Cell::new(1),
			}),
		}
	}

	pub fn listener_count(&self) -> usize {
		self.inner.listeners.borrow().len()
	}
}

#[async_trait(?Send)]
impl WalletConnector for InjectedWallet {
	async fn connect(&self) -> Result<Rc<dyn Signer>> {
		let accounts: Vec<String> = self.inner.request("eth_requestAccounts", Vec::new()).await?;
		if accounts.is_empty() {
			return Err(ProviderError::NoAccounts);
		}
		Ok(Rc::new(InjectedSigner {
			inner: Rc::clone(&self.inner),
		}))
	}

	fn subscribe(&self, kind: WalletEventKind, sink: WalletEventSink) -> SubscriptionId {
		let callback = Closure::<dyn FnMut(JsValue)>::new(move |payload: JsValue| {
			if let Some(event) = wallet_event(kind, payload) {
				sink.emit(event);
			}
		});
		self.inner.ethereum.on(kind.as_str(), callback.as_ref().unchecked_ref());

		let id = self.inner.next_id.get();
		self.inner.next_id.set(id + 1);
		self.inner.listeners.borrow_mut().insert(id, Listener { kind, callback });
		id
	}

	fn unsubscribe(&self, id: SubscriptionId) {
		if let Some(listener) = self.inner.listeners.borrow_mut().remove(&id) {
			self.inner
				.ethereum
				.remove_listener(listener.kind.as_str(), listener.callback.as_ref().unchecked_ref());
		}
	}
}

/// Signer that asks the wallet for its selected account on every call.
struct InjectedSigner {
	inner: Rc<Inner>,
}

#[async_trait(?Send)]
impl ChainProvider for InjectedSigner {
	async fn chain_id(&self) -> Result<ChainIdentifier> {
		let raw: Value = self.inner.request("eth_chainId", Vec::new()).await?;
		match raw {
			Value::String(raw) => Ok(ChainIdentifier::parse(&raw)),
			Value::Number(n) => n
				.as_u64()
				.map(ChainIdentifier::Id)
				.ok_or_else(|| ProviderError::InvalidResponse(format!("chain id {n}"))),
			other => Err(ProviderError::InvalidResponse(format!("chain id {other}"))),
		}
	}

	async fn balance(&self, address: &str) -> Result<u128> {
		let raw: String = self
			.inner
			.request("eth_getBalance", vec![Value::from(address), Value::from("latest")])
			.await?;
		Ok(parse_quantity(&raw)?)
	}
}

#[async_trait(?Send)]
impl Signer for InjectedSigner {
	async fn address(&self) -> Result<String> {
		self.inner.accounts().await?.into_iter().next().ok_or(ProviderError::NoAccounts)
	}
}

fn wallet_event(kind: WalletEventKind, payload: JsValue) -> Option<WalletEvent> {
	match kind {
		WalletEventKind::AccountsChanged => serde_wasm_bindgen::from_value(payload).ok().map(WalletEvent::AccountsChanged),
		WalletEventKind::ChainChanged => payload
			.as_string()
			.or_else(|| payload.as_f64().map(|id| (id as u64).to_string()))
			.map(WalletEvent::ChainChanged),
	}
}

pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue> {
	value
		.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
		.map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// Maps a thrown provider error (`{ code, message }`) onto [`ProviderError`].
fn provider_error(err: JsValue) -> ProviderError {
	match serde_wasm_bindgen::from_value::<RpcErrorObject>(err.clone()) {
		Ok(object) => object.into(),
		Err(_) => ProviderError::Transport(describe(&err)),
	}
}

pub(crate) fn describe(err: &JsValue) -> String {
	err.as_string()
		.or_else(|| js_sys::JSON::stringify(err).ok()?.as_string())
		.unwrap_or_else(|| format!("{err:?}"))
}

//! Browser bindings for marketlink sessions.
//!
//! ```js
//! import init, { WebSession } from "marketlink_web";
//!
//! await init();
//! const session = new WebSession({ registryUrl: "https://market.example/api", rpcUrl: "https://rpc-mumbai.maticvigil.com" });
//! session.onChange((s) => { if (s.isReady) render(s); });
//! ```

mod eip1193;
mod session;

pub use eip1193::{Ethereum, InjectedWallet, WindowDiscovery};
pub use session::{WebConfig, WebSession};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn start() {
	console_error_panic_hook::set_once();
	tracing_wasm::set_as_global_default();
}

//! End-to-end checks against an in-process registry and JSON-RPC node.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::rc::Rc;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use marketlink::{
	AddressRegistry, ChainIdentifier, ChainProvider, EstablishState, Establisher, HttpAddressRegistry, HttpRpcProvider, NetworkTag,
	RegistryError, SessionConfig, SessionController, StaticDiscovery,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

const ACCOUNT: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn addresses(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
	match params.get("network").map(String::as_str) {
		Some("MUMBAI") => (
			StatusCode::OK,
			Json(json!({"network": "MUMBAI", "marketplaceAddress": "0xAA", "nftAddress": "0xBB"})),
		),
		Some("LOCALHOST") => (
			StatusCode::OK,
			Json(json!({"network": "LOCALHOST", "marketplaceAddress": null, "nftAddress": "0xBB"})),
		),
		_ => (StatusCode::NOT_FOUND, Json(json!({"error": "unknown network"}))),
	}
}

async fn rpc(Json(request): Json<Value>) -> Json<Value> {
	let id = request["id"].clone();
	let reply = match request["method"].as_str() {
		Some("eth_chainId") => json!({"result": "0x13881"}),
		Some("eth_getBalance") => json!({"result": "0x14d1120d7b160000"}),
		Some("eth_accounts") => json!({"result": [ACCOUNT]}),
		_ => json!({"error": {"code": -32601, "message": "method not found"}}),
	};
	let mut envelope = json!({"jsonrpc": "2.0", "id": id});
	if let (Some(envelope), Some(reply)) = (envelope.as_object_mut(), reply.as_object()) {
		envelope.extend(reply.clone());
	}
	Json(envelope)
}

async fn serve() -> SocketAddr {
	let app = Router::new()
		.route("/api/addresses", get(addresses))
		.route("/broken/addresses", get(|| async { "<html>not json</html>" }))
		.route("/rpc", post(rpc));
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	addr
}

async fn closed_port() -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	listener.local_addr().unwrap()
}

#[tokio::test]
async fn registry_client_maps_responses() {
	init_tracing();
	let addr = serve().await;
	let registry = HttpAddressRegistry::new(&format!("http://{addr}/api")).unwrap();

	let record = registry.fetch_addresses(NetworkTag::Mumbai).await.unwrap();
	assert_eq!(record.marketplace_address, "0xAA");
	assert_eq!(record.nft_address, "0xBB");

	let incomplete = registry.fetch_addresses(NetworkTag::Localhost).await.unwrap_err();
	assert_eq!(
		incomplete,
		RegistryError::Incomplete {
			network: NetworkTag::Localhost,
			field: "marketplaceAddress"
		}
	);

	let missing = registry.fetch_addresses(NetworkTag::Unsupported).await.unwrap_err();
	assert!(matches!(missing, RegistryError::Unreachable(_)));

	let broken = HttpAddressRegistry::new(&format!("http://{addr}/broken")).unwrap();
	let malformed = broken.fetch_addresses(NetworkTag::Mumbai).await.unwrap_err();
	assert!(matches!(malformed, RegistryError::MalformedResponse(_)));
}

#[tokio::test]
async fn registry_client_reports_refused_connection() {
	let addr = closed_port().await;
	let registry = HttpAddressRegistry::new(&format!("http://{addr}/api")).unwrap();
	let err = registry.fetch_addresses(NetworkTag::Mumbai).await.unwrap_err();
	assert!(matches!(err, RegistryError::Unreachable(_)));
}

#[tokio::test]
async fn rpc_provider_reads_chain_and_balance() {
	let addr = serve().await;
	let provider = HttpRpcProvider::new(&format!("http://{addr}/rpc")).unwrap();

	assert_eq!(provider.chain_id().await.unwrap(), ChainIdentifier::Id(80_001));
	assert_eq!(provider.balance(ACCOUNT).await.unwrap(), 1_500_000_000_000_000_000);
	assert_eq!(provider.request_accounts().await.unwrap(), vec![ACCOUNT.to_string()]);
}

#[tokio::test]
async fn fallback_session_binds_registry_addresses() {
	init_tracing();
	let addr = serve().await;
	let config = SessionConfig::default().with_registry_url(format!("http://{addr}/api"));
	let establisher = Establisher::new(
		&config,
		Rc::new(StaticDiscovery::absent()),
		Rc::new(HttpAddressRegistry::new(&config.registry_url).unwrap()),
		Rc::new(HttpRpcProvider::new(&format!("http://{addr}/rpc")).unwrap()),
	);
	let (controller, mut handle) = SessionController::new(establisher);

	let ui = async {
		let session = handle.wait_ready().await.unwrap();
		assert!(!session.has_wallet_connector);
		assert_eq!(session.network, Some(NetworkTag::Mumbai));
		assert_eq!(session.marketplace.as_ref().unwrap().address(), "0xAA");
		assert_eq!(session.nft.as_ref().unwrap().address(), "0xBB");
		assert!(session.is_consistent());
		handle.teardown();
	};
	tokio::join!(controller.run(), ui);
}

#[tokio::test]
async fn incomplete_record_over_http_publishes_empty_bindings() {
	let addr = serve().await;
	let config = SessionConfig::default()
		.with_registry_url(format!("http://{addr}/api"))
		.with_fallback_network(NetworkTag::Localhost);
	let establisher = Establisher::new(
		&config,
		Rc::new(StaticDiscovery::absent()),
		Rc::new(HttpAddressRegistry::new(&config.registry_url).unwrap()),
		Rc::new(HttpRpcProvider::new(&format!("http://{addr}/rpc")).unwrap()),
	);

	let outcome = establisher.establish().await;
	assert_eq!(outcome.state(), EstablishState::Error);
	assert_eq!(outcome.session.network, Some(NetworkTag::Localhost));
	assert!(outcome.session.marketplace.is_none());
	assert!(outcome.session.nft.is_none());
}

#[tokio::test]
async fn unreachable_registry_still_settles() {
	let node = serve().await;
	let registry = closed_port().await;
	let config = SessionConfig::default().with_registry_url(format!("http://{registry}/api"));
	let establisher = Establisher::new(
		&config,
		Rc::new(StaticDiscovery::absent()),
		Rc::new(HttpAddressRegistry::new(&config.registry_url).unwrap()),
		Rc::new(HttpRpcProvider::new(&format!("http://{node}/rpc")).unwrap()),
	);
	let (controller, mut handle) = SessionController::new(establisher);

	let ui = async {
		let session = handle.wait_ready().await.unwrap();
		assert!(!session.has_contracts());
		assert_eq!(session.network_label(), "MUMBAI");
		handle.teardown();
	};
	tokio::join!(controller.run(), ui);
}

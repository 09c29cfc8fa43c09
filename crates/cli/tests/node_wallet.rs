//! Node-backed wallet and CLI host against an in-process JSON-RPC node.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use marketlink::{
	ChainIdentifier, ChainProvider, NetworkTag, ProviderError, SessionController, Signer, WalletConnector, WalletEvent,
};
use marketlink_cli::config::CliConfig;
use marketlink_cli::host::Host;
use marketlink_cli::wallet::NodeWallet;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

const ACCOUNT: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

#[derive(Debug)]
struct Node {
	chain: String,
	accounts: Vec<String>,
}

type Shared = Arc<Mutex<Node>>;

async fn rpc(State(node): State<Shared>, Json(request): Json<Value>) -> Json<Value> {
	let node = node.lock().unwrap();
	let reply = match request["method"].as_str() {
		Some("eth_chainId") => json!({"result": node.chain}),
		Some("eth_accounts") => json!({"result": node.accounts}),
		Some("eth_getBalance") => json!({"result": "0xde0b6b3a7640000"}),
		_ => json!({"error": {"code": -32601, "message": "method not found"}}),
	};
	let mut envelope = json!({"jsonrpc": "2.0", "id": request["id"].clone()});
	if let (Some(envelope), Some(reply)) = (envelope.as_object_mut(), reply.as_object()) {
		envelope.extend(reply.clone());
	}
	Json(envelope)
}

async fn serve(chain: &str, accounts: &[&str]) -> (String, Shared) {
	let node = Arc::new(Mutex::new(Node {
		chain: chain.to_string(),
		accounts: accounts.iter().map(|a| a.to_string()).collect(),
	}));
	let app = Router::new().route("/", post(rpc)).with_state(node.clone());
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr: SocketAddr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	(format!("http://{addr}"), node)
}

fn addresses_dir() -> TempDir {
	let dir = tempfile::tempdir().unwrap();
	std::fs::write(
		dir.path().join("MUMBAI.json"),
		r#"{"network": "MUMBAI", "nftAddress": "0xB1", "marketplaceAddress": "0xA1"}"#,
	)
	.unwrap();
	std::fs::write(
		dir.path().join("LOCALHOST.json"),
		r#"{"network": "LOCALHOST", "nftAddress": "0xB2", "marketplaceAddress": "0xA2"}"#,
	)
	.unwrap();
	dir
}

#[tokio::test]
async fn connect_signs_with_first_account() {
	let (url, _node) = serve("0x13881", &[ACCOUNT, "0x0000000000000000000000000000000000000002"]).await;
	let wallet = NodeWallet::new(&url).unwrap();

	let signer = wallet.connect().await.unwrap();
	assert_eq!(signer.address().await.unwrap(), ACCOUNT);
	assert_eq!(signer.chain_id().await.unwrap(), ChainIdentifier::Id(80_001));
	assert_eq!(signer.balance(ACCOUNT).await.unwrap(), 1_000_000_000_000_000_000);
}

#[tokio::test]
async fn connect_without_accounts_fails() {
	let (url, _node) = serve("0x13881", &[]).await;
	let wallet = NodeWallet::new(&url).unwrap();

	assert!(matches!(wallet.connect().await, Err(ProviderError::NoAccounts)));
}

#[tokio::test]
async fn polling_reports_each_change_once() {
	let (url, node) = serve("0x13881", &[ACCOUNT]).await;
	let wallet = NodeWallet::new(&url).unwrap();

	// First poll records the baseline.
	assert!(wallet.poll_changes().await.unwrap().is_empty());

	node.lock().unwrap().chain = "0x7a69".to_string();
	assert_eq!(
		wallet.poll_changes().await.unwrap(),
		vec![WalletEvent::ChainChanged("0x7a69".to_string())]
	);
	assert!(wallet.poll_changes().await.unwrap().is_empty());

	node.lock().unwrap().accounts.clear();
	assert_eq!(wallet.poll_changes().await.unwrap(), vec![WalletEvent::AccountsChanged(Vec::new())]);
}

#[tokio::test]
async fn chain_switch_rebinds_session() {
	let (url, node) = serve("0x13881", &[ACCOUNT]).await;
	let dir = addresses_dir();
	let config = CliConfig {
		rpc_url: url.clone(),
		wallet_rpc_url: Some(url),
		addresses_dir: Some(dir.path().to_path_buf()),
		..CliConfig::default()
	};

	let host = Host::build(&config).unwrap();
	let wallet = host.wallet.clone().unwrap();
	let (controller, mut handle) = SessionController::new(host.establisher);

	let script = async {
		let session = handle.wait_ready().await.unwrap();
		assert_eq!(session.network, Some(NetworkTag::Mumbai));
		assert_eq!(session.account, ACCOUNT);
		assert_eq!(session.balance, "1.0");
		assert!(session.has_wallet_connector);
		assert_eq!(session.marketplace.as_ref().unwrap().address(), "0xA1");
		assert_eq!(wallet.subscriber_count(), 2);

		node.lock().unwrap().chain = "0x7a69".to_string();
		let events = wallet.poll_changes().await.unwrap();
		assert_eq!(events.len(), 1);

		let session = handle
			.wait_for(|session| session.network == Some(NetworkTag::Localhost))
			.await
			.unwrap();
		assert_eq!(session.marketplace.as_ref().unwrap().address(), "0xA2");
		assert_eq!(session.nft.as_ref().unwrap().address(), "0xB2");
		assert!(session.is_consistent());

		assert!(handle.teardown());
	};

	tokio::join!(controller.run(), script);
	assert_eq!(wallet.subscriber_count(), 0);
}

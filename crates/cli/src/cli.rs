use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

fn help_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default().bold())
		.usage(AnsiColor::Yellow.on_default().bold())
		.literal(AnsiColor::Green.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(name = "marketlink")]
#[command(about = "Establish and watch marketplace contract sessions from the command line")]
#[command(version)]
#[command(styles = help_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default), json, or ndjson
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Load settings from a JSON config file (flags win)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Address registry base URL (`/addresses` is appended)
	#[arg(long, global = true, value_name = "URL")]
	pub registry_url: Option<String>,

	/// Read address records from a deploy output directory instead of the registry
	#[arg(long, global = true, value_name = "DIR", conflicts_with = "registry_url")]
	pub addresses_dir: Option<PathBuf>,

	/// Read-only JSON-RPC node used when no wallet is connected
	#[arg(long, global = true, value_name = "URL")]
	pub rpc_url: Option<String>,

	/// JSON-RPC node whose unlocked accounts act as the wallet
	#[arg(long, global = true, value_name = "URL")]
	pub wallet_rpc_url: Option<String>,

	/// Ignore any configured wallet and use the read-only path
	#[arg(long, global = true, conflicts_with = "wallet_rpc_url")]
	pub no_wallet: bool,

	/// Network assumed without a wallet (MUMBAI or LOCALHOST)
	#[arg(long, global = true, value_name = "TAG")]
	pub fallback_network: Option<String>,

	/// Bound each wallet, node, and registry call (milliseconds)
	#[arg(long, global = true, value_name = "MS")]
	pub timeout_ms: Option<u64>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
	/// Map a chain id or network name to a deployment target
	Resolve {
		/// Chain id (decimal or 0x-hex) or network name
		chain: String,
	},

	/// Look up the contract addresses for a network
	Addresses {
		/// Network tag, chain id, or network name
		network: String,
	},

	/// Run one establishment cycle and print the resulting session
	Establish,

	/// Keep a session open and print every published change
	Watch {
		/// How often to poll the wallet node for account/chain changes
		#[arg(long, value_name = "MS", default_value_t = 2000)]
		poll_ms: u64,
	},
}

impl Commands {
	/// Name reported in result envelopes.
	pub fn name(&self) -> &'static str {
		match self {
			Self::Resolve { .. } => "resolve",
			Self::Addresses { .. } => "addresses",
			Self::Establish => "establish",
			Self::Watch { .. } => "watch",
		}
	}
}

//! Result envelope shared by every command.
//!
//! ```json
//! {
//!   "ok": true,
//!   "command": "establish",
//!   "data": { ... },
//!   "timings": { "durationMs": 42 }
//! }
//! ```
//!
//! Failures carry `error: { code, message }` instead of `data`.


use std::io::{self, Write};
use std::time::{Duration, Instant};

use colored::Colorize;
use marketlink::{AddressRecord, EstablishState, NetworkTag, Session};
use serde::{Deserialize, Serialize};

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// Pretty-printed JSON
	Json,
	/// One JSON document per line (streaming)
	Ndjson,
}

impl std::str::FromStr for OutputFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"text" => Ok(OutputFormat::Text),
			"json" => Ok(OutputFormat::Json),
			"ndjson" => Ok(OutputFormat::Ndjson),
			_ => Err(format!("unknown format: {s}")),
		}
	}
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Ndjson => write!(f, "ndjson"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<Timings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Invalid flag, argument, or config value
	InvalidInput,
	/// Config file could not be read or parsed
	ConfigError,
	/// Address registry unreachable or answered badly
	RegistryError,
	/// Wallet or node call failed
	ProviderError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
			ErrorCode::RegistryError => write!(f, "REGISTRY_ERROR"),
			ErrorCode::ProviderError => write!(f, "PROVIDER_ERROR"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	pub duration_ms: u64,
}

impl From<Duration> for Timings {
	fn from(duration: Duration) -> Self {
		Timings {
			duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
		}
	}
}

/// Builder for command results
pub struct ResultBuilder<T: Serialize> {
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			data: None,
			error: None,
			start_time: Instant::now(),
		}
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error = Some(CommandError {
			code,
			message: message.into(),
		});
		self
	}

	pub fn build(self) -> CommandResult<T> {
		CommandResult {
			schema_version: Some(SCHEMA_VERSION),
			ok: self.error.is_none() && self.data.is_some(),
			command: self.command,
			data: self.data,
			error: self.error,
			timings: Some(Timings::from(self.start_time.elapsed())),
		}
	}
}

/// Payloads that know how to render themselves for humans.
pub trait TextRender {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Print a command result to stdout in the specified format
pub fn print_result<T: Serialize + TextRender>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => {
			let mut stdout = io::stdout().lock();
			if let Some(ref data) = result.data {
				let _ = data.render_text(&mut stdout);
			} else if let Some(ref error) = result.error {
				let _ = writeln!(stdout, "Error [{}]: {}", error.code, error.message);
			}
		}
	}
}

/// Print a failed result envelope for machine formats; text goes to stderr only.
pub fn print_failure<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	let json = match format {
		OutputFormat::Json => serde_json::to_string_pretty(result),
		OutputFormat::Ndjson => serde_json::to_string(result),
		OutputFormat::Text => return,
	};
	if let Ok(json) = json {
		println!("{json}");
	}
}

/// Print an error to stderr in human-readable format
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("{} [{}]: {}", "error".red().bold(), error.code, error.message);
}

/// Result data for `resolve`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveData {
	pub chain: String,
	pub network: NetworkTag,
	pub supported: bool,
}

impl TextRender for ResolveData {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		let network = if self.supported {
			self.network.as_str().green()
		} else {
			self.network.as_str().yellow()
		};
		writeln!(out, "{} -> {}", self.chain, network)
	}
}

/// Result data for `addresses`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressesData {
	pub source: String,
	#[serde(flatten)]
	pub record: AddressRecord,
}

impl TextRender for AddressesData {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{} ({})", self.record.network.as_str().bold(), self.source)?;
		writeln!(out, "  marketplace  {}", self.record.marketplace_address)?;
		writeln!(out, "  nft          {}", self.record.nft_address)
	}
}

/// Result data for `establish` and each `watch` update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
	pub state: EstablishState,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub path: Vec<EstablishState>,
	pub session: Session,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fallback_reason: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl TextRender for SessionData {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		let state = format!("{:?}", self.state);
		let state = match self.state {
			EstablishState::Ready => state.green().bold(),
			EstablishState::Unsupported => state.yellow().bold(),
			EstablishState::Error => state.red().bold(),
			_ => state.normal(),
		};
		let session = &self.session;
		writeln!(out, "{state} on {}", session.network_label().bold())?;
		if session.is_authenticated() {
			writeln!(out, "  account      {}", session.account)?;
			writeln!(out, "  balance      {} ETH", session.balance)?;
		} else {
			writeln!(out, "  account      {}", "(read-only)".dimmed())?;
		}
		match session.contracts() {
			Some((marketplace, nft)) => {
				writeln!(out, "  marketplace  {}", marketplace.address())?;
				writeln!(out, "  nft          {}", nft.address())?;
			}
			None => writeln!(out, "  contracts    {}", "unbound".dimmed())?,
		}
		if let Some(reason) = &self.fallback_reason {
			writeln!(out, "  fallback     {reason}")?;
		}
		if let Some(error) = &self.error {
			writeln!(out, "  error        {}", error.red())?;
		}
		Ok(())
	}
}

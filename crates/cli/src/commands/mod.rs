mod addresses;
mod establish;
mod resolve;
mod watch;

use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::config::CliConfig;
use crate::error::Result;
use crate::output::{OutputFormat, ResultBuilder, TextRender, print_result};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let format = cli.format;
	match &cli.command {
		// Resolution is pure; it needs no config.
		Commands::Resolve { chain } => resolve::execute(chain, format),
		Commands::Addresses { network } => {
			let config = CliConfig::resolve(&cli).await?;
			addresses::execute(network, &config, format).await
		}
		Commands::Establish => {
			let config = CliConfig::resolve(&cli).await?;
			establish::execute(&config, format).await
		}
		Commands::Watch { poll_ms } => {
			let config = CliConfig::resolve(&cli).await?;
			watch::execute(&config, *poll_ms, format).await
		}
	}
}

pub(crate) fn emit_success<T: Serialize + TextRender>(command: &str, data: T, format: OutputFormat) {
	let result = ResultBuilder::new(command).data(data).build();
	print_result(&result, format);
}

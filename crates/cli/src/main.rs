mod cli;
mod commands;
mod context;
mod error;
mod logging;
mod output;

use clap::Parser;
use tracing::error;

use crate::cli::Cli;
use crate::output::{ResultBuilder, print_result};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(&cli).await {
		error!(target = "twofa", error = %err, "command failed");
		let result = ResultBuilder::<()>::new(cli.command.name()).error(err.code(), err.to_string()).build();
		print_result(&result, cli.format);
		std::process::exit(1);
	}
}

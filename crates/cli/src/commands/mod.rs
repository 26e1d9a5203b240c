mod check_phone;
mod config;
mod login;

use crate::cli::{Cli, Commands};
use crate::context::CommandContext;
use crate::error::Result;

pub async fn dispatch(cli: &Cli) -> Result<()> {
	match &cli.command {
		Commands::CheckPhone { phone } => check_phone::execute(phone, cli.format),
		Commands::Config => config::execute(&CommandContext::from_cli(cli)?, cli.format),
		Commands::Login { phone, pin_env } => login::execute(&CommandContext::from_cli(cli)?, phone, pin_env.as_deref(), cli.format).await,
	}
}

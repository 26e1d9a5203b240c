use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::output::OutputFormat;

/// Default chromedriver endpoint.
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

#[derive(Parser, Debug)]
#[command(name = "twofa")]
#[command(about = "Two-factor (PIN + SMS) login sessions with keep-alive")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Toon)]
	pub format: OutputFormat,

	/// Session configuration file (JSON); defaults apply to missing fields
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// WebDriver endpoint to create the browser session on
	#[arg(long, global = true, env = "TWOFA_WEBDRIVER_URL", default_value = DEFAULT_WEBDRIVER_URL)]
	pub webdriver: String,

	/// Run the browser without a window
	#[arg(long, global = true)]
	pub headless: bool,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Validate a phone number offline and print its fingerprint
	CheckPhone { phone: String },

	/// Log in, then hold the session alive until Ctrl-C
	Login {
		/// Phone number in international format
		#[arg(long)]
		phone: String,

		/// Read the PIN from this environment variable instead of prompting
		#[arg(long, value_name = "VAR")]
		pin_env: Option<String>,
	},

	/// Print the effective session configuration
	Config,
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::CheckPhone { .. } => "check-phone",
			Commands::Login { .. } => "login",
			Commands::Config => "config",
		}
	}
}

use std::path::PathBuf;
use std::sync::Arc;

use twofa::{ConnectionFactory, SessionConfig, WebDriverLauncher};

use crate::cli::Cli;
use crate::error::Result;
use crate::output::EffectiveConfig;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
	pub config: SessionConfig,
	pub config_path: Option<PathBuf>,
	pub webdriver: String,
	pub headless: bool,
}

impl CommandContext {
	pub fn from_cli(cli: &Cli) -> Result<Self> {
		let config = match &cli.config {
			Some(path) => SessionConfig::from_file(path)?,
			None => SessionConfig::default(),
		};
		Ok(Self {
			config,
			config_path: cli.config.clone(),
			webdriver: cli.webdriver.clone(),
			headless: cli.headless,
		})
	}

	/// Factory creating Chrome sessions on the configured endpoint.
	pub fn factory(&self) -> Result<ConnectionFactory> {
		let launcher = WebDriverLauncher::chrome(&self.webdriver, self.headless)?;
		Ok(ConnectionFactory::new(Arc::new(launcher), self.config.clone()))
	}

	pub fn effective_config(&self) -> EffectiveConfig {
		EffectiveConfig {
			webdriver: self.webdriver.clone(),
			headless: self.headless,
			config_path: self.config_path.clone(),
		}
	}
}

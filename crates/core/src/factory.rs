//! Process-wide connection slot.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use twofa_runtime::Launcher;

use crate::config::SessionConfig;
use crate::connection::Connection;
use crate::error::Result;

/// Owns the single shared connection of a process.
///
/// The slot is created lazily and closed or replaced atomically: `create` and
/// `close` serialize on the slot lock, so two callers never launch two
/// drivers.
pub struct ConnectionFactory {
	launcher: Arc<dyn Launcher>,
	config: SessionConfig,
	slot: Mutex<Option<Connection>>,
}

impl ConnectionFactory {
	pub fn new(launcher: Arc<dyn Launcher>, config: SessionConfig) -> Self {
		Self {
			launcher,
			config,
			slot: Mutex::new(None),
		}
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Returns the live connection, launching one if the slot is empty or
	/// holds a disposed connection.
	pub async fn create(&self) -> Result<Connection> {
		let mut slot = self.slot.lock().await;
		if let Some(existing) = slot.as_ref().filter(|connection| !connection.is_disposed()) {
			debug!(target = "twofa", "reusing live connection");
			return Ok(existing.clone());
		}

		let connection = Connection::launch(self.launcher.as_ref(), self.config.clone()).await?;
		info!(target = "twofa", "connection created");
		*slot = Some(connection.clone());
		Ok(connection)
	}

	/// The connection in the slot, if it is still live.
	pub async fn current(&self) -> Option<Connection> {
		self.slot.lock().await.as_ref().filter(|connection| !connection.is_disposed()).cloned()
	}

	/// Disposes and clears the slot. Returns `false` if it was already empty.
	pub async fn close(&self) -> Result<bool> {
		let mut slot = self.slot.lock().await;
		match slot.take() {
			Some(connection) => {
				connection.dispose().await?;
				info!(target = "twofa", "connection closed");
				Ok(true)
			}
			None => Ok(false),
		}
	}
}

impl std::fmt::Debug for ConnectionFactory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConnectionFactory").field("config", &self.config).finish_non_exhaustive()
	}
}

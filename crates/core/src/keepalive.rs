//! Background keep-alive for an authenticated session.
//!
//! The remote service expires sessions after a few minutes without traffic.
//! While a connection is logged in, one task per connection watches the idle
//! timer and reloads the authenticated landing page once the threshold is
//! exceeded. The reload goes through the guarded executor like any other
//! session-dependent action, so it never interleaves with a caller's action.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::connection::Inner;
use crate::error::Error;

/// Handle to a running keep-alive task.
pub(crate) struct KeepAlive {
	stop: CancellationToken,
	handle: JoinHandle<()>,
}

impl KeepAlive {
	/// Spawns the loop. `lifetime` is the connection token: disposal stops the
	/// task as well.
	pub(crate) fn spawn(inner: Weak<Inner>, lifetime: &CancellationToken, config: &SessionConfig) -> Self {
		let stop = lifetime.child_token();
		let handle = tokio::spawn(run(
			inner,
			stop.clone(),
			config.timing.idle_threshold(),
			config.timing.keepalive_check(),
			config.urls.account.clone(),
		));
		Self { stop, handle }
	}

	/// Signals the loop and waits until it has exited.
	pub(crate) async fn stop(self) {
		self.stop.cancel();
		if let Err(err) = self.handle.await {
			if err.is_panic() {
				warn!(target = "twofa.keepalive", error = %err, "keep-alive task panicked");
			}
		}
	}
}

async fn run(inner: Weak<Inner>, stop: CancellationToken, threshold: Duration, check_interval: Duration, touch_url: String) {
	debug!(target = "twofa.keepalive", threshold_ms = threshold.as_millis() as u64, "keep-alive started");

	loop {
		tokio::select! {
			_ = stop.cancelled() => break,
			_ = tokio::time::sleep(check_interval) => {}
		}

		let Some(inner) = inner.upgrade() else {
			break;
		};

		let idle = inner.state.lock().idle_for();
		let Some(idle) = idle.filter(|idle| *idle >= threshold) else {
			continue;
		};

		debug!(target = "twofa.keepalive", idle_ms = idle.as_millis() as u64, "session idle; refreshing");
		let url = touch_url.clone();
		let result = inner
			.run_guarded(move |driver| Box::pin(async move { driver.navigate(&url).await.map_err(Error::from) }))
			.await;

		match result {
			Ok(()) => debug!(target = "twofa.keepalive", "session refreshed"),
			Err(Error::NotLoggedIn | Error::Disposed) => break,
			Err(err) => warn!(target = "twofa.keepalive", error = %err, "keep-alive refresh failed"),
		}
	}

	debug!(target = "twofa.keepalive", "keep-alive stopped");
}

//! Connection to the remote service: driver ownership, guarded execution and
//! teardown.
//!
//! # Locking
//!
//! | lock       | kind                | held across                                  |
//! |------------|---------------------|----------------------------------------------|
//! | `driver`   | `tokio::sync::Mutex`| every driver interaction, start to finish    |
//! | `flow`     | `tokio::sync::Mutex`| a whole login / logout / dispose sequence    |
//! | `disposed` | `tokio::sync::Mutex`| the dispose sequence                         |
//! | `state`    | `parking_lot::Mutex`| never across an `.await`                     |
//!
//! The driver is not safe for interleaved use, so the `driver` mutex is the
//! exclusive section for guarded actions and the keep-alive tick alike.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::BoxFuture;
use serde::Serialize;
use tokio::sync::MutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use twofa_runtime::{Driver, Launcher};

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::keepalive::KeepAlive;
use crate::poller::Poller;
use crate::state::{Phase, SessionSnapshot, SessionState};

pub(crate) struct Inner {
	pub(crate) driver: tokio::sync::Mutex<Box<dyn Driver>>,
	pub(crate) state: parking_lot::Mutex<SessionState>,
	pub(crate) keepalive: parking_lot::Mutex<Option<KeepAlive>>,
	pub(crate) keepalive_starts: AtomicU64,
	pub(crate) flow: tokio::sync::Mutex<()>,
	disposed: tokio::sync::Mutex<bool>,
	/// Connection lifetime; cancelled once, on disposal.
	pub(crate) cancel: CancellationToken,
	pub(crate) config: SessionConfig,
}

impl Drop for Inner {
	fn drop(&mut self) {
		self.cancel.cancel();
		if !*self.disposed.get_mut() {
			warn!(target = "twofa.session", "connection dropped without dispose; the driver session was not quit");
		}
	}
}

impl Inner {
	pub(crate) fn ensure_live(&self) -> Result<()> {
		if self.cancel.is_cancelled() {
			return Err(Error::Disposed);
		}
		self.state.lock().ensure_not_disposed()
	}

	pub(crate) fn poller<'a>(&'a self, cancel: &'a CancellationToken) -> Poller<'a> {
		Poller::new(cancel, self.config.timing.poll_interval())
	}

	/// Enters the exclusive driver section, giving up if `cancel` fires first.
	pub(crate) async fn lock_driver(&self, cancel: &CancellationToken) -> Result<MutexGuard<'_, Box<dyn Driver>>> {
		tokio::select! {
			biased;
			_ = cancel.cancelled() => Err(Error::Disposed),
			guard = self.driver.lock() => Ok(guard),
		}
	}

	pub(crate) async fn lock_flow(&self) -> Result<MutexGuard<'_, ()>> {
		let guard = tokio::select! {
			biased;
			_ = self.cancel.cancelled() => return Err(Error::Disposed),
			guard = self.flow.lock() => guard,
		};
		self.ensure_live()?;
		Ok(guard)
	}

	/// Runs `action` with exclusive access to the driver.
	///
	/// The idle timer is paused before queueing for the driver, so a waiting
	/// action never lets the keep-alive threshold fire, and reset to now when
	/// the action succeeds.
	pub(crate) async fn run_guarded<T, F>(&self, action: F) -> Result<T>
	where
		F: for<'d> FnOnce(&'d dyn Driver) -> BoxFuture<'d, Result<T>>,
	{
		if self.cancel.is_cancelled() {
			return Err(Error::Disposed);
		}
		{
			let mut state = self.state.lock();
			state.ensure_logged_in()?;
			state.pause_idle();
		}

		let result = self.run_exclusive(action).await;
		self.state.lock().resume_idle(result.is_ok());
		result
	}

	async fn run_exclusive<T, F>(&self, action: F) -> Result<T>
	where
		F: for<'d> FnOnce(&'d dyn Driver) -> BoxFuture<'d, Result<T>>,
	{
		let driver = self.lock_driver(&self.cancel).await?;
		// Logout may have completed while this action was queued
		self.state.lock().ensure_logged_in()?;
		action(&**driver).await
	}

	/// Whether the authenticated marker is on the current page.
	pub(crate) async fn marker_present(&self, driver: &dyn Driver, cancel: &CancellationToken) -> Result<bool> {
		let found = self
			.poller(cancel)
			.wait_for_elements(driver, &self.config.selectors.sign_out, self.config.timing.short_timeout())
			.await?;
		Ok(found.is_some())
	}

	pub(crate) async fn verify_authenticated(&self, cancel: &CancellationToken) -> Result<bool> {
		let driver = self.lock_driver(cancel).await?;
		self.marker_present(&**driver, cancel).await
	}

	/// Stops and joins the keep-alive task; `true` if one was running.
	pub(crate) async fn stop_keepalive(&self) -> bool {
		let task = self.keepalive.lock().take();
		match task {
			Some(task) => {
				task.stop().await;
				true
			}
			None => false,
		}
	}
}

/// Handle to the single live session of a process.
///
/// Cloning is cheap; all clones share one driver, one state and one
/// keep-alive task.
///
/// Dropping the last clone stops the keep-alive task but cannot quit the
/// driver, which needs an async call. Call [`Connection::dispose`] (or
/// [`ConnectionFactory::close`](crate::ConnectionFactory::close)) to end the
/// remote session.
#[derive(Clone)]
pub struct Connection {
	pub(crate) inner: Arc<Inner>,
}

/// Diagnostic view returned by [`Connection::snapshot`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSnapshot {
	#[serde(flatten)]
	pub session: SessionSnapshot,
	pub keepalive_running: bool,
	pub keepalive_starts: u64,
}

impl Connection {
	/// Wraps an already launched driver session. The connection starts
	/// logged out.
	pub fn new(driver: Box<dyn Driver>, config: SessionConfig) -> Self {
		Self {
			inner: Arc::new(Inner {
				driver: tokio::sync::Mutex::new(driver),
				state: parking_lot::Mutex::new(SessionState::new()),
				keepalive: parking_lot::Mutex::new(None),
				keepalive_starts: AtomicU64::new(0),
				flow: tokio::sync::Mutex::new(()),
				disposed: tokio::sync::Mutex::new(false),
				cancel: CancellationToken::new(),
				config,
			}),
		}
	}

	/// Launches a driver session and wraps it.
	pub async fn launch(launcher: &dyn Launcher, config: SessionConfig) -> Result<Self> {
		config.validate()?;
		let driver = launcher.launch().await?;
		Ok(Self::new(driver, config))
	}

	pub fn config(&self) -> &SessionConfig {
		&self.inner.config
	}

	pub fn phase(&self) -> Phase {
		self.inner.state.lock().phase()
	}

	pub fn is_disposed(&self) -> bool {
		self.inner.cancel.is_cancelled() || self.inner.state.lock().is_disposed()
	}

	pub fn snapshot(&self) -> ConnectionSnapshot {
		let session = self.inner.state.lock().snapshot();
		ConnectionSnapshot {
			session,
			keepalive_running: self.inner.keepalive.lock().is_some(),
			keepalive_starts: self.inner.keepalive_starts.load(Ordering::SeqCst),
		}
	}

	/// Runs a session-dependent action under exclusive driver access.
	///
	/// Fails with [`Error::Disposed`] after teardown and
	/// [`Error::NotLoggedIn`] unless the session is logged in.
	///
	/// ```ignore
	/// let title = connection
	///     .run_guarded(|driver| Box::pin(async move {
	///         driver.navigate("https://app.n26.com/account").await?;
	///         Ok(driver.find_element("h1").await?.is_some())
	///     }))
	///     .await?;
	/// ```
	pub async fn run_guarded<T, F>(&self, action: F) -> Result<T>
	where
		F: for<'d> FnOnce(&'d dyn Driver) -> BoxFuture<'d, Result<T>>,
	{
		self.inner.run_guarded(action).await
	}

	/// Navigates to `url` and returns the text of the first element matching
	/// `selector`, or `None` if it does not appear within the short timeout.
	pub async fn read_text(&self, url: &str, selector: &str) -> Result<Option<String>> {
		let inner = Arc::clone(&self.inner);
		let url = url.to_string();
		let selector = selector.to_string();
		self.inner
			.run_guarded(move |driver| {
				Box::pin(async move {
					driver.navigate(&url).await?;
					let found = inner
						.poller(&inner.cancel)
						.wait_for_elements(driver, &selector, inner.config.timing.short_timeout())
						.await?;
					let text = match found.as_deref().and_then(|elements| elements.first()) {
						Some(element) => Some(driver.text(element).await?),
						None => None,
					};
					Ok::<_, Error>(text)
				})
			})
			.await
	}

	/// Re-checks the authenticated marker on the live page.
	pub async fn is_logged_in(&self) -> Result<bool> {
		self.inner.ensure_live()?;
		self.inner.verify_authenticated(&self.inner.cancel).await
	}

	/// Tears the connection down: cancels in-flight waits, stops the
	/// keep-alive task, logs out and quits the driver.
	///
	/// Only the first call does anything; later and concurrent calls wait for
	/// it and return `Ok(())`.
	pub async fn dispose(&self) -> Result<()> {
		let inner = &self.inner;
		let mut disposed = inner.disposed.lock().await;
		if *disposed {
			return Ok(());
		}
		*disposed = true;

		debug!(target = "twofa.session", "disposing connection");
		inner.cancel.cancel();
		let _flow = inner.flow.lock().await;

		// In-flight waits are cancelled; the teardown itself still needs to poll.
		let teardown = CancellationToken::new();
		let logout = inner.logout_locked(&teardown).await;
		inner.state.lock().dispose();

		let quit = {
			let driver = inner.driver.lock().await;
			driver.quit().await
		};

		if let Err(err) = &logout {
			warn!(target = "twofa.session", error = %err, "logout during disposal failed");
		}
		if let Err(err) = &quit {
			warn!(target = "twofa.session", error = %err, "driver quit failed");
		}
		info!(target = "twofa.session", "connection disposed");

		logout?;
		quit?;
		Ok(())
	}
}

impl std::fmt::Debug for Connection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Connection").field("phase", &self.phase()).finish_non_exhaustive()
	}
}

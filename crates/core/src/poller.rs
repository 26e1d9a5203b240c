//! Readiness polling with timeout.
//!
//! The remote page gives no event when an asynchronous update lands ("PIN
//! rejected", "sign-out button rendered"), so every wait point probes the
//! driver at a fixed interval until a match shows up or the bound elapses.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use twofa_runtime::{Driver, Element};

use crate::error::{Error, Result};

/// Default delay between probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Bounded retry-with-sleep combinator bound to a connection's lifetime token.
#[derive(Debug, Clone, Copy)]
pub struct Poller<'a> {
	cancel: &'a CancellationToken,
	interval: Duration,
}

impl<'a> Poller<'a> {
	pub fn new(cancel: &'a CancellationToken, interval: Duration) -> Self {
		Self { cancel, interval }
	}

	/// Probes until `probe` yields `Some`, or `timeout` elapses.
	///
	/// The probe runs at least once, even with a zero timeout. A timeout is
	/// `Ok(None)`, not an error. Cancelling the token aborts the wait
	/// (including a probe in flight) with [`Error::Disposed`].
	pub async fn wait_until<T, F, Fut>(&self, timeout: Duration, mut probe: F) -> Result<Option<T>>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<Option<T>>>,
	{
		let start = Instant::now();

		loop {
			if self.cancel.is_cancelled() {
				return Err(Error::Disposed);
			}

			let found = tokio::select! {
				biased;
				_ = self.cancel.cancelled() => return Err(Error::Disposed),
				found = probe() => found?,
			};

			if found.is_some() {
				return Ok(found);
			}

			if start.elapsed() >= timeout {
				return Ok(None);
			}

			tokio::select! {
				_ = self.cancel.cancelled() => return Err(Error::Disposed),
				_ = tokio::time::sleep(self.interval) => {}
			}
		}
	}

	/// Waits for at least one element matching `selector`.
	pub async fn wait_for_elements(&self, driver: &dyn Driver, selector: &str, timeout: Duration) -> Result<Option<Vec<Element>>> {
		self.wait_until(timeout, move || elements_present(driver, selector)).await
	}

	/// Waits for whichever of `selectors` matches first.
	///
	/// Returns the index of the matching selector with its elements; earlier
	/// selectors win when several match in the same probe.
	pub async fn wait_for_any(&self, driver: &dyn Driver, selectors: &[&str], timeout: Duration) -> Result<Option<(usize, Vec<Element>)>> {
		self.wait_until(timeout, move || first_present(driver, selectors)).await
	}
}

/// Probe: the elements matching `selector`, or `None` while there are none.
pub async fn elements_present(driver: &dyn Driver, selector: &str) -> Result<Option<Vec<Element>>> {
	let elements = driver.find_elements(selector).await?;
	Ok(if elements.is_empty() { None } else { Some(elements) })
}

/// Probe: the first selector in `selectors` with at least one match.
pub async fn first_present(driver: &dyn Driver, selectors: &[&str]) -> Result<Option<(usize, Vec<Element>)>> {
	for (index, selector) in selectors.iter().enumerate() {
		if let Some(elements) = elements_present(driver, selector).await? {
			return Ok(Some((index, elements)));
		}
	}
	Ok(None)
}

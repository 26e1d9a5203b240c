//! Login / logout state machine.
//!
//! A login walks the remote surface step by step: consent prompt, country and
//! phone number, PIN, SMS challenge, authenticated landing page. Every wait
//! goes through the [`Poller`](crate::poller::Poller) and the whole walk holds
//! the driver section, so no guarded action can interleave with it.
//!
//! Rejections by the remote side come back as [`LoginOutcome`] values; only
//! misuse and transport failures are errors. Whatever happens, a failed login
//! leaves the connection logged out.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use twofa_runtime::{Driver, DriverError, Element};

use crate::connection::{Connection, Inner};
use crate::error::{Error, Result};
use crate::keepalive::KeepAlive;
use crate::outcome::LoginOutcome;
use crate::phone::{PhoneNumber, four_digits};
use crate::poller::Poller;
use crate::state::Phase;

/// DOM helper injected into the login page before any scripted field update.
const HELPER_SCRIPT: &str = r#"window.__twofa = window.__twofa || {
  setValue: function (selector, value) {
    var el = document.querySelector(selector);
    if (!el) { return false; }
    el.value = value;
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
  }
};
return true;"#;

const SET_VALUE_SCRIPT: &str = "return window.__twofa.setValue(arguments[0], arguments[1]);";

impl Connection {
	/// Logs in with `phone`, `pin` and an SMS code obtained from `challenge`.
	///
	/// `pin` and the code are reduced to their low four decimal digits.
	/// `challenge` runs on the blocking pool, so it may read from a terminal;
	/// disposing the connection abandons it.
	///
	/// Re-login with the credentials of the live session is a no-op returning
	/// [`LoginOutcome::Success`], provided the page still shows the
	/// authenticated marker. Any other login while logged in logs out first.
	pub async fn login<P>(&self, phone: &str, pin: u32, challenge: P) -> Result<LoginOutcome>
	where
		P: FnOnce() -> std::io::Result<u32> + Send + 'static,
	{
		let inner = &self.inner;
		let _flow = inner.lock_flow().await?;

		let phone = match PhoneNumber::parse(phone) {
			Ok(phone) => phone,
			Err(err) => {
				info!(target = "twofa.session", error = %err, "phone number rejected");
				return Ok(LoginOutcome::InvalidCredentialFormat);
			}
		};
		let fingerprint = phone.fingerprint();

		let (phase, current) = {
			let state = inner.state.lock();
			(state.phase(), state.fingerprint().cloned())
		};
		if phase == Phase::LoggedIn {
			if current.as_ref() == Some(&fingerprint) && inner.verify_authenticated(&inner.cancel).await? {
				debug!(target = "twofa.session", %fingerprint, "already logged in");
				return Ok(LoginOutcome::Success);
			}
			info!(target = "twofa.session", %fingerprint, "switching session");
			inner.logout_locked(&inner.cancel).await?;
		}

		inner.state.lock().begin_authentication(fingerprint.clone())?;
		let pending = PendingLogin { inner };
		debug!(target = "twofa.session", %fingerprint, "authenticating");

		match inner.authenticate(&phone, pin, challenge).await {
			Ok(LoginOutcome::Success) => {
				inner.state.lock().complete_login()?;
				pending.complete();
				inner.start_keepalive();
				info!(target = "twofa.session", %fingerprint, "logged in");
				Ok(LoginOutcome::Success)
			}
			Ok(outcome) => {
				info!(target = "twofa.session", %fingerprint, %outcome, "login failed");
				Ok(outcome)
			}
			Err(err) => {
				warn!(target = "twofa.session", %fingerprint, error = %err, "login aborted");
				Err(err)
			}
		}
	}

	/// Signs out of the live session.
	///
	/// Returns `true` if a session was torn down, `false` if there was none.
	pub async fn logout(&self) -> Result<bool> {
		let _flow = self.inner.lock_flow().await?;
		self.inner.logout_locked(&self.inner.cancel).await
	}
}

/// Returns the session to `LoggedOut` unless the login completes, including
/// when the login future is dropped halfway through the walk.
struct PendingLogin<'a> {
	inner: &'a Arc<Inner>,
}

impl PendingLogin<'_> {
	fn complete(self) {
		std::mem::forget(self);
	}
}

impl Drop for PendingLogin<'_> {
	fn drop(&mut self) {
		self.inner.state.lock().reset();
	}
}

impl Inner {
	async fn authenticate<P>(&self, phone: &PhoneNumber, pin: u32, challenge: P) -> Result<LoginOutcome>
	where
		P: FnOnce() -> std::io::Result<u32> + Send + 'static,
	{
		let cancel = &self.cancel;
		let guard = self.lock_driver(cancel).await?;
		let driver: &dyn Driver = &**guard;
		let poller = self.poller(cancel);
		let selectors = &self.config.selectors;
		let timing = &self.config.timing;

		driver.navigate(&self.config.urls.login).await?;

		let Some((index, elements)) = poller
			.wait_for_any(driver, &[selectors.consent_button.as_str(), selectors.phone_input.as_str()], timing.login_timeout())
			.await?
		else {
			debug!(target = "twofa.session", "login surface did not load");
			return Ok(LoginOutcome::Timeout);
		};
		if index == 0 {
			if let Some(consent) = elements.first() {
				driver.click(consent).await?;
			}
		}

		let Some(phone_input) = first_match(&poller, driver, &selectors.phone_input, timing.short_timeout()).await? else {
			return Ok(LoginOutcome::Timeout);
		};

		driver.execute_script(HELPER_SCRIPT, Vec::new()).await?;
		let selected = driver
			.execute_script(SET_VALUE_SCRIPT, vec![json!(selectors.country_select), json!(format!("+{}", phone.country_code()))])
			.await?;
		if selected != json!(true) {
			debug!(target = "twofa.session", "country selector missing");
			return Ok(LoginOutcome::Timeout);
		}

		driver.send_keys(&phone_input, phone.national()).await?;
		self.click_first(&poller, driver, &selectors.phone_submit).await?;

		let Some(pin_input) = first_match(&poller, driver, &selectors.pin_input, timing.login_timeout()).await? else {
			return Ok(LoginOutcome::Timeout);
		};
		driver.send_keys(&pin_input, &four_digits(pin)).await?;
		self.click_first(&poller, driver, &selectors.pin_submit).await?;

		let Some((index, slots)) = poller
			.wait_for_any(driver, &[selectors.pin_error.as_str(), selectors.challenge_inputs.as_str()], timing.short_timeout())
			.await?
		else {
			return Ok(LoginOutcome::Timeout);
		};
		if index == 0 {
			return Ok(LoginOutcome::WrongPin);
		}

		self.state.lock().await_challenge()?;
		debug!(target = "twofa.session", "waiting for challenge code");
		let code = four_digits(request_challenge(cancel, challenge).await?);
		fill_challenge(driver, &slots, &code).await?;

		let verdict = poller
			.wait_for_any(driver, &[selectors.challenge_error.as_str(), selectors.sign_out.as_str()], timing.short_timeout())
			.await?;
		if matches!(verdict, Some((0, _))) {
			return Ok(LoginOutcome::WrongChallengeCode);
		}

		driver.navigate(&self.config.urls.account).await?;
		let marker = poller.wait_for_elements(driver, &selectors.sign_out, timing.login_timeout()).await?;
		Ok(if marker.is_some() { LoginOutcome::Success } else { LoginOutcome::Timeout })
	}

	async fn click_first(&self, poller: &Poller<'_>, driver: &dyn Driver, selector: &str) -> Result<()> {
		match first_match(poller, driver, selector, self.config.timing.short_timeout()).await? {
			Some(element) => Ok(driver.click(&element).await?),
			None => Err(DriverError::NoSuchElement(selector.to_string()).into()),
		}
	}

	/// Starts the keep-alive task for a freshly logged-in session.
	pub(crate) fn start_keepalive(self: &Arc<Self>) {
		let task = KeepAlive::spawn(Arc::downgrade(self), &self.cancel, &self.config);
		let previous = self.keepalive.lock().replace(task);
		debug_assert!(previous.is_none(), "keep-alive already running");
		self.keepalive_starts.fetch_add(1, Ordering::SeqCst);
	}

	/// Tears the session down. Caller holds the flow lock.
	///
	/// The keep-alive task is joined before the driver section is taken, so a
	/// tick waiting for the driver can never wait on this logout.
	pub(crate) async fn logout_locked(&self, cancel: &CancellationToken) -> Result<bool> {
		let was_logged_in = {
			let mut state = self.state.lock();
			state.pause_idle();
			state.phase() == Phase::LoggedIn
		};

		self.stop_keepalive().await;
		let result = if was_logged_in { self.sign_out(cancel).await } else { Ok(false) };

		{
			let mut state = self.state.lock();
			state.resume_idle(false);
			state.reset();
		}

		let signed_out = result?;
		if was_logged_in {
			info!(target = "twofa.session", signed_out, "logged out");
		}
		Ok(was_logged_in)
	}

	async fn sign_out(&self, cancel: &CancellationToken) -> Result<bool> {
		let guard = self.lock_driver(cancel).await?;
		let driver: &dyn Driver = &**guard;
		let poller = self.poller(cancel);
		let Some(button) = first_match(&poller, driver, &self.config.selectors.sign_out, self.config.timing.short_timeout()).await? else {
			debug!(target = "twofa.session", "sign-out control not present; session already gone remotely");
			return Ok(false);
		};
		driver.click(&button).await?;
		driver.navigate(&self.config.urls.logged_out).await?;
		Ok(true)
	}
}

async fn first_match(poller: &Poller<'_>, driver: &dyn Driver, selector: &str, timeout: std::time::Duration) -> Result<Option<Element>> {
	let found = poller.wait_for_elements(driver, selector, timeout).await?;
	Ok(found.and_then(|elements| elements.into_iter().next()))
}

/// Runs the challenge provider off the async workers.
async fn request_challenge<P>(cancel: &CancellationToken, challenge: P) -> Result<u32>
where
	P: FnOnce() -> std::io::Result<u32> + Send + 'static,
{
	let task = tokio::task::spawn_blocking(challenge);
	tokio::select! {
		biased;
		_ = cancel.cancelled() => Err(Error::Disposed),
		joined = task => match joined {
			Ok(Ok(code)) => Ok(code),
			Ok(Err(err)) => Err(Error::Challenge(err)),
			Err(err) => Err(Error::ChallengeAborted(err.to_string())),
		},
	}
}

/// One digit per slot when the page renders a field per digit, otherwise the
/// whole code into the single field.
async fn fill_challenge(driver: &dyn Driver, slots: &[Element], code: &str) -> Result<()> {
	if slots.len() >= code.len() {
		for (slot, digit) in slots.iter().zip(code.chars()) {
			driver.send_keys(slot, &digit.to_string()).await?;
		}
	} else if let Some(field) = slots.first() {
		driver.send_keys(field, code).await?;
	}
	Ok(())
}

//! Scripted in-memory driver for exercising the session core without a browser.
//!
//! [`FakeDriver`] models the login surface described by a [`SessionConfig`]:
//! which selectors are present depends on the current page and login step,
//! clicks and typed keys advance the step, and the site accepts exactly the
//! PIN and challenge code it was built with.
//!
//! # Example
//!
//! ```ignore
//! let config = SessionConfig::default();
//! let driver = FakeDriver::new(FakeSite::new(1488, 4321), &config);
//! let connection = Connection::new(Box::new(driver.clone()), config);
//!
//! let outcome = connection.login("+491776200214", 1488, || Ok(4321)).await?;
//! assert_eq!(outcome, LoginOutcome::Success);
//! assert_eq!(driver.quit_count(), 0);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use twofa_runtime::{Driver, DriverError, Element, Launcher};

use crate::config::{SessionConfig, Selectors, SiteUrls};
use crate::phone::four_digits;

type DriverResult<T> = twofa_runtime::Result<T>;

/// Behaviour of the simulated remote site.
#[derive(Debug, Clone)]
pub struct FakeSite {
	pin: String,
	code: String,
	consent_prompt: bool,
	authenticates: bool,
	challenge_slots: usize,
	texts: HashMap<String, String>,
}

impl FakeSite {
	/// A site accepting `pin` and SMS `code` (both reduced to four digits).
	pub fn new(pin: u32, code: u32) -> Self {
		Self {
			pin: four_digits(pin),
			code: four_digits(code),
			consent_prompt: true,
			authenticates: true,
			challenge_slots: 4,
			texts: HashMap::new(),
		}
	}

	/// Whether the first visit shows the data-consent banner.
	pub fn consent_prompt(mut self, shown: bool) -> Self {
		self.consent_prompt = shown;
		self
	}

	/// Accepts the challenge but never renders the authenticated marker.
	pub fn never_authenticates(mut self) -> Self {
		self.authenticates = false;
		self
	}

	/// Number of challenge input fields; `1` means a single field for the
	/// whole code.
	pub fn challenge_slots(mut self, slots: usize) -> Self {
		self.challenge_slots = slots.max(1);
		self
	}

	/// Static text shown on the account page while authenticated.
	pub fn with_text(mut self, selector: impl Into<String>, text: impl Into<String>) -> Self {
		self.texts.insert(selector.into(), text.into());
		self
	}
}

/// One recorded driver interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
	Navigate(String),
	Click(String),
	SendKeys { selector: String, text: String },
	Script(String),
	Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
	Blank,
	Login,
	Account,
	LoggedOut,
	Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
	Consent,
	Phone,
	Pin,
	PinRejected,
	Challenge,
	ChallengeRejected,
}

#[derive(Debug)]
struct SiteState {
	page: Page,
	step: Step,
	consent_accepted: bool,
	authenticated: bool,
	country: Option<String>,
	phone: String,
	pin: String,
	challenge: String,
	helper_injected: bool,
}

struct Shared {
	site: FakeSite,
	selectors: Selectors,
	urls: SiteUrls,
	state: Mutex<SiteState>,
	calls: Mutex<Vec<FakeCall>>,
	delay: Mutex<Duration>,
	finds: AtomicUsize,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
	quits: AtomicUsize,
}

/// In-memory [`Driver`]. Clones share the same simulated browser, so a test
/// can keep one clone for inspection after handing another to a connection.
#[derive(Clone)]
pub struct FakeDriver {
	shared: Arc<Shared>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.0.fetch_sub(1, Ordering::SeqCst);
	}
}

impl FakeDriver {
	pub fn new(site: FakeSite, config: &SessionConfig) -> Self {
		Self {
			shared: Arc::new(Shared {
				site,
				selectors: config.selectors.clone(),
				urls: config.urls.clone(),
				state: Mutex::new(SiteState {
					page: Page::Blank,
					step: Step::Phone,
					consent_accepted: false,
					authenticated: false,
					country: None,
					phone: String::new(),
					pin: String::new(),
					challenge: String::new(),
					helper_injected: false,
				}),
				calls: Mutex::new(Vec::new()),
				delay: Mutex::new(Duration::ZERO),
				finds: AtomicUsize::new(0),
				in_flight: AtomicUsize::new(0),
				max_in_flight: AtomicUsize::new(0),
				quits: AtomicUsize::new(0),
			}),
		}
	}

	/// Makes every driver call take at least `delay`.
	pub fn set_call_delay(&self, delay: Duration) {
		*self.shared.delay.lock() = delay;
	}

	/// Drops the remote session, as a server-side timeout would.
	pub fn expire_session(&self) {
		self.shared.state.lock().authenticated = false;
	}

	pub fn is_authenticated(&self) -> bool {
		self.shared.state.lock().authenticated
	}

	/// Country code last selected through the injected helper.
	pub fn selected_country(&self) -> Option<String> {
		self.shared.state.lock().country.clone()
	}

	/// Phone number typed into the phone field.
	pub fn typed_phone(&self) -> String {
		self.shared.state.lock().phone.clone()
	}

	pub fn calls(&self) -> Vec<FakeCall> {
		self.shared.calls.lock().clone()
	}

	/// Number of recorded navigations to `url`.
	pub fn navigations_to(&self, url: &str) -> usize {
		self.shared.calls.lock().iter().filter(|call| matches!(call, FakeCall::Navigate(target) if target == url)).count()
	}

	pub fn clear_calls(&self) {
		self.shared.calls.lock().clear();
	}

	pub fn find_count(&self) -> usize {
		self.shared.finds.load(Ordering::SeqCst)
	}

	/// Highest number of driver calls ever observed running at once.
	pub fn max_in_flight(&self) -> usize {
		self.shared.max_in_flight.load(Ordering::SeqCst)
	}

	pub fn quit_count(&self) -> usize {
		self.shared.quits.load(Ordering::SeqCst)
	}

	async fn enter(&self) -> DriverResult<InFlight<'_>> {
		if self.shared.quits.load(Ordering::SeqCst) > 0 {
			return Err(DriverError::SessionClosed);
		}
		let current = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.shared.max_in_flight.fetch_max(current, Ordering::SeqCst);
		let guard = InFlight(&self.shared.in_flight);

		let delay = *self.shared.delay.lock();
		if !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}
		Ok(guard)
	}

	fn record(&self, call: FakeCall) {
		self.shared.calls.lock().push(call);
	}

	/// Selectors currently on the page, with their element counts.
	fn visible(&self, state: &SiteState) -> Vec<(&str, usize)> {
		let s = &self.shared.selectors;
		let mut visible = Vec::new();
		match state.page {
			Page::Login => match state.step {
				Step::Consent => visible.push((s.consent_button.as_str(), 1)),
				Step::Phone => {
					visible.push((s.country_select.as_str(), 1));
					visible.push((s.phone_input.as_str(), 1));
					visible.push((s.phone_submit.as_str(), 1));
				}
				Step::Pin => {
					visible.push((s.pin_input.as_str(), 1));
					visible.push((s.pin_submit.as_str(), 1));
				}
				Step::PinRejected => visible.push((s.pin_error.as_str(), 1)),
				Step::Challenge => visible.push((s.challenge_inputs.as_str(), self.shared.site.challenge_slots)),
				Step::ChallengeRejected => visible.push((s.challenge_error.as_str(), 1)),
			},
			Page::Account if state.authenticated => {
				visible.extend(self.shared.site.texts.keys().map(|selector| (selector.as_str(), 1)));
			}
			_ => {}
		}
		if state.authenticated && state.page != Page::LoggedOut {
			visible.push((s.sign_out.as_str(), 1));
		}
		visible
	}

	fn matching(&self, selector: &str) -> Vec<Element> {
		let state = self.shared.state.lock();
		let count = self
			.visible(&state)
			.into_iter()
			.filter(|(visible, _)| *visible == selector)
			.map(|(_, count)| count)
			.max()
			.unwrap_or(0);
		(0..count).map(|index| Element::new(format!("{selector}#{index}"), selector)).collect()
	}

	fn missing(&self, element: &Element) -> DriverError {
		DriverError::NoSuchElement(element.selector().to_string())
	}
}

#[async_trait]
impl Driver for FakeDriver {
	async fn navigate(&self, url: &str) -> DriverResult<()> {
		let _guard = self.enter().await?;
		self.record(FakeCall::Navigate(url.to_string()));

		let urls = &self.shared.urls;
		let mut state = self.shared.state.lock();
		state.helper_injected = false;
		state.page = if url == urls.login {
			Page::Login
		} else if url == urls.account {
			Page::Account
		} else if url == urls.logged_out {
			Page::LoggedOut
		} else {
			Page::Other
		};
		if state.page == Page::Login {
			state.step = if self.shared.site.consent_prompt && !state.consent_accepted { Step::Consent } else { Step::Phone };
			state.phone.clear();
			state.pin.clear();
			state.challenge.clear();
		}
		Ok(())
	}

	async fn find_element(&self, selector: &str) -> DriverResult<Option<Element>> {
		Ok(self.find_elements(selector).await?.into_iter().next())
	}

	async fn find_elements(&self, selector: &str) -> DriverResult<Vec<Element>> {
		let _guard = self.enter().await?;
		self.shared.finds.fetch_add(1, Ordering::SeqCst);
		Ok(self.matching(selector))
	}

	async fn click(&self, element: &Element) -> DriverResult<()> {
		let _guard = self.enter().await?;
		if self.matching(element.selector()).is_empty() {
			return Err(self.missing(element));
		}
		self.record(FakeCall::Click(element.selector().to_string()));

		let site = &self.shared.site;
		let s = &self.shared.selectors;
		let selector = element.selector();
		let mut state = self.shared.state.lock();
		match state.step {
			Step::Consent if state.page == Page::Login && selector == s.consent_button => {
				state.consent_accepted = true;
				state.step = Step::Phone;
			}
			Step::Phone if state.page == Page::Login && selector == s.phone_submit => {
				state.step = Step::Pin;
			}
			Step::Pin if state.page == Page::Login && selector == s.pin_submit => {
				state.step = if state.pin == site.pin { Step::Challenge } else { Step::PinRejected };
			}
			_ if selector == s.sign_out => {
				state.authenticated = false;
			}
			_ => {}
		}
		Ok(())
	}

	async fn send_keys(&self, element: &Element, text: &str) -> DriverResult<()> {
		let _guard = self.enter().await?;
		if self.matching(element.selector()).is_empty() {
			return Err(self.missing(element));
		}
		self.record(FakeCall::SendKeys {
			selector: element.selector().to_string(),
			text: text.to_string(),
		});

		let site = &self.shared.site;
		let s = &self.shared.selectors;
		let selector = element.selector();
		let mut state = self.shared.state.lock();
		if selector == s.phone_input {
			state.phone.push_str(text);
		} else if selector == s.pin_input {
			state.pin.push_str(text);
		} else if selector == s.challenge_inputs {
			state.challenge.push_str(text);
			if state.challenge.len() >= 4 {
				if state.challenge == site.code {
					state.authenticated = site.authenticates;
				} else {
					state.step = Step::ChallengeRejected;
				}
			}
		}
		Ok(())
	}

	async fn text(&self, element: &Element) -> DriverResult<String> {
		let _guard = self.enter().await?;
		Ok(self.shared.site.texts.get(element.selector()).cloned().unwrap_or_default())
	}

	async fn execute_script(&self, script: &str, args: Vec<Value>) -> DriverResult<Value> {
		let _guard = self.enter().await?;
		self.record(FakeCall::Script(script.to_string()));

		let mut state = self.shared.state.lock();
		if script.contains("window.__twofa = ") {
			state.helper_injected = true;
			return Ok(json!(true));
		}
		if script.contains("__twofa.setValue") {
			if !state.helper_injected {
				return Err(DriverError::Remote {
					code: "javascript error".to_string(),
					message: "window.__twofa is undefined".to_string(),
				});
			}
			let target = args.first().and_then(Value::as_str);
			let value = args.get(1).and_then(Value::as_str);
			let on_form = state.page == Page::Login && state.step == Step::Phone;
			return Ok(match (target, value) {
				(Some(target), Some(value)) if on_form && target == self.shared.selectors.country_select => {
					state.country = Some(value.to_string());
					json!(true)
				}
				_ => json!(false),
			});
		}
		Ok(Value::Null)
	}

	async fn quit(&self) -> DriverResult<()> {
		self.shared.quits.fetch_add(1, Ordering::SeqCst);
		self.record(FakeCall::Quit);
		Ok(())
	}
}

/// [`Launcher`] handing out fresh [`FakeDriver`]s for one site.
pub struct FakeLauncher {
	site: FakeSite,
	config: SessionConfig,
	launched: Mutex<Vec<FakeDriver>>,
}

impl FakeLauncher {
	pub fn new(site: FakeSite, config: SessionConfig) -> Self {
		Self {
			site,
			config,
			launched: Mutex::new(Vec::new()),
		}
	}

	/// Every driver launched so far, oldest first.
	pub fn launched(&self) -> Vec<FakeDriver> {
		self.launched.lock().clone()
	}
}

#[async_trait]
impl Launcher for FakeLauncher {
	async fn launch(&self) -> DriverResult<Box<dyn Driver>> {
		let driver = FakeDriver::new(self.site.clone(), &self.config);
		self.launched.lock().push(driver.clone());
		Ok(Box::new(driver))
	}
}

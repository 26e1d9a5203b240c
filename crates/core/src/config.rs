//! Site configuration: URLs, selectors and timing.
//!
//! Every field has a default matching the reference service, so a config file
//! only needs the values it overrides:
//!
//! ```json
//! {
//!   "timing": { "idleThresholdMs": 120000 },
//!   "selectors": { "signOut": "#logout" }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
	pub urls: SiteUrls,
	pub selectors: Selectors,
	pub timing: Timing,
}

impl SessionConfig {
	/// Loads a JSON config file; missing fields fall back to defaults.
	pub fn from_file(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)?;
		let config: Self = serde_json::from_str(&content)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		let t = &self.timing;
		if t.poll_interval_ms == 0 {
			return Err(Error::Config("timing.pollIntervalMs must be greater than zero".to_string()));
		}
		if t.keepalive_check_ms == 0 {
			return Err(Error::Config("timing.keepaliveCheckMs must be greater than zero".to_string()));
		}
		if t.idle_threshold_ms <= t.keepalive_check_ms {
			return Err(Error::Config("timing.idleThresholdMs must exceed timing.keepaliveCheckMs".to_string()));
		}
		for (name, url) in [("login", &self.urls.login), ("account", &self.urls.account), ("loggedOut", &self.urls.logged_out)] {
			if url.trim().is_empty() {
				return Err(Error::Config(format!("urls.{name} must not be empty")));
			}
		}
		Ok(())
	}
}

/// Pages the login flow navigates to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteUrls {
	/// Login surface.
	pub login: String,
	/// Authenticated landing page; also reloaded by the keep-alive task.
	pub account: String,
	/// Where the browser is sent after signing out.
	pub logged_out: String,
}

impl Default for SiteUrls {
	fn default() -> Self {
		Self {
			login: "https://app.n26.com/login".to_string(),
			account: "https://app.n26.com/account".to_string(),
			logged_out: "https://n26.com/".to_string(),
		}
	}
}

/// CSS selectors for the login surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Selectors {
	pub consent_button: String,
	pub country_select: String,
	pub phone_input: String,
	pub phone_submit: String,
	pub pin_input: String,
	pub pin_submit: String,
	pub pin_error: String,
	/// One input per challenge digit.
	pub challenge_inputs: String,
	pub challenge_error: String,
	/// Only selectable while authenticated.
	pub sign_out: String,
}

impl Default for Selectors {
	fn default() -> Self {
		Self {
			consent_button: "#uc-btn-accept-banner".to_string(),
			country_select: "select[name='countryCode']".to_string(),
			phone_input: "input[name='phoneNumber']".to_string(),
			phone_submit: "button[type='submit']".to_string(),
			pin_input: "input[name='pin']".to_string(),
			pin_submit: "button[type='submit']".to_string(),
			pin_error: "[data-testid='pin-error']".to_string(),
			challenge_inputs: "input[data-testid^='otp-digit']".to_string(),
			challenge_error: "[data-testid='otp-error']".to_string(),
			sign_out: "[data-testid='logout-button']".to_string(),
		}
	}
}

/// Timing knobs, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timing {
	/// Delay between readiness probes.
	pub poll_interval_ms: u64,
	/// Bound for error indicators and quick state checks.
	pub short_timeout_ms: u64,
	/// Bound for the authenticated marker after the challenge.
	pub login_timeout_ms: u64,
	/// Inactivity after which the keep-alive task touches the session.
	pub idle_threshold_ms: u64,
	/// How often the keep-alive task re-checks idle time.
	pub keepalive_check_ms: u64,
}

impl Default for Timing {
	fn default() -> Self {
		Self {
			poll_interval_ms: 150,
			short_timeout_ms: 5_000,
			login_timeout_ms: 30_000,
			idle_threshold_ms: 180_000,
			keepalive_check_ms: 1_000,
		}
	}
}

impl Timing {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn short_timeout(&self) -> Duration {
		Duration::from_millis(self.short_timeout_ms)
	}

	pub fn login_timeout(&self) -> Duration {
		Duration::from_millis(self.login_timeout_ms)
	}

	pub fn idle_threshold(&self) -> Duration {
		Duration::from_millis(self.idle_threshold_ms)
	}

	pub fn keepalive_check(&self) -> Duration {
		Duration::from_millis(self.keepalive_check_ms)
	}
}

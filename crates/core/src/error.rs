use thiserror::Error;
use twofa_runtime::DriverError;

/// Hard errors raised by the session core.
///
/// Expected authentication failures (bad phone format, wrong PIN, wrong SMS
/// code, timeouts) are not errors: they come back as
/// [`LoginOutcome`](crate::LoginOutcome) values.
#[derive(Debug, Error)]
pub enum Error {
	#[error("Connection has been disposed")]
	Disposed,

	#[error("No authenticated session; log in first")]
	NotLoggedIn,

	#[error("Driver error: {0}")]
	Driver(#[from] DriverError),

	#[error("Challenge provider failed: {0}")]
	Challenge(#[source] std::io::Error),

	#[error("Challenge provider aborted: {0}")]
	ChallengeAborted(String),

	#[error("Invalid configuration: {0}")]
	Config(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Caller misuse rather than a remote or transport failure.
	pub fn is_usage_error(&self) -> bool {
		matches!(self, Error::Disposed | Error::NotLoggedIn)
	}
}

pub type Result<T> = std::result::Result<T, Error>;

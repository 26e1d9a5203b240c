//! Response envelopes.
//!
//! Every WebDriver response wraps its payload in a `value` member. Failures use
//! the same envelope with an error object:
//!
//! ```json
//! {
//!   "value": {
//!     "error": "no such element",
//!     "message": "Unable to locate element: #pin",
//!     "stacktrace": "..."
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Generic `{ "value": T }` wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueEnvelope<T> {
	pub value: T,
}

/// Error details carried in a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Error code, e.g. "no such element", "invalid session id"
	pub error: String,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stacktrace: Option<String>,
}

impl ErrorBody {
	pub fn is_no_such_element(&self) -> bool {
		self.error == "no such element"
	}

	pub fn is_invalid_session(&self) -> bool {
		self.error == "invalid session id"
	}
}

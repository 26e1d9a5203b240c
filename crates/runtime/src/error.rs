use thiserror::Error;
use twofa_protocol::ErrorBody;

/// Errors raised while talking to the remote driver.
#[derive(Debug, Error)]
pub enum DriverError {
	#[error("HTTP transport error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Invalid driver URL: {0}")]
	Url(#[from] url::ParseError),

	#[error("No such element: {0}")]
	NoSuchElement(String),

	#[error("Driver session is closed")]
	SessionClosed,

	#[error("Driver returned {code}: {message}")]
	Remote { code: String, message: String },

	#[error("Unexpected driver response: {0}")]
	InvalidResponse(String),
}

impl From<ErrorBody> for DriverError {
	fn from(body: ErrorBody) -> Self {
		if body.is_no_such_element() {
			DriverError::NoSuchElement(body.message)
		} else if body.is_invalid_session() {
			DriverError::SessionClosed
		} else {
			DriverError::Remote {
				code: body.error,
				message: body.message,
			}
		}
	}
}

pub type Result<T> = std::result::Result<T, DriverError>;

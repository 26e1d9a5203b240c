use thiserror::Error;
use twofa::LoginOutcome;

use crate::output::ErrorCode;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Session(#[from] twofa::Error),

	#[error(transparent)]
	Driver(#[from] twofa::DriverError),

	#[error("Login failed: {0}")]
	Login(LoginOutcome),

	#[error("Invalid input: {0}")]
	InvalidInput(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Interrupted before the session was established")]
	Interrupted,
}

impl CliError {
	/// Envelope code for this failure.
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::Session(twofa::Error::Driver(_)) | CliError::Driver(_) => ErrorCode::DriverError,
			CliError::Session(twofa::Error::Config(_) | twofa::Error::Json(_)) => ErrorCode::ConfigError,
			CliError::Session(twofa::Error::Io(_)) | CliError::Io(_) => ErrorCode::IoError,
			CliError::Session(twofa::Error::Challenge(_) | twofa::Error::ChallengeAborted(_)) => ErrorCode::InvalidInput,
			CliError::Session(_) => ErrorCode::SessionError,
			CliError::Login(outcome) => ErrorCode::from(*outcome),
			CliError::InvalidInput(_) => ErrorCode::InvalidInput,
			CliError::Interrupted => ErrorCode::Interrupted,
		}
	}
}

pub type Result<T> = std::result::Result<T, CliError>;

use std::path::PathBuf;

use serde::Serialize;
use twofa::{ConnectionSnapshot, LoginOutcome};

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

/// The envelope every command prints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub inputs: Option<CommandInputs>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub diagnostics: Vec<Diagnostic>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub config: Option<EffectiveConfig>,
}

/// Inputs echoed back in the envelope. Phone numbers are masked.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInputs {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pin_source: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

/// Stable error codes for scripts consuming the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	InvalidInput,
	InvalidCredentialFormat,
	WrongPin,
	WrongChallengeCode,
	Timeout,
	DriverError,
	SessionError,
	ConfigError,
	IoError,
	Interrupted,
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::InvalidCredentialFormat => write!(f, "INVALID_CREDENTIAL_FORMAT"),
			ErrorCode::WrongPin => write!(f, "WRONG_PIN"),
			ErrorCode::WrongChallengeCode => write!(f, "WRONG_CHALLENGE_CODE"),
			ErrorCode::Timeout => write!(f, "TIMEOUT"),
			ErrorCode::DriverError => write!(f, "DRIVER_ERROR"),
			ErrorCode::SessionError => write!(f, "SESSION_ERROR"),
			ErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::Interrupted => write!(f, "INTERRUPTED"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

impl From<LoginOutcome> for ErrorCode {
	fn from(outcome: LoginOutcome) -> Self {
		match outcome {
			LoginOutcome::InvalidCredentialFormat => ErrorCode::InvalidCredentialFormat,
			LoginOutcome::WrongPin => ErrorCode::WrongPin,
			LoginOutcome::WrongChallengeCode => ErrorCode::WrongChallengeCode,
			LoginOutcome::Timeout => ErrorCode::Timeout,
			LoginOutcome::Success => ErrorCode::InternalError,
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
	pub level: DiagnosticLevel,
	pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
	Info,
	Warning,
}

/// Connection settings a command ran with.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
	pub webdriver: String,
	pub headless: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub config_path: Option<PathBuf>,
}

/// Payload of `check-phone`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneData {
	pub country_code: String,
	pub fingerprint: String,
}

/// Payload of `login`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
	pub outcome: LoginOutcome,
	pub session: ConnectionSnapshot,
	/// Whether the session was torn down cleanly on exit.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub logged_out: Option<bool>,
}

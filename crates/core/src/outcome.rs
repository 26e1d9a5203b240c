use serde::Serialize;

/// Result of one login attempt.
///
/// These are expected branches of normal operation and are returned, never
/// raised. A failed attempt is never retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginOutcome {
	Success,
	/// Malformed or unsupported phone number; rejected locally.
	InvalidCredentialFormat,
	WrongPin,
	WrongChallengeCode,
	/// An expected page state never appeared within its bound.
	Timeout,
}

impl LoginOutcome {
	pub fn is_success(self) -> bool {
		self == LoginOutcome::Success
	}
}

impl std::fmt::Display for LoginOutcome {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let text = match self {
			LoginOutcome::Success => "success",
			LoginOutcome::InvalidCredentialFormat => "invalid credential format",
			LoginOutcome::WrongPin => "wrong PIN",
			LoginOutcome::WrongChallengeCode => "wrong challenge code",
			LoginOutcome::Timeout => "timed out",
		};
		f.write_str(text)
	}
}

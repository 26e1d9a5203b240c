//! Authoritative session state and idle timer.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::phone::Fingerprint;

/// Authentication phase of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
	LoggedOut,
	Authenticating,
	AwaitingChallenge,
	LoggedIn,
	/// Terminal.
	Disposed,
}

impl Phase {
	/// Phases that carry a credential fingerprint.
	pub fn holds_credentials(self) -> bool {
		matches!(self, Phase::Authenticating | Phase::AwaitingChallenge | Phase::LoggedIn)
	}
}

impl std::fmt::Display for Phase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Phase::LoggedOut => "logged_out",
			Phase::Authenticating => "authenticating",
			Phase::AwaitingChallenge => "awaiting_challenge",
			Phase::LoggedIn => "logged_in",
			Phase::Disposed => "disposed",
		};
		f.write_str(name)
	}
}

/// Point-in-time view of a session, for diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
	pub phase: Phase,
	/// Masked on serialization.
	pub fingerprint: Option<Fingerprint>,
	pub idle_ms: u64,
	pub pending_actions: usize,
}

/// Phase, credential fingerprint and last-activity timestamp.
///
/// Transitions are methods so the fingerprint invariant (present iff
/// [`Phase::holds_credentials`]) cannot be broken from outside.
#[derive(Debug)]
pub struct SessionState {
	phase: Phase,
	fingerprint: Option<Fingerprint>,
	last_activity: Instant,
	/// Guarded actions queued or running; the idle timer is paused while > 0.
	pending: usize,
}

impl Default for SessionState {
	fn default() -> Self {
		Self::new()
	}
}

impl SessionState {
	pub fn new() -> Self {
		Self {
			phase: Phase::LoggedOut,
			fingerprint: None,
			last_activity: Instant::now(),
			pending: 0,
		}
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn fingerprint(&self) -> Option<&Fingerprint> {
		self.fingerprint.as_ref()
	}

	pub fn is_disposed(&self) -> bool {
		self.phase == Phase::Disposed
	}

	pub fn ensure_not_disposed(&self) -> Result<()> {
		if self.is_disposed() { Err(Error::Disposed) } else { Ok(()) }
	}

	/// Guarded actions require a live, authenticated session.
	pub fn ensure_logged_in(&self) -> Result<()> {
		match self.phase {
			Phase::Disposed => Err(Error::Disposed),
			Phase::LoggedIn => Ok(()),
			_ => Err(Error::NotLoggedIn),
		}
	}

	/// `LoggedOut -> Authenticating`.
	pub fn begin_authentication(&mut self, fingerprint: Fingerprint) -> Result<()> {
		self.ensure_not_disposed()?;
		debug_assert_eq!(self.phase, Phase::LoggedOut, "login must start from a logged-out session");
		self.phase = Phase::Authenticating;
		self.fingerprint = Some(fingerprint);
		Ok(())
	}

	/// `Authenticating -> AwaitingChallenge`.
	pub fn await_challenge(&mut self) -> Result<()> {
		self.ensure_not_disposed()?;
		debug_assert_eq!(self.phase, Phase::Authenticating);
		self.phase = Phase::AwaitingChallenge;
		Ok(())
	}

	/// `AwaitingChallenge -> LoggedIn`; resets the idle timer.
	pub fn complete_login(&mut self) -> Result<()> {
		self.ensure_not_disposed()?;
		debug_assert_eq!(self.phase, Phase::AwaitingChallenge);
		self.phase = Phase::LoggedIn;
		self.last_activity = Instant::now();
		Ok(())
	}

	/// Back to `LoggedOut`, dropping the fingerprint. No-op once disposed.
	pub fn reset(&mut self) {
		if self.is_disposed() {
			return;
		}
		self.phase = Phase::LoggedOut;
		self.fingerprint = None;
	}

	/// Terminal transition.
	pub fn dispose(&mut self) {
		self.phase = Phase::Disposed;
		self.fingerprint = None;
		self.pending = 0;
	}

	/// Pauses the idle timer for one guarded action.
	pub fn pause_idle(&mut self) {
		self.pending += 1;
	}

	/// Ends one guarded action; a successful one counts as activity.
	pub fn resume_idle(&mut self, succeeded: bool) {
		self.pending = self.pending.saturating_sub(1);
		if succeeded {
			self.last_activity = Instant::now();
		}
	}

	/// Idle time, or `None` while a guarded action is pending.
	pub fn idle_for(&self) -> Option<Duration> {
		if self.pending > 0 { None } else { Some(self.last_activity.elapsed()) }
	}

	pub fn last_activity(&self) -> Instant {
		self.last_activity
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		SessionSnapshot {
			phase: self.phase,
			fingerprint: self.fingerprint.clone(),
			idle_ms: self.last_activity.elapsed().as_millis() as u64,
			pending_actions: self.pending,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::phone::PhoneNumber;

	fn fingerprint() -> Fingerprint {
		PhoneNumber::parse("+491776200214").unwrap().fingerprint()
	}

	fn assert_invariant(state: &SessionState) {
		assert_eq!(state.fingerprint().is_some(), state.phase().holds_credentials(), "phase {}", state.phase());
	}

	#[test]
	fn starts_logged_out() {
		let state = SessionState::new();
		assert_eq!(state.phase(), Phase::LoggedOut);
		assert_invariant(&state);
		assert!(matches!(state.ensure_logged_in(), Err(Error::NotLoggedIn)));
	}

	#[test]
	fn full_login_keeps_fingerprint_invariant() {
		let mut state = SessionState::new();
		state.begin_authentication(fingerprint()).unwrap();
		assert_invariant(&state);
		state.await_challenge().unwrap();
		assert_invariant(&state);
		state.complete_login().unwrap();
		assert_invariant(&state);
		assert!(state.ensure_logged_in().is_ok());

		state.reset();
		assert_eq!(state.phase(), Phase::LoggedOut);
		assert_invariant(&state);
	}

	#[test]
	fn disposal_is_terminal() {
		let mut state = SessionState::new();
		state.begin_authentication(fingerprint()).unwrap();
		state.dispose();
		assert_invariant(&state);

		state.reset();
		assert_eq!(state.phase(), Phase::Disposed);
		assert!(matches!(state.begin_authentication(fingerprint()), Err(Error::Disposed)));
		assert!(matches!(state.ensure_logged_in(), Err(Error::Disposed)));
	}

	#[test]
	fn idle_timer_pauses_while_actions_pending() {
		let mut state = SessionState::new();
		assert!(state.idle_for().is_some());

		state.pause_idle();
		state.pause_idle();
		assert!(state.idle_for().is_none());

		state.resume_idle(true);
		assert!(state.idle_for().is_none(), "one action still pending");

		let before = state.last_activity();
		state.resume_idle(false);
		assert!(state.idle_for().is_some());
		assert_eq!(state.last_activity(), before, "failed action does not count as activity");
	}

	#[test]
	fn successful_action_resets_idle() {
		let mut state = SessionState::new();
		let before = state.last_activity();
		std::thread::sleep(Duration::from_millis(5));
		state.pause_idle();
		state.resume_idle(true);
		assert!(state.last_activity() > before);
	}

	#[test]
	fn snapshot_masks_fingerprint() {
		let mut state = SessionState::new();
		state.begin_authentication(fingerprint()).unwrap();
		let json = serde_json::to_value(state.snapshot()).unwrap();
		assert_eq!(json["phase"], "authenticating");
		assert_eq!(json["fingerprint"], "+49******0214");
		assert_eq!(json["pendingActions"], 0);
	}
}

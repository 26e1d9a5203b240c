// Integration tests for the login / logout state machine over the fake driver.
//
// Tests cover:
// - Successful login, logout and re-verification
// - Local phone validation and PIN truncation
// - Idempotent re-login and account switching
// - Remote rejections, timeouts and abandoned logins leaving the session logged out
// - Disposal and use after disposal

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use twofa::fake_driver::{FakeCall, FakeDriver, FakeSite};
use twofa::{Connection, Error, LoginOutcome, Phase, SessionConfig};

const PHONE: &str = "+491776200214";

fn test_config() -> SessionConfig {
	let mut config = SessionConfig::default();
	config.timing.poll_interval_ms = 10;
	config.timing.short_timeout_ms = 200;
	config.timing.login_timeout_ms = 500;
	config.timing.idle_threshold_ms = 400;
	config.timing.keepalive_check_ms = 20;
	config
}

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

fn connect(site: FakeSite) -> (Connection, FakeDriver) {
	init_tracing();
	let config = test_config();
	let driver = FakeDriver::new(site, &config);
	(Connection::new(Box::new(driver.clone()), config), driver)
}

fn accepting_site() -> FakeSite {
	FakeSite::new(1488, 4321)
}

#[tokio::test]
async fn login_then_logout_round_trip() {
	let (connection, driver) = connect(accepting_site());

	let outcome = connection.login(PHONE, 1488, || Ok(4321)).await.unwrap();
	assert_eq!(outcome, LoginOutcome::Success);
	assert_eq!(connection.phase(), Phase::LoggedIn);
	assert!(connection.is_logged_in().await.unwrap());
	assert_eq!(driver.selected_country().as_deref(), Some("+49"));
	assert_eq!(driver.typed_phone(), "1776200214");

	assert!(connection.logout().await.unwrap());
	assert_eq!(connection.phase(), Phase::LoggedOut);
	assert!(!driver.is_authenticated());
	assert!(!connection.logout().await.unwrap());
	assert!(!connection.is_logged_in().await.unwrap());
}

#[tokio::test]
async fn invalid_phone_never_reaches_driver() {
	let (connection, driver) = connect(accepting_site());
	let asked = Arc::new(AtomicBool::new(false));

	for raw in [
		"491776200214",
		"+1 555 0100 222",
		"+49",
		"phone",
		"",
		"+49\u{0967}\u{0967}\u{096D}\u{096D}\u{096C}\u{0968}\u{0966}\u{0966}\u{0968}\u{0967}",
	] {
		let flag = Arc::clone(&asked);
		let outcome = connection
			.login(raw, 1488, move || {
				flag.store(true, Ordering::SeqCst);
				Ok(4321)
			})
			.await
			.unwrap();
		assert_eq!(outcome, LoginOutcome::InvalidCredentialFormat, "{raw:?}");
	}

	assert!(driver.calls().is_empty());
	assert_eq!(driver.find_count(), 0);
	assert!(!asked.load(Ordering::SeqCst));
	assert_eq!(connection.phase(), Phase::LoggedOut);
}

#[tokio::test]
async fn pin_is_truncated_to_four_digits() {
	let (connection, driver) = connect(FakeSite::new(9999, 4321));
	let pin_input = connection.config().selectors.pin_input.clone();

	let outcome = connection.login(PHONE, 99999, || Ok(4321)).await.unwrap();

	assert_eq!(outcome, LoginOutcome::Success);
	assert!(driver.calls().contains(&FakeCall::SendKeys {
		selector: pin_input,
		text: "9999".to_string(),
	}));
}

#[tokio::test]
async fn relogin_with_same_phone_is_a_no_op() {
	let (connection, driver) = connect(accepting_site());
	let login_url = connection.config().urls.login.clone();

	assert_eq!(connection.login(PHONE, 1488, || Ok(4321)).await.unwrap(), LoginOutcome::Success);
	// Equivalent spelling, same fingerprint
	assert_eq!(connection.login("0049 177 620 0214", 1488, || Ok(4321)).await.unwrap(), LoginOutcome::Success);

	let snapshot = connection.snapshot();
	assert_eq!(snapshot.keepalive_starts, 1);
	assert!(snapshot.keepalive_running);
	assert_eq!(driver.navigations_to(&login_url), 1);
}

#[tokio::test]
async fn relogin_after_remote_expiry_authenticates_again() {
	let (connection, driver) = connect(accepting_site());
	let login_url = connection.config().urls.login.clone();

	assert_eq!(connection.login(PHONE, 1488, || Ok(4321)).await.unwrap(), LoginOutcome::Success);
	driver.expire_session();
	assert_eq!(connection.login(PHONE, 1488, || Ok(4321)).await.unwrap(), LoginOutcome::Success);

	assert_eq!(driver.navigations_to(&login_url), 2);
	assert_eq!(connection.snapshot().keepalive_starts, 2);
	assert_eq!(connection.phase(), Phase::LoggedIn);
}

#[tokio::test]
async fn switching_accounts_logs_out_in_between() {
	let (connection, driver) = connect(accepting_site());
	let config = connection.config().clone();

	assert_eq!(connection.login(PHONE, 1488, || Ok(4321)).await.unwrap(), LoginOutcome::Success);
	assert_eq!(connection.login("+33 6 12 34 56 78", 1488, || Ok(4321)).await.unwrap(), LoginOutcome::Success);

	let calls = driver.calls();
	let logins: Vec<usize> = calls
		.iter()
		.enumerate()
		.filter(|(_, call)| **call == FakeCall::Navigate(config.urls.login.clone()))
		.map(|(index, _)| index)
		.collect();
	let sign_out = calls
		.iter()
		.position(|call| *call == FakeCall::Click(config.selectors.sign_out.clone()))
		.expect("sign-out clicked");
	assert_eq!(logins.len(), 2);
	assert!(logins[0] < sign_out && sign_out < logins[1]);
	assert_eq!(driver.navigations_to(&config.urls.logged_out), 1);

	let snapshot = serde_json::to_value(connection.snapshot()).unwrap();
	assert_eq!(snapshot["fingerprint"], "+33*****5678");
	assert_eq!(snapshot["phase"], "logged_in");
}

#[tokio::test]
async fn wrong_pin_is_reported_without_asking_for_code() {
	let (connection, _driver) = connect(accepting_site());
	let asked = Arc::new(AtomicBool::new(false));
	let flag = Arc::clone(&asked);

	let outcome = connection
		.login(PHONE, 1234, move || {
			flag.store(true, Ordering::SeqCst);
			Ok(4321)
		})
		.await
		.unwrap();

	assert_eq!(outcome, LoginOutcome::WrongPin);
	assert!(!asked.load(Ordering::SeqCst));
	assert_eq!(connection.phase(), Phase::LoggedOut);
	assert!(!connection.snapshot().keepalive_running);
}

#[tokio::test]
async fn wrong_code_is_reported() {
	let (connection, driver) = connect(accepting_site());

	let outcome = connection.login(PHONE, 1488, || Ok(1111)).await.unwrap();

	assert_eq!(outcome, LoginOutcome::WrongChallengeCode);
	assert_eq!(connection.phase(), Phase::LoggedOut);
	assert!(!driver.is_authenticated());
}

#[tokio::test]
async fn missing_marker_times_out() {
	let (connection, _driver) = connect(accepting_site().never_authenticates());

	let outcome = connection.login(PHONE, 1488, || Ok(4321)).await.unwrap();

	assert_eq!(outcome, LoginOutcome::Timeout);
	assert_eq!(connection.phase(), Phase::LoggedOut);
	assert_eq!(connection.snapshot().keepalive_starts, 0);
	assert!(matches!(connection.run_guarded(|_| Box::pin(async { Ok::<_, Error>(()) })).await, Err(Error::NotLoggedIn)));
}

#[tokio::test]
async fn abandoned_login_leaves_session_logged_out() {
	let (connection, _driver) = connect(accepting_site().never_authenticates());

	// Dropped while polling for the landing marker
	let abandoned = tokio::time::timeout(Duration::from_millis(100), connection.login(PHONE, 1488, || Ok(4321))).await;
	assert!(abandoned.is_err());

	let snapshot = connection.snapshot();
	assert_eq!(snapshot.session.phase, Phase::LoggedOut);
	assert!(snapshot.session.fingerprint.is_none());

	let outcome = connection.login(PHONE, 1488, || Ok(4321)).await.unwrap();
	assert_eq!(outcome, LoginOutcome::Timeout);
	assert_eq!(connection.phase(), Phase::LoggedOut);
}

#[tokio::test]
async fn single_challenge_field_gets_whole_code() {
	let (connection, driver) = connect(accepting_site().challenge_slots(1).consent_prompt(false));
	let challenge = connection.config().selectors.challenge_inputs.clone();

	let outcome = connection.login(PHONE, 1488, || Ok(4321)).await.unwrap();

	assert_eq!(outcome, LoginOutcome::Success);
	assert!(driver.calls().contains(&FakeCall::SendKeys {
		selector: challenge,
		text: "4321".to_string(),
	}));
}

#[tokio::test]
async fn failing_challenge_provider_is_an_error() {
	let (connection, _driver) = connect(accepting_site());

	let result = connection
		.login(PHONE, 1488, || Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stdin closed")))
		.await;

	assert!(matches!(result, Err(Error::Challenge(_))));
	assert_eq!(connection.phase(), Phase::LoggedOut);
}

#[tokio::test]
async fn guarded_action_requires_login() {
	let (connection, driver) = connect(accepting_site());

	let result = connection.run_guarded(|driver| Box::pin(async move { Ok::<_, Error>(driver.find_element("body").await?.is_some()) })).await;

	assert!(matches!(result, Err(Error::NotLoggedIn)));
	assert_eq!(driver.find_count(), 0);
}

#[tokio::test]
async fn read_text_goes_through_executor() {
	let (connection, _driver) = connect(accepting_site().with_text("#balance", "12.34 EUR"));
	let account = connection.config().urls.account.clone();
	connection.login(PHONE, 1488, || Ok(4321)).await.unwrap();

	assert_eq!(connection.read_text(&account, "#balance").await.unwrap().as_deref(), Some("12.34 EUR"));
	assert_eq!(connection.read_text(&account, "#missing").await.unwrap(), None);
}

#[tokio::test]
async fn dispose_runs_once_and_logs_out() {
	let (connection, driver) = connect(accepting_site());
	let sign_out = connection.config().selectors.sign_out.clone();
	connection.login(PHONE, 1488, || Ok(4321)).await.unwrap();

	connection.dispose().await.unwrap();
	connection.dispose().await.unwrap();

	assert_eq!(driver.quit_count(), 1);
	assert!(driver.calls().contains(&FakeCall::Click(sign_out)));
	assert_eq!(connection.phase(), Phase::Disposed);
	assert!(connection.is_disposed());
	assert!(!connection.snapshot().keepalive_running);
}

#[tokio::test]
async fn concurrent_dispose_quits_once() {
	let (connection, driver) = connect(accepting_site());
	let other = connection.clone();

	let (first, second) = tokio::join!(connection.dispose(), other.dispose());

	assert!(first.is_ok() && second.is_ok());
	assert_eq!(driver.quit_count(), 1);
}

#[tokio::test]
async fn operations_after_dispose_fail() {
	let (connection, _driver) = connect(accepting_site());
	connection.dispose().await.unwrap();

	assert!(matches!(connection.login(PHONE, 1488, || Ok(4321)).await, Err(Error::Disposed)));
	assert!(matches!(connection.logout().await, Err(Error::Disposed)));
	assert!(matches!(connection.is_logged_in().await, Err(Error::Disposed)));
	assert!(matches!(connection.run_guarded(|_| Box::pin(async { Ok::<_, Error>(()) })).await, Err(Error::Disposed)));
}

#[tokio::test]
async fn dispose_abandons_pending_challenge() {
	let (connection, _driver) = connect(accepting_site());
	let login = tokio::spawn({
		let connection = connection.clone();
		async move {
			connection
				.login(PHONE, 1488, || {
					std::thread::sleep(Duration::from_millis(800));
					Ok(4321)
				})
				.await
		}
	});

	let deadline = Instant::now() + Duration::from_secs(2);
	while connection.phase() != Phase::AwaitingChallenge {
		assert!(Instant::now() < deadline, "challenge never requested");
		tokio::time::sleep(Duration::from_millis(5)).await;
	}

	let start = Instant::now();
	connection.dispose().await.unwrap();
	let result = login.await.unwrap();

	assert!(matches!(result, Err(Error::Disposed)));
	assert!(start.elapsed() < Duration::from_millis(700));
	assert_eq!(connection.phase(), Phase::Disposed);
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		self.0.lock().unwrap().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

impl CapturedLogs {
	fn contents(&self) -> String {
		String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
	}

	fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
		let logs = self.clone();
		tracing_subscriber::fmt().with_max_level(tracing::Level::WARN).with_ansi(false).with_writer(move || logs.clone()).finish()
	}
}

#[tokio::test]
async fn dropping_undisposed_connection_warns_about_driver_session() {
	let config = test_config();
	let driver = FakeDriver::new(accepting_site(), &config);
	let connection = Connection::new(Box::new(driver.clone()), config);
	let logs = CapturedLogs::default();

	tracing::subscriber::with_default(logs.subscriber(), || drop(connection));

	assert!(logs.contents().contains("dropped without dispose"), "{}", logs.contents());
	assert_eq!(driver.quit_count(), 0);
}

#[tokio::test]
async fn dropping_disposed_connection_is_silent() {
	let (connection, driver) = connect(accepting_site());
	connection.dispose().await.unwrap();
	let logs = CapturedLogs::default();

	tracing::subscriber::with_default(logs.subscriber(), || drop(connection));

	assert!(logs.contents().is_empty(), "{}", logs.contents());
	assert_eq!(driver.quit_count(), 1);
}

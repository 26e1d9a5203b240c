//! Interactive login: PIN from the environment or a prompt, SMS code from a
//! prompt, then the session is held with keep-alive until Ctrl-C.

use std::future::Future;
use std::io::{self, Write};
use std::time::Instant;

use tracing::{info, warn};
use twofa::{LoginOutcome, PhoneNumber};

use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::output::{CommandInputs, DiagnosticLevel, LoginData, OutputFormat, ResultBuilder, print_result};

pub async fn execute(ctx: &CommandContext, phone: &str, pin_env: Option<&str>, format: OutputFormat) -> Result<()> {
	let started = Instant::now();

	// Rejected numbers never launch a browser
	let fingerprint = match PhoneNumber::parse(phone) {
		Ok(number) => number.fingerprint(),
		Err(err) => {
			info!(target = "twofa", error = %err, "phone number rejected");
			return Err(CliError::Login(LoginOutcome::InvalidCredentialFormat));
		}
	};

	let (pin, pin_source) = match pin_env {
		Some(var) => (pin_from_env(var)?, format!("env:{var}")),
		None => (prompt_number("PIN: ").await?, "prompt".to_string()),
	};

	let factory = ctx.factory()?;
	let attempt = async {
		let connection = factory.create().await?;
		info!(target = "twofa", %fingerprint, webdriver = %ctx.webdriver, "logging in");
		let outcome = connection.login(phone, pin, || read_number("SMS code: ")).await?;
		Ok::<_, twofa::Error>((connection, outcome))
	};

	let (connection, outcome) = match until_interrupted(attempt, tokio::signal::ctrl_c()).await {
		Some(Ok(established)) => established,
		Some(Err(err)) => {
			close_quietly(&factory).await;
			return Err(err.into());
		}
		None => {
			info!(target = "twofa", "interrupt received during login; closing the driver session");
			close_quietly(&factory).await;
			return Err(CliError::Interrupted);
		}
	};
	if !outcome.is_success() {
		factory.close().await?;
		return Err(CliError::Login(outcome));
	}

	eprintln!("Logged in. The session is kept alive; press Ctrl-C to log out.");
	let held = Instant::now();
	tokio::signal::ctrl_c().await?;
	info!(target = "twofa", "interrupt received; logging out");

	let session = connection.snapshot();
	let mut builder = ResultBuilder::new("login")
		.started_at(started)
		.diagnostic(DiagnosticLevel::Info, format!("session held for {}s", held.elapsed().as_secs()));
	let logged_out = match connection.logout().await {
		Ok(logged_out) => logged_out,
		Err(err) => {
			builder = builder.diagnostic(DiagnosticLevel::Warning, format!("logout failed: {err}"));
			false
		}
	};
	factory.close().await?;

	let result = builder
		.inputs(CommandInputs {
			phone: Some(fingerprint.masked()),
			pin_source: Some(pin_source),
		})
		.data(LoginData {
			outcome,
			session,
			logged_out: Some(logged_out),
		})
		.config(ctx.effective_config())
		.build();
	print_result(&result, format);
	Ok(())
}

/// Drives `work` to completion unless `interrupt` resolves first.
async fn until_interrupted<F, I>(work: F, interrupt: I) -> Option<F::Output>
where
	F: Future,
	I: Future,
{
	tokio::select! {
		output = work => Some(output),
		_ = interrupt => None,
	}
}

async fn close_quietly(factory: &twofa::ConnectionFactory) {
	if let Err(err) = factory.close().await {
		warn!(target = "twofa", error = %err, "closing connection failed");
	}
}

fn pin_from_env(var: &str) -> Result<u32> {
	let raw = std::env::var(var).map_err(|_| CliError::InvalidInput(format!("environment variable {var} is not set")))?;
	parse_digits(&raw).ok_or_else(|| CliError::InvalidInput(format!("environment variable {var} does not hold a numeric PIN")))
}

async fn prompt_number(prompt: &'static str) -> Result<u32> {
	let read = tokio::task::spawn_blocking(move || read_number(prompt))
		.await
		.map_err(|err| CliError::InvalidInput(err.to_string()))?;
	Ok(read?)
}

/// Blocking prompt on stderr, answer on stdin.
fn read_number(prompt: &str) -> io::Result<u32> {
	let mut stderr = io::stderr();
	write!(stderr, "{prompt}")?;
	stderr.flush()?;

	let mut line = String::new();
	if io::stdin().read_line(&mut line)? == 0 {
		return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
	}
	parse_digits(&line).ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "expected digits only"))
}

fn parse_digits(raw: &str) -> Option<u32> {
	let trimmed = raw.trim();
	if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
		return None;
	}
	trimmed.parse().ok()
}

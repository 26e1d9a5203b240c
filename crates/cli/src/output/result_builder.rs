use std::io::{self, Write};
use std::time::Instant;

use serde::Serialize;

use crate::output::format::OutputFormat;
use crate::output::model::{CommandError, CommandInputs, CommandResult, Diagnostic, DiagnosticLevel, EffectiveConfig, ErrorCode, SCHEMA_VERSION};

/// Builder for command results.
pub struct ResultBuilder<T: Serialize> {
	command: String,
	inputs: Option<CommandInputs>,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
	diagnostics: Vec<Diagnostic>,
	config: Option<EffectiveConfig>,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			inputs: None,
			data: None,
			error: None,
			start_time: Instant::now(),
			diagnostics: Vec::new(),
			config: None,
		}
	}

	pub fn started_at(mut self, start_time: Instant) -> Self {
		self.start_time = start_time;
		self
	}

	pub fn inputs(mut self, inputs: CommandInputs) -> Self {
		self.inputs = Some(inputs);
		self
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error = Some(CommandError { code, message: message.into() });
		self
	}

	pub fn diagnostic(mut self, level: DiagnosticLevel, message: impl Into<String>) -> Self {
		self.diagnostics.push(Diagnostic { level, message: message.into() });
		self
	}

	pub fn config(mut self, config: EffectiveConfig) -> Self {
		self.config = Some(config);
		self
	}

	pub fn build(self) -> CommandResult<T> {
		let ok = self.error.is_none() && self.data.is_some();

		CommandResult {
			schema_version: Some(SCHEMA_VERSION),
			ok,
			command: self.command,
			inputs: self.inputs,
			data: self.data,
			error: self.error,
			duration_ms: Some(self.start_time.elapsed().as_millis() as u64),
			diagnostics: self.diagnostics,
			config: self.config,
		}
	}
}

/// Prints a command result to stdout in the requested format.
pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Toon => {
			if let Ok(json_value) = serde_json::to_value(result) {
				println!("{}", toon::encode(&json_value, None));
			}
		}
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result),
	}
}

fn print_result_text<T: Serialize>(result: &CommandResult<T>) {
	let mut stdout = io::stdout().lock();

	if result.ok {
		if let Some(ref data) = result.data {
			if let Ok(json) = serde_json::to_string_pretty(data) {
				let _ = writeln!(stdout, "{json}");
			}
		}
	} else if let Some(ref error) = result.error {
		let _ = writeln!(stdout, "Error [{}]: {}", error.code, error.message);
	}

	for diag in &result.diagnostics {
		let prefix = match diag.level {
			DiagnosticLevel::Info => "info",
			DiagnosticLevel::Warning => "warning",
		};
		let _ = writeln!(stdout, "[{prefix}] {}", diag.message);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ok_requires_data_and_no_error() {
		let result = ResultBuilder::<u32>::new("check-phone").data(1).build();
		assert!(result.ok);
		assert_eq!(result.schema_version, Some(SCHEMA_VERSION));

		let result = ResultBuilder::<u32>::new("check-phone").data(1).error(ErrorCode::InvalidInput, "bad").build();
		assert!(!result.ok);

		let result = ResultBuilder::<u32>::new("check-phone").build();
		assert!(!result.ok);
	}

	#[test]
	fn envelope_serializes_camel_case() {
		let result = ResultBuilder::<()>::new("login")
			.error(ErrorCode::WrongPin, "wrong PIN")
			.diagnostic(DiagnosticLevel::Warning, "retry with a fresh PIN")
			.config(EffectiveConfig {
				webdriver: "http://localhost:9515/".to_string(),
				headless: true,
				config_path: None,
			})
			.build();

		let json = serde_json::to_value(&result).unwrap();
		assert_eq!(json["ok"], false);
		assert_eq!(json["error"]["code"], "WRONG_PIN");
		assert_eq!(json["diagnostics"][0]["level"], "warning");
		assert_eq!(json["config"]["headless"], true);
		assert!(json.get("data").is_none());
		assert!(json["durationMs"].is_u64());
	}
}

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber on stderr.
///
/// `-v` enables info and `-vv` debug for this workspace's crates; `RUST_LOG`
/// overrides both.
pub fn init_logging(verbose: u8) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(std::io::stderr().is_terminal())
		.init();
}

fn default_directives(verbose: u8) -> String {
	let level = match verbose {
		0 => return "warn".to_string(),
		1 => "info",
		_ => "debug",
	};
	format!("warn,twofa={level},twofa_runtime={level}")
}

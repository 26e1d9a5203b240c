use clap::ValueEnum;

/// How command results are written to stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// TOON envelope (compact, default)
	#[default]
	Toon,
	/// Pretty-printed JSON envelope
	Json,
	/// Payload only, for people at a terminal
	Text,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Toon => write!(f, "toon"),
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Text => write!(f, "text"),
		}
	}
}

use crate::context::CommandContext;
use crate::error::Result;
use crate::output::{OutputFormat, ResultBuilder, print_result};

/// Prints the configuration after defaults and the config file are merged.
pub fn execute(ctx: &CommandContext, format: OutputFormat) -> Result<()> {
	let result = ResultBuilder::new("config").data(ctx.config.clone()).config(ctx.effective_config()).build();
	print_result(&result, format);
	Ok(())
}

use tracing::info;
use twofa::PhoneNumber;

use crate::error::{CliError, Result};
use crate::output::{CommandInputs, OutputFormat, PhoneData, ResultBuilder, print_result};

/// Validates `phone` without touching the network.
pub fn execute(phone: &str, format: OutputFormat) -> Result<()> {
	let number = PhoneNumber::parse(phone).map_err(|err| CliError::InvalidInput(err.to_string()))?;
	let fingerprint = number.fingerprint();
	info!(target = "twofa", %fingerprint, "phone number accepted");

	let result = ResultBuilder::new("check-phone")
		.inputs(CommandInputs {
			phone: Some(fingerprint.masked()),
			..Default::default()
		})
		.data(PhoneData {
			country_code: number.country_code().to_string(),
			fingerprint: fingerprint.masked(),
		})
		.build();
	print_result(&result, format);
	Ok(())
}

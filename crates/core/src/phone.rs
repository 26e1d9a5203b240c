//! Phone number validation and credential normalization.
//!
//! The remote service only accepts numbers in international form from a fixed
//! set of calling codes. [`PhoneNumber::parse`] is the validation contract:
//!
//! * separators (spaces, dashes, dots, slashes, parentheses) are ignored
//! * a leading `00` is read as `+`
//! * the result must be `+` followed by 8 to 15 digits
//! * the calling code must be one of [`ACCEPTED_COUNTRY_CODES`]
//! * trunk zeros after the calling code (`+49 0177...`) are dropped

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Calling codes the service accepts, without the leading `+`.
pub const ACCEPTED_COUNTRY_CODES: &[&str] = &[
	"30", "31", "32", "33", "34", "351", "352", "353", "354", "356", "357", "358", "359", "36", "370", "371", "372", "385", "386", "39", "40", "41",
	"420", "421", "423", "43", "44", "45", "46", "47", "48", "49",
];

const SEPARATORS: &[char] = &[' ', '-', '.', '/', '(', ')', '\t'];

static INTERNATIONAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").expect("international number regex should compile"));

/// Why a phone number was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneError {
	#[error("phone number is not in international format")]
	Format,
	#[error("country calling code is not supported")]
	UnsupportedCountryCode,
}

/// A validated phone number split into calling code and national number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
	country_code: &'static str,
	national: String,
}

impl PhoneNumber {
	pub fn parse(raw: &str) -> Result<Self, PhoneError> {
		let normalized = normalize(raw);
		if !INTERNATIONAL.is_match(&normalized) {
			return Err(PhoneError::Format);
		}

		let digits = &normalized[1..];
		let country_code = ACCEPTED_COUNTRY_CODES
			.iter()
			.copied()
			.find(|code| digits.starts_with(code))
			.ok_or(PhoneError::UnsupportedCountryCode)?;

		let national = digits[country_code.len()..].trim_start_matches('0');
		if national.len() < 4 {
			return Err(PhoneError::Format);
		}

		Ok(Self {
			country_code,
			national: national.to_string(),
		})
	}

	/// Calling code without the leading `+`.
	pub fn country_code(&self) -> &str {
		self.country_code
	}

	pub fn national(&self) -> &str {
		&self.national
	}

	pub fn fingerprint(&self) -> Fingerprint {
		Fingerprint(format!("+{}{}", self.country_code, self.national))
	}
}

/// Canonical, comparable form of a phone number: `+`, calling code, national
/// number, digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Form safe for logs: everything but the last four digits is hidden.
	pub fn masked(&self) -> String {
		let chars: Vec<char> = self.0.chars().collect();
		let visible = chars.len().saturating_sub(4);
		let shown = 3.min(visible);
		let mut out: String = chars[..shown].iter().collect();
		out.extend(std::iter::repeat_n('*', visible - shown));
		out.extend(&chars[visible..]);
		out
	}
}

impl fmt::Display for Fingerprint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.masked())
	}
}

impl Serialize for Fingerprint {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.masked())
	}
}

/// Strips separators and rewrites a `00` prefix to `+`.
///
/// Characters that are neither digits nor separators are kept so that
/// validation rejects them.
pub fn normalize(raw: &str) -> String {
	let trimmed = raw.trim();
	let (international, rest) = match trimmed.strip_prefix('+') {
		Some(rest) => (true, rest),
		None => match trimmed.strip_prefix("00") {
			Some(rest) => (true, rest),
			None => (false, trimmed),
		},
	};

	let mut out = String::with_capacity(rest.len() + 1);
	if international {
		out.push('+');
	}
	out.extend(rest.chars().filter(|ch| !SEPARATORS.contains(ch)));
	out
}

/// Reduces a PIN or SMS code to the four digits the service's fixed-width
/// fields accept (`value % 10000`, zero padded).
pub fn four_digits(value: u32) -> String {
	format!("{:04}", value % 10_000)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_german_mobile() {
		let number = PhoneNumber::parse("+491776200214").unwrap();
		assert_eq!(number.country_code(), "49");
		assert_eq!(number.national(), "1776200214");
		assert_eq!(number.fingerprint().as_str(), "+491776200214");
	}

	#[test]
	fn equivalent_spellings_share_a_fingerprint() {
		let expected = PhoneNumber::parse("+491776200214").unwrap().fingerprint();
		for raw in ["0049 177 620 0214", "+49 (0) 177-620-0214", " +49/1776200214 ", "+4901776200214"] {
			assert_eq!(PhoneNumber::parse(raw).unwrap().fingerprint(), expected, "{raw}");
		}
	}

	#[test]
	fn three_digit_codes_are_recognized() {
		let number = PhoneNumber::parse("+353 87 123 4567").unwrap();
		assert_eq!(number.country_code(), "353");
		assert_eq!(number.national(), "871234567");
	}

	#[test]
	fn rejects_numbers_without_prefix() {
		assert_eq!(PhoneNumber::parse("01776200214"), Err(PhoneError::Format));
		assert_eq!(PhoneNumber::parse(""), Err(PhoneError::Format));
		assert_eq!(PhoneNumber::parse("+49 17x 6200214"), Err(PhoneError::Format));
		assert_eq!(PhoneNumber::parse("+49 12"), Err(PhoneError::Format));
		assert_eq!(PhoneNumber::parse("+0491776200214"), Err(PhoneError::Format));
	}

	#[test]
	fn rejects_unsupported_country_codes() {
		assert_eq!(PhoneNumber::parse("+1 555 123 4567"), Err(PhoneError::UnsupportedCountryCode));
		assert_eq!(PhoneNumber::parse("+81 90 1234 5678"), Err(PhoneError::UnsupportedCountryCode));
	}

	#[test]
	fn rejects_national_part_of_only_trunk_zeros() {
		assert_eq!(PhoneNumber::parse("+49 0000 0000"), Err(PhoneError::Format));
	}

	#[test]
	fn accepted_codes_are_prefix_free() {
		for a in ACCEPTED_COUNTRY_CODES {
			for b in ACCEPTED_COUNTRY_CODES {
				assert!(a == b || !b.starts_with(a), "{a} is a prefix of {b}");
			}
		}
	}

	#[test]
	fn fingerprint_masks_national_digits() {
		let fingerprint = PhoneNumber::parse("+491776200214").unwrap().fingerprint();
		assert_eq!(fingerprint.masked(), "+49******0214");
		assert_eq!(fingerprint.to_string(), "+49******0214");
	}

	#[test]
	fn rejects_non_ascii_digits() {
		// Devanagari and full-width digits are Unicode decimal digits
		assert_eq!(PhoneNumber::parse("+49\u{0967}\u{0967}\u{096D}\u{096D}\u{096C}\u{0968}\u{0966}\u{0966}\u{0968}\u{0967}"), Err(PhoneError::Format));
		assert_eq!(PhoneNumber::parse("+49\u{FF11}\u{FF17}\u{FF17}\u{FF16}\u{FF12}\u{FF10}\u{FF10}\u{FF12}\u{FF11}\u{FF14}"), Err(PhoneError::Format));
		assert_eq!(PhoneNumber::parse("+49 177 620 02\u{0967}4"), Err(PhoneError::Format));
	}

	#[test]
	fn masking_respects_char_boundaries() {
		let fingerprint = Fingerprint("+49\u{0967}\u{0967}\u{096D}\u{096D}\u{096C}\u{0968}".to_string());
		assert_eq!(fingerprint.masked(), "+49**\u{096D}\u{096D}\u{096C}\u{0968}");
		assert_eq!(Fingerprint("+49".to_string()).masked(), "+49");
	}

	#[test]
	fn four_digits_keeps_low_digits() {
		assert_eq!(four_digits(1488), "1488");
		assert_eq!(four_digits(7), "0007");
		assert_eq!(four_digits(99_999), "9999");
		assert_eq!(four_digits(10_000), "0000");
		assert_eq!(four_digits(123_456), "3456");
	}
}

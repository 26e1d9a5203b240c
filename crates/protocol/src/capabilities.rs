//! Session creation payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /session`.
///
/// ```json
/// { "capabilities": { "alwaysMatch": { "browserName": "chrome" } } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSessionRequest {
	pub capabilities: CapabilityRequest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityRequest {
	#[serde(default)]
	pub always_match: Map<String, Value>,
}

impl NewSessionRequest {
	/// Builds a request for a Chrome session, optionally headless.
	pub fn chrome(headless: bool, extra_args: &[String]) -> Self {
		let mut args: Vec<Value> = extra_args.iter().cloned().map(Value::String).collect();
		if headless {
			args.push(Value::String("--headless=new".to_string()));
		}

		let mut always_match = Map::new();
		always_match.insert("browserName".to_string(), Value::String("chrome".to_string()));
		always_match.insert("goog:chromeOptions".to_string(), serde_json::json!({ "args": args }));

		Self {
			capabilities: CapabilityRequest { always_match },
		}
	}

	/// Builds a request from caller-provided `alwaysMatch` capabilities.
	pub fn with_capabilities(always_match: Map<String, Value>) -> Self {
		Self {
			capabilities: CapabilityRequest { always_match },
		}
	}
}

/// The `value` of a successful `POST /session` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionResponse {
	pub session_id: String,
	#[serde(default)]
	pub capabilities: Value,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn chrome_request_adds_headless_flag() {
		let request = NewSessionRequest::chrome(true, &["--window-size=1280,900".to_string()]);
		let json = serde_json::to_value(&request).unwrap();
		let caps = &json["capabilities"]["alwaysMatch"];
		assert_eq!(caps["browserName"], "chrome");
		let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
		assert_eq!(args.len(), 2);
		assert_eq!(args[1], "--headless=new");
	}

	#[test]
	fn session_response_parses_without_capabilities() {
		let response: NewSessionResponse = serde_json::from_str(r#"{"sessionId":"abc"}"#).unwrap();
		assert_eq!(response.session_id, "abc");
		assert!(response.capabilities.is_null());
	}
}

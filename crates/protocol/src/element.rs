//! Element references and element-scoped command bodies.

use serde::{Deserialize, Serialize};

/// Web element identifier key defined by W3C WebDriver.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Reference to a remote DOM element.
///
/// Format on the wire:
/// ```json
/// { "element-6066-11e4-a52e-4f735466cecf": "f.1C0A.d.3" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementReference {
	#[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
	pub id: String,
}

/// Locator strategy for element lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocatorStrategy {
	#[serde(rename = "css selector")]
	Css,
	#[serde(rename = "xpath")]
	XPath,
}

/// Body of `POST /session/{id}/element(s)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindElementRequest {
	pub using: LocatorStrategy,
	pub value: String,
}

impl FindElementRequest {
	pub fn css(selector: impl Into<String>) -> Self {
		Self {
			using: LocatorStrategy::Css,
			value: selector.into(),
		}
	}
}

/// Body of `POST /session/{id}/element/{element}/value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendKeysRequest {
	pub text: String,
}

/// Body of `POST /session/{id}/url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigateRequest {
	pub url: String,
}

/// Body of `POST /session/{id}/execute/sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteScriptRequest {
	pub script: String,
	#[serde(default)]
	pub args: Vec<serde_json::Value>,
}

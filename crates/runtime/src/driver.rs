//! The driver boundary consumed by the session core.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Opaque handle to an element found on the current page.
///
/// Handles are only meaningful to the driver that produced them and go stale
/// after navigation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element {
	id: String,
	selector: String,
}

impl Element {
	pub fn new(id: impl Into<String>, selector: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			selector: selector.into(),
		}
	}

	/// Driver-specific element identifier.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Selector the element was found with.
	pub fn selector(&self) -> &str {
		&self.selector
	}
}

/// Interactive browser session.
///
/// Implementations are not expected to be safe for interleaved use: callers
/// must serialize access (the session core holds a single mutex around every
/// interaction).
#[async_trait]
pub trait Driver: Send + Sync {
	async fn navigate(&self, url: &str) -> Result<()>;

	/// Returns the first element matching `selector`, or `None`.
	async fn find_element(&self, selector: &str) -> Result<Option<Element>>;

	/// Returns every element matching `selector`, possibly none.
	async fn find_elements(&self, selector: &str) -> Result<Vec<Element>>;

	async fn click(&self, element: &Element) -> Result<()>;

	async fn send_keys(&self, element: &Element, text: &str) -> Result<()>;

	async fn text(&self, element: &Element) -> Result<String>;

	/// Runs `script` in the page and returns its JSON result.
	async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value>;

	/// Ends the remote session. Called exactly once, on disposal.
	async fn quit(&self) -> Result<()>;
}

/// Creates driver sessions on demand.
#[async_trait]
pub trait Launcher: Send + Sync {
	async fn launch(&self) -> Result<Box<dyn Driver>>;
}

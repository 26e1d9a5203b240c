//! W3C WebDriver client over HTTP.
//!
//! Each [`Driver`] call maps to one WebDriver command:
//!
//! | call             | command                                     |
//! |------------------|---------------------------------------------|
//! | `navigate`       | `POST /session/{id}/url`                    |
//! | `find_element`   | `POST /session/{id}/element`                |
//! | `find_elements`  | `POST /session/{id}/elements`               |
//! | `click`          | `POST /session/{id}/element/{e}/click`      |
//! | `send_keys`      | `POST /session/{id}/element/{e}/value`      |
//! | `text`           | `GET  /session/{id}/element/{e}/text`       |
//! | `execute_script` | `POST /session/{id}/execute/sync`           |
//! | `quit`           | `DELETE /session/{id}`                      |

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;
use twofa_protocol::{
	ElementReference, ErrorBody, ExecuteScriptRequest, FindElementRequest, NavigateRequest, NewSessionRequest, NewSessionResponse, SendKeysRequest,
	ValueEnvelope,
};
use url::Url;

use crate::driver::{Driver, Element, Launcher};
use crate::error::{DriverError, Result};

/// Default per-request timeout for driver commands.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Launches WebDriver sessions against a running driver endpoint.
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
	endpoint: Url,
	capabilities: Map<String, Value>,
}

impl WebDriverLauncher {
	/// Creates a launcher for a headless or headed Chrome session.
	pub fn chrome(endpoint: &str, headless: bool) -> Result<Self> {
		let request = NewSessionRequest::chrome(headless, &["--window-size=1280,900".to_string()]);
		Self::with_capabilities(endpoint, request.capabilities.always_match)
	}

	/// Creates a launcher with caller-provided `alwaysMatch` capabilities.
	pub fn with_capabilities(endpoint: &str, capabilities: Map<String, Value>) -> Result<Self> {
		Ok(Self {
			endpoint: normalize_endpoint(endpoint)?,
			capabilities,
		})
	}

	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}
}

#[async_trait]
impl Launcher for WebDriverLauncher {
	async fn launch(&self) -> Result<Box<dyn Driver>> {
		let client = WebDriverClient::connect(self.endpoint.clone(), self.capabilities.clone()).await?;
		Ok(Box::new(client))
	}
}

/// A live WebDriver session.
pub struct WebDriverClient {
	http: reqwest::Client,
	endpoint: Url,
	session_id: String,
	closed: AtomicBool,
}

impl WebDriverClient {
	/// Opens a new session on `endpoint`.
	pub async fn connect(endpoint: Url, capabilities: Map<String, Value>) -> Result<Self> {
		let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
		let body = serde_json::to_value(NewSessionRequest::with_capabilities(capabilities))?;
		let created: NewSessionResponse = send(&http, Method::POST, endpoint.join("session")?, Some(body)).await?;

		debug!(target = "twofa.driver", endpoint = %endpoint, session = %created.session_id, "webdriver session created");

		Ok(Self {
			http,
			endpoint,
			session_id: created.session_id,
			closed: AtomicBool::new(false),
		})
	}

	pub fn session_id(&self) -> &str {
		&self.session_id
	}

	async fn command<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(DriverError::SessionClosed);
		}
		let url = self.endpoint.join(&format!("session/{}/{}", self.session_id, path))?;
		send(&self.http, method, url, body).await
	}
}

#[async_trait]
impl Driver for WebDriverClient {
	async fn navigate(&self, url: &str) -> Result<()> {
		let body = serde_json::to_value(NavigateRequest { url: url.to_string() })?;
		let _: Value = self.command(Method::POST, "url", Some(body)).await?;
		Ok(())
	}

	async fn find_element(&self, selector: &str) -> Result<Option<Element>> {
		let body = serde_json::to_value(FindElementRequest::css(selector))?;
		match self.command::<ElementReference>(Method::POST, "element", Some(body)).await {
			Ok(reference) => Ok(Some(Element::new(reference.id, selector))),
			Err(DriverError::NoSuchElement(_)) => Ok(None),
			Err(err) => Err(err),
		}
	}

	async fn find_elements(&self, selector: &str) -> Result<Vec<Element>> {
		let body = serde_json::to_value(FindElementRequest::css(selector))?;
		let references: Vec<ElementReference> = self.command(Method::POST, "elements", Some(body)).await?;
		Ok(references.into_iter().map(|reference| Element::new(reference.id, selector)).collect())
	}

	async fn click(&self, element: &Element) -> Result<()> {
		let _: Value = self
			.command(Method::POST, &format!("element/{}/click", element.id()), Some(json!({})))
			.await?;
		Ok(())
	}

	async fn send_keys(&self, element: &Element, text: &str) -> Result<()> {
		let body = serde_json::to_value(SendKeysRequest { text: text.to_string() })?;
		let _: Value = self.command(Method::POST, &format!("element/{}/value", element.id()), Some(body)).await?;
		Ok(())
	}

	async fn text(&self, element: &Element) -> Result<String> {
		self.command(Method::GET, &format!("element/{}/text", element.id()), None).await
	}

	async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
		let body = serde_json::to_value(ExecuteScriptRequest {
			script: script.to_string(),
			args,
		})?;
		self.command(Method::POST, "execute/sync", Some(body)).await
	}

	async fn quit(&self) -> Result<()> {
		if self.closed.swap(true, Ordering::SeqCst) {
			return Ok(());
		}
		let url = self.endpoint.join(&format!("session/{}", self.session_id))?;
		let _: Value = send(&self.http, Method::DELETE, url, None).await?;
		debug!(target = "twofa.driver", session = %self.session_id, "webdriver session deleted");
		Ok(())
	}
}

async fn send<T: DeserializeOwned>(http: &reqwest::Client, method: Method, url: Url, body: Option<Value>) -> Result<T> {
	let mut request = http.request(method, url);
	if let Some(body) = body {
		request = request.json(&body);
	}

	let response = request.send().await?;
	let status = response.status();
	let bytes = response.bytes().await?;

	if !status.is_success() {
		return Err(match serde_json::from_slice::<ValueEnvelope<ErrorBody>>(&bytes) {
			Ok(envelope) => DriverError::from(envelope.value),
			Err(_) => DriverError::InvalidResponse(format!("HTTP {status}: {}", String::from_utf8_lossy(&bytes))),
		});
	}

	let envelope: ValueEnvelope<T> = serde_json::from_slice(&bytes)?;
	Ok(envelope.value)
}

/// Ensures the endpoint ends with `/` so relative command paths join under it.
fn normalize_endpoint(endpoint: &str) -> Result<Url> {
	let mut url = Url::parse(endpoint)?;
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());
		url.set_path(&path);
	}
	Ok(url)
}

//! HTTP clients for the embedding, rerank, and chat completion services.

pub mod embedding;
pub mod generation;
pub mod rerank;

pub use generation::{ChatMessage, Role};
pub use rerank::RankedDocument;

use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

/// Where and how to reach one provider endpoint.
pub(crate) struct Endpoint<'a> {
	pub(crate) api_base: &'a str,
	pub(crate) path: &'a str,
	pub(crate) api_key: &'a str,
	pub(crate) default_headers: &'a Map<String, Value>,
	pub(crate) timeout_ms: u64,
}
impl Endpoint<'_> {
	/// Posts `body` and returns the decoded JSON reply. Non-success statuses are errors.
	pub(crate) async fn post_json(&self, body: &Value) -> Result<Value> {
		let client = Client::builder().timeout(Duration::from_millis(self.timeout_ms)).build()?;
		let res = client
			.post(format!("{}{}", self.api_base, self.path))
			.headers(auth_headers(self.api_key, self.default_headers)?)
			.json(body)
			.send()
			.await?;

		Ok(res.error_for_status()?.json().await?)
	}
}

/// Bearer authorization plus the configured extra headers. Header values must be strings.
pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let raw = value
			.as_str()
			.ok_or_else(|| eyre::eyre!("Default header {key} must be a string."))?;

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

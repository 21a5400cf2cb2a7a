use std::{collections::BTreeSet, time::Duration};

use reqwest::{
	Client,
	header::{HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

use crate::{Error, IndexMatch, Result};

const API_KEY_HEADER: &str = "api-key";

/// Client for a Pinecone index data plane, addressed by its host URL.
pub struct PineconeIndex {
	client: Client,
	host: String,
	headers: HeaderMap,
}
impl PineconeIndex {
	pub fn new(cfg: &lore_config::Pinecone) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = api_headers(&cfg.api_key, &cfg.default_headers)?;

		Ok(Self { client, host: cfg.host.trim_end_matches('/').to_string(), headers })
	}

	/// Lists the namespaces the index statistics report, sorted.
	pub async fn describe_namespaces(&self) -> Result<Vec<String>> {
		let url = format!("{}/describe_index_stats", self.host);
		let res = self
			.client
			.post(url)
			.headers(self.headers.clone())
			.json(&serde_json::json!({}))
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;

		Ok(parse_namespaces(&json))
	}

	pub async fn query(
		&self,
		vector: &[f32],
		top_k: u32,
		namespace: &str,
		include_metadata: bool,
	) -> Result<Vec<IndexMatch>> {
		let url = format!("{}/query", self.host);
		let body = serde_json::json!({
			"vector": vector,
			"topK": top_k,
			"namespace": namespace,
			"includeMetadata": include_metadata,
			"includeValues": false,
		});
		let res = self.client.post(url).headers(self.headers.clone()).json(&body).send().await?;
		let json: Value = res.error_for_status()?.json().await?;

		parse_matches(json)
	}
}

fn api_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(API_KEY_HEADER, api_key.parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

fn parse_namespaces(json: &Value) -> Vec<String> {
	json.get("namespaces")
		.and_then(Value::as_object)
		.map(|namespaces| namespaces.keys().cloned().collect::<BTreeSet<_>>())
		.unwrap_or_default()
		.into_iter()
		.collect()
}

fn parse_matches(json: Value) -> Result<Vec<IndexMatch>> {
	let Some(matches) = json.get("matches") else {
		return Ok(Vec::new());
	};
	let matches = matches.as_array().ok_or_else(|| Error::InvalidResponse {
		message: "Query response matches must be an array.".to_string(),
	})?;
	let mut out = Vec::with_capacity(matches.len());

	for item in matches {
		let id = item.get("id").and_then(Value::as_str).ok_or_else(|| Error::InvalidResponse {
			message: "Query match is missing id.".to_string(),
		})?;
		let score =
			item.get("score").and_then(Value::as_f64).ok_or_else(|| Error::InvalidResponse {
				message: format!("Query match {id} is missing score."),
			})?;
		let metadata = item.get("metadata").and_then(Value::as_object).cloned().unwrap_or_default();

		out.push(IndexMatch { id: id.to_string(), score: score as f32, metadata });
	}

	Ok(out)
}

use color_eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Endpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	System,
	User,
	Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub role: Role,
	pub content: String,
}
impl ChatMessage {
	pub fn system(content: impl Into<String>) -> Self {
		Self { role: Role::System, content: content.into() }
	}

	pub fn user(content: impl Into<String>) -> Self {
		Self { role: Role::User, content: content.into() }
	}
}

/// Sends a chat completion request and returns the text of the first choice.
///
/// A `None` temperature is left out of the request body so the provider default applies.
pub async fn complete(
	cfg: &lore_config::LlmProviderConfig,
	messages: &[ChatMessage],
	temperature: Option<f32>,
) -> Result<String> {
	let endpoint = Endpoint {
		api_base: &cfg.api_base,
		path: &cfg.path,
		api_key: &cfg.api_key,
		default_headers: &cfg.default_headers,
		timeout_ms: cfg.timeout_ms,
	};
	let mut body = serde_json::json!({
		"model": cfg.model,
		"messages": messages,
	});

	if let Some(temperature) = temperature {
		body["temperature"] = serde_json::json!(temperature);
	}

	parse_completion_text(endpoint.post_json(&body).await?)
}

fn parse_completion_text(json: Value) -> Result<String> {
	let choice = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.ok_or_else(|| eyre::eyre!("Completion response has no choices."))?;
	let content = choice
		.get("message")
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| eyre::eyre!("Completion choice is missing message content."))?;

	Ok(content.to_string())
}

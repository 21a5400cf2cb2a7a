use color_eyre::{Result, eyre};
use serde::Deserialize;
use serde_json::Value;

use crate::Endpoint;

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
	index: Option<usize>,
	embedding: Vec<f32>,
}

/// Embeds `texts` with an OpenAI-compatible endpoint, one vector per input in input order.
pub async fn embed(
	cfg: &lore_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let endpoint = Endpoint {
		api_base: &cfg.api_base,
		path: &cfg.path,
		api_key: &cfg.api_key,
		default_headers: &cfg.default_headers,
		timeout_ms: cfg.timeout_ms,
	};
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let vectors = parse_embedding_response(endpoint.post_json(&body).await?)?;

	if vectors.len() != texts.len() {
		return Err(eyre::eyre!(
			"Embedding response has {} vectors for {} inputs.",
			vectors.len(),
			texts.len()
		));
	}

	Ok(vectors)
}

/// Scales `vec` to unit length in place. Zero vectors are left unchanged.
pub fn normalize(vec: &mut [f32]) {
	let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();

	if norm > f32::EPSILON {
		vec.iter_mut().for_each(|v| *v /= norm);
	}
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let response: EmbeddingResponse = serde_json::from_value(json)
		.map_err(|err| eyre::eyre!("Malformed embedding response: {err}."))?;
	let mut items: Vec<(usize, Vec<f32>)> = response
		.data
		.into_iter()
		.enumerate()
		.map(|(position, item)| (item.index.unwrap_or(position), item.embedding))
		.collect();

	items.sort_by_key(|(index, _)| *index);

	Ok(items.into_iter().map(|(_, embedding)| embedding).collect())
}

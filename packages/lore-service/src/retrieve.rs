use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use lore_index::IndexMatch;
use lore_providers::embedding;

use crate::{Error, LoreService, Result, retry};

/// A retrieved document chunk, tagged with the namespace it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
	pub id: String,
	pub namespace: String,
	pub score: f32,
	/// Empty when the match carries no string under the configured text key.
	pub text: String,
	pub metadata: Map<String, Value>,
}
impl Passage {
	pub fn from_match(namespace: &str, hit: IndexMatch, text_key: &str) -> Self {
		let text = hit.metadata.get(text_key).and_then(Value::as_str).unwrap_or_default().to_string();

		Self { id: hit.id, namespace: namespace.to_string(), score: hit.score, text, metadata: hit.metadata }
	}
}

impl LoreService {
	/// Embeds `query_text` once and collects the nearest `per_namespace` matches from each
	/// namespace in order.
	///
	/// The result keeps per-namespace rank order; there is no cross-namespace sort.
	pub async fn search_namespaces(
		&self,
		query_text: &str,
		namespaces: &[String],
		per_namespace: u32,
	) -> Result<Vec<Passage>> {
		if namespaces.is_empty() {
			return Ok(Vec::new());
		}

		let vector = self.embed_query(query_text).await?;
		let text_key = self.cfg.pipeline.text_key.as_str();
		let index = &self.index;
		let mut passages = Vec::new();

		for namespace in namespaces {
			let matches = retry::with_retries(self.retry_policy(), "index_query", || {
				index.query(&vector, per_namespace, namespace, true)
			})
			.await
			.map_err(Error::index)?;

			tracing::debug!(namespace = namespace.as_str(), count = matches.len(), "Namespace searched.");

			passages.extend(matches.into_iter().map(|hit| Passage::from_match(namespace, hit, text_key)));
		}

		Ok(passages)
	}

	async fn embed_query(&self, query_text: &str) -> Result<Vec<f32>> {
		let cfg = &self.cfg.providers.embedding;
		let embedder = &self.providers.embedding;
		let input = [query_text.to_string()];
		let vectors =
			retry::with_retries(self.retry_policy(), "embed", || embedder.embed(cfg, &input)).await?;
		let Some(mut vector) = vectors.into_iter().next() else {
			return Err(Error::Provider { message: "Embedding response is empty.".to_string() });
		};

		if vector.len() != cfg.dimensions as usize {
			return Err(Error::Provider {
				message: format!(
					"Embedding dimension mismatch: expected {}, got {}.",
					cfg.dimensions,
					vector.len()
				),
			});
		}

		embedding::normalize(&mut vector);

		Ok(vector)
	}
}

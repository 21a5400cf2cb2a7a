// crates.io
use color_eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use serde_json::Value;
// self
use crate::Endpoint;

/// One entry of a rerank ranking, referring back to the submitted document by position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
	pub index: usize,
	pub relevance_score: f32,
}

/// Scores `docs` against `query` and returns at most `top_n` entries, most relevant first.
pub async fn rerank(
	cfg: &lore_config::ProviderConfig,
	query: &str,
	docs: &[String],
	top_n: usize,
) -> Result<Vec<RankedDocument>> {
	let endpoint = Endpoint {
		api_base: &cfg.api_base,
		path: &cfg.path,
		api_key: &cfg.api_key,
		default_headers: &cfg.default_headers,
		timeout_ms: cfg.timeout_ms,
	};
	let body = serde_json::json!({
		"model": cfg.model,
		"query": query,
		"documents": docs,
		"top_n": top_n,
	});
	parse_rerank_response(endpoint.post_json(&body).await?, top_n)
}

fn parse_rerank_response(json: Value, top_n: usize) -> Result<Vec<RankedDocument>> {
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Rerank response is missing results array."))?;
	let mut ranked = Vec::with_capacity(results.len());

	for item in results {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.ok_or_else(|| eyre::eyre!("Rerank result missing index."))? as usize;
		let relevance_score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| eyre::eyre!("Rerank result missing score."))? as f32;

		ranked.push(RankedDocument { index, relevance_score });
	}

	// The service's order is the ranking; scores are carried but never re-sorted.
	ranked.truncate(top_n);

	Ok(ranked)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_service_order_and_truncates() {
		let json = serde_json::json!({
			"results": [
				{ "index": 1, "relevance_score": 0.2 },
				{ "index": 0, "relevance_score": 0.9 },
				{ "index": 2, "relevance_score": 0.5 }
			]
		});
		let ranked = parse_rerank_response(json, 2).expect("parse failed");

		assert_eq!(ranked.iter().map(|r| r.index).collect::<Vec<_>>(), vec![1, 0]);
		assert_eq!(ranked[0].relevance_score, 0.2);
	}

	#[test]
	fn accepts_data_and_score_aliases() {
		let json = serde_json::json!({ "data": [{ "index": 3, "score": 0.4 }] });
		let ranked = parse_rerank_response(json, 10).expect("parse failed");

		assert_eq!(ranked, vec![RankedDocument { index: 3, relevance_score: 0.4 }]);
	}

	#[test]
	fn missing_index_is_an_error() {
		let json = serde_json::json!({ "results": [{ "relevance_score": 0.4 }] });

		assert!(parse_rerank_response(json, 10).is_err());
	}
}

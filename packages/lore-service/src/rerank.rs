use lore_providers::RankedDocument;

use crate::{Error, LoreService, Passage, Result, retry};

impl LoreService {
	/// Reorders `passages` by relevance to `query` and keeps at most `top_k`.
	pub async fn rerank(&self, query: &str, passages: Vec<Passage>, top_k: usize) -> Result<Vec<Passage>> {
		if passages.is_empty() {
			return Ok(Vec::new());
		}

		let cfg = &self.cfg.providers.rerank;
		let reranker = &self.providers.rerank;
		let docs: Vec<String> = passages.iter().map(|passage| passage.text.clone()).collect();
		let ranking = retry::with_retries(self.retry_policy(), "rerank", || {
			reranker.rerank(cfg, query, &docs, top_k)
		})
		.await?;
		let ranked = order_by_ranking(passages, &ranking, top_k)?;

		tracing::debug!(count = ranked.len(), "Passages reranked.");

		Ok(ranked)
	}
}

fn order_by_ranking(
	passages: Vec<Passage>,
	ranking: &[RankedDocument],
	top_k: usize,
) -> Result<Vec<Passage>> {
	let total = passages.len();
	let mut slots: Vec<Option<Passage>> = passages.into_iter().map(Some).collect();
	let mut out = Vec::with_capacity(top_k.min(total));

	for entry in ranking {
		if out.len() == top_k {
			break;
		}

		let Some(slot) = slots.get_mut(entry.index) else {
			return Err(Error::Provider {
				message: format!(
					"Rerank index {} is out of range for {total} documents.",
					entry.index
				),
			});
		};

		match slot.take() {
			Some(passage) => out.push(passage),
			None => tracing::warn!(index = entry.index, "Rerank returned a duplicate index."),
		}
	}

	Ok(out)
}

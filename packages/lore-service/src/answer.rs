use serde::{Deserialize, Serialize};

use crate::{LoreService, Passage, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionRequest {
	#[serde(default)]
	pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
	pub response: String,
}

/// Everything the pipeline decided for one question, up to and including reranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
	pub original_question: String,
	pub rewritten_query: String,
	pub namespaces_used: Vec<String>,
	/// Routing came back empty, so every namespace was searched.
	pub fallback_used: bool,
	pub candidate_count: usize,
	pub top_passages: Vec<Passage>,
}

impl LoreService {
	#[tracing::instrument(name = "search", skip_all, fields(trace_id = %uuid::Uuid::new_v4()))]
	pub async fn search(&self, question: &str) -> Result<SearchOutcome> {
		self.run_search(question).await
	}

	/// Answers `question` from the indexed documents.
	#[tracing::instrument(name = "answer", skip_all, fields(trace_id = %uuid::Uuid::new_v4()))]
	pub async fn answer(&self, question: &str) -> Result<String> {
		let outcome = self.run_search(question).await?;
		let texts: Vec<String> =
			outcome.top_passages.into_iter().map(|passage| passage.text).collect();

		// The user's own wording, not the rewrite, frames the answer.
		self.synthesize(question, &texts).await
	}

	async fn run_search(&self, question: &str) -> Result<SearchOutcome> {
		let pipeline = &self.cfg.pipeline;
		let rewritten_query = self.rewrite(question).await?;
		let universe = self.list_namespaces().await?;
		let routed = self.route(&rewritten_query, &universe, pipeline.ns_top_k as usize).await;
		let fallback_used = routed.is_empty();
		let namespaces_used = if fallback_used { universe } else { routed };

		tracing::info!(namespaces = namespaces_used.len(), fallback_used, "Namespaces selected.");

		let candidates =
			self.search_namespaces(&rewritten_query, &namespaces_used, pipeline.per_namespace).await?;
		let candidate_count = candidates.len();
		let top_passages =
			self.rerank(&rewritten_query, candidates, pipeline.final_k as usize).await?;

		tracing::info!(candidates = candidate_count, ranked = top_passages.len(), "Passages ranked.");

		Ok(SearchOutcome {
			original_question: question.to_string(),
			rewritten_query,
			namespaces_used,
			fallback_used,
			candidate_count,
			top_passages,
		})
	}
}

use lore_providers::ChatMessage;

use crate::{LoreService, Result, retry};

pub const REWRITE_INSTRUCTION: &str = "You rewrite user queries to be clearer and more suitable for document retrieval. Keep the meaning the same, but remove noise and make it concise.";

/// Temperature for the rewrite and routing calls.
pub(crate) const DETERMINISTIC_TEMPERATURE: f32 = 0.0;

impl LoreService {
	/// Turns a raw question into the retrieval query used by every later stage.
	///
	/// There is no fallback to the raw question; a failed completion fails the request.
	pub async fn rewrite(&self, question: &str) -> Result<String> {
		let cfg = &self.cfg.providers.llm;
		let generation = &self.providers.generation;
		let messages = [ChatMessage::system(REWRITE_INSTRUCTION), ChatMessage::user(question)];
		let text = retry::with_retries(self.retry_policy(), "rewrite", || {
			generation.complete(cfg, &messages, Some(DETERMINISTIC_TEMPERATURE))
		})
		.await?;
		let rewritten = text.trim();

		tracing::debug!(rewritten, "Query rewritten.");

		Ok(rewritten.to_string())
	}
}

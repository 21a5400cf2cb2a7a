use lore_providers::ChatMessage;

use crate::{LoreService, Result, retry};

/// Returned without a model call when retrieval found nothing.
pub const NO_CONTEXT_ANSWER: &str = "🔎 Thanks for asking!\n\n## 📭 No matching information\n\nI couldn't find anything in the **knowledge base** that answers this question. The documents I searched don't cover it yet.\n\nTry rephrasing your question or asking about a related **topic** 💡";

impl LoreService {
	/// Writes the final answer to `question` using only `passages` as context.
	pub async fn synthesize(&self, question: &str, passages: &[String]) -> Result<String> {
		if passages.iter().all(|passage| passage.trim().is_empty()) {
			tracing::info!(count = passages.len(), "No passage text; returning the no-context answer.");

			return Ok(NO_CONTEXT_ANSWER.to_string());
		}

		let cfg = &self.cfg.providers.llm;
		let generation = &self.providers.generation;
		let messages = [ChatMessage::user(build_answer_prompt(question, &passages.join("\n")))];
		let text = retry::with_retries(self.retry_policy(), "synthesize", || {
			generation.complete(cfg, &messages, None)
		})
		.await?;

		Ok(unescape_generated(text.trim()))
	}
}

pub fn build_answer_prompt(question: &str, context: &str) -> String {
	format!(
		"You are a friendly, helpful assistant answering questions about a document collection.\n\n\
		Format your answer exactly like this:\n\
		- Start with one emoji and a brief greeting line.\n\
		- Add a ## heading that names the topic and includes one emoji.\n\
		- Write 2-3 short paragraphs, 4-5 sentences in total.\n\
		- Put key terms in **bold**.\n\
		- Use 2-3 emojis in total.\n\
		- Separate paragraphs with a blank line.\n\
		- Never use separator lines such as === or ---.\n\n\
		Use ONLY information from the context below. If the context does not answer the question, say so.\n\n\
		CONTEXT:\n{context}\n\n\
		QUESTION: {question}\n\n\
		Write the answer now, following the format above."
	)
}

/// Turns literal escape sequences that some models emit into the characters they stand for.
///
/// Replacements run in a fixed order: `\n\n`, `\n`, `\'`, `\"`.
pub fn unescape_generated(text: &str) -> String {
	text.replace("\\n\\n", "\n\n").replace("\\n", "\n").replace("\\'", "'").replace("\\\"", "\"")
}

use std::collections::HashSet;

use serde_json::Value;

use lore_providers::ChatMessage;

use crate::{Error, LoreService, Result, retry, rewrite::DETERMINISTIC_TEMPERATURE};

/// Why routing produced nothing. [`LoreService::route`] logs it and returns an empty selection.
#[derive(Debug, thiserror::Error)]
pub enum RoutingDegraded {
	#[error("Routing completion failed: {0}")]
	Generation(String),
	#[error("Routing response is not a JSON array.")]
	Malformed,
}

impl LoreService {
	/// Every namespace the index currently reports, sorted and deduplicated.
	pub async fn list_namespaces(&self) -> Result<Vec<String>> {
		let index = &self.index;
		let mut namespaces = retry::with_retries(self.retry_policy(), "describe_namespaces", || {
			index.describe_namespaces()
		})
		.await
		.map_err(Error::index)?;

		namespaces.sort();
		namespaces.dedup();

		Ok(namespaces)
	}

	/// Asks the language model which namespaces of `universe` are worth searching.
	///
	/// Any failure degrades to an empty selection and is logged, never returned. The call is
	/// made once.
	pub async fn route(&self, rewritten_query: &str, universe: &[String], top_k: usize) -> Vec<String> {
		if universe.is_empty() {
			return Vec::new();
		}

		let messages = [
			ChatMessage::system(routing_instruction(universe, top_k)),
			ChatMessage::user(rewritten_query),
		];
		let routed = match self
			.providers
			.generation
			.complete(&self.cfg.providers.llm, &messages, Some(DETERMINISTIC_TEMPERATURE))
			.await
		{
			Ok(raw) => parse_routed_namespaces(&raw, universe, top_k),
			Err(err) => Err(RoutingDegraded::Generation(err.to_string())),
		};

		match routed {
			Ok(namespaces) => {
				tracing::debug!(?namespaces, "Namespaces routed.");

				namespaces
			},
			Err(err) => {
				tracing::warn!(error = %err, "Namespace routing degraded.");

				Vec::new()
			},
		}
	}
}

pub fn routing_instruction(universe: &[String], top_k: usize) -> String {
	let names = Value::from(universe.to_vec()).to_string();

	format!(
		"You are a routing model for a retrieval system.\n\
		Available namespaces: {names}\n\
		Given the user's query, choose the namespaces most likely to contain relevant documents.\n\
		You MUST return ONLY a JSON array of namespace strings, at most {top_k} namespaces, \
		sorted from most to least relevant.\n\
		Do not add any explanation or extra keys."
	)
}

/// Parses a routing reply into known, unique namespaces in model order, capped at `top_k`.
///
/// Entries that are not strings or not in `universe` are dropped.
pub fn parse_routed_namespaces(
	raw: &str,
	universe: &[String],
	top_k: usize,
) -> std::result::Result<Vec<String>, RoutingDegraded> {
	let parsed: Value =
		serde_json::from_str(strip_code_fence(raw)).map_err(|_| RoutingDegraded::Malformed)?;
	let Value::Array(items) = parsed else {
		return Err(RoutingDegraded::Malformed);
	};
	let known: HashSet<&str> = universe.iter().map(String::as_str).collect();
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for item in &items {
		if out.len() == top_k {
			break;
		}

		let Some(name) = item.as_str() else { continue };

		if known.contains(name) && seen.insert(name) {
			out.push(name.to_string());
		}
	}

	Ok(out)
}

fn strip_code_fence(raw: &str) -> &str {
	let trimmed = raw.trim();
	let Some(rest) = trimmed.strip_prefix("```") else { return trimmed };
	let inner = rest.strip_suffix("```").unwrap_or(rest);
	// Drop the info string, e.g. "json".
	let body = match inner.split_once('\n') {
		Some((info, body)) if info.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body,
		_ => inner,
	};

	body.trim()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn universe() -> Vec<String> {
		["sports", "finance", "energy"].iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn keeps_known_names_in_model_order() {
		let routed = parse_routed_namespaces(r#"["energy", "sports"]"#, &universe(), 4)
			.expect("valid routing");

		assert_eq!(routed, vec!["energy".to_string(), "sports".to_string()]);
	}

	#[test]
	fn drops_unknown_duplicate_and_non_string_entries() {
		let routed = parse_routed_namespaces(
			r#"["energy", 3, "weather", "energy", null, "finance"]"#,
			&universe(),
			4,
		)
		.expect("valid routing");

		assert_eq!(routed, vec!["energy".to_string(), "finance".to_string()]);
	}

	#[test]
	fn truncates_to_top_k() {
		let routed = parse_routed_namespaces(r#"["energy", "sports", "finance"]"#, &universe(), 2)
			.expect("valid routing");

		assert_eq!(routed, vec!["energy".to_string(), "sports".to_string()]);
	}

	#[test]
	fn strips_markdown_fence() {
		let raw = "```json\n[\"finance\"]\n```";

		assert_eq!(
			parse_routed_namespaces(raw, &universe(), 4).expect("valid routing"),
			vec!["finance".to_string()]
		);
		assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
	}

	#[test]
	fn strips_single_line_fence() {
		let raw = r#"```["energy"]```"#;

		assert_eq!(strip_code_fence(raw), r#"["energy"]"#);
		assert_eq!(
			parse_routed_namespaces(raw, &universe(), 4).expect("valid routing"),
			vec!["energy".to_string()]
		);
	}

	#[test]
	fn rejects_prose_and_objects() {
		assert!(matches!(
			parse_routed_namespaces("energy seems best", &universe(), 4),
			Err(RoutingDegraded::Malformed)
		));
		assert!(matches!(
			parse_routed_namespaces(r#"{"namespaces": ["energy"]}"#, &universe(), 4),
			Err(RoutingDegraded::Malformed)
		));
	}

	#[test]
	fn instruction_lists_universe_and_limit() {
		let text = routing_instruction(&universe(), 3);

		assert!(text.contains(r#"["sports","finance","energy"]"#));
		assert!(text.contains("at most 3 namespaces"));
	}
}

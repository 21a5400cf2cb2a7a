use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub index: Index,
	pub providers: Providers,
	#[serde(default)]
	pub pipeline: Pipeline,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	#[serde(default = "default_max_body_bytes")]
	pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
	Pinecone,
	Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Index {
	pub backend: IndexBackend,
	pub pinecone: Option<Pinecone>,
	pub qdrant: Option<Qdrant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pinecone {
	/// Data-plane host of the index, e.g. "https://wiki-embeddings-abc123.svc.pinecone.io".
	pub host: String,
	pub api_key: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	/// Each namespace maps to the collection "<collection_prefix><namespace>".
	#[serde(default)]
	pub collection_prefix: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pipeline {
	pub ns_top_k: u32,
	pub per_namespace: u32,
	pub final_k: u32,
	pub text_key: String,
	pub max_attempts: u32,
	pub retry_backoff_ms: u64,
}
impl Default for Pipeline {
	fn default() -> Self {
		Self {
			ns_top_k: 4,
			per_namespace: 25,
			final_k: 10,
			text_key: "text".to_string(),
			max_attempts: 1,
			retry_backoff_ms: 250,
		}
	}
}

fn default_max_body_bytes() -> usize {
	64 * 1_024
}

//! In-memory collaborators and a ready-made config for exercising the pipeline without network
//! access.

use std::{
	collections::BTreeMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicU32, AtomicUsize, Ordering},
	},
};

use color_eyre::eyre;
use serde_json::{Map, Value};

use lore_config::{
	Config, EmbeddingProviderConfig, Index, IndexBackend, LlmProviderConfig, Pinecone, Pipeline,
	ProviderConfig, Providers as ProvidersConfig, Service,
};
use lore_index::IndexMatch;
use lore_providers::{ChatMessage, RankedDocument, Role};
use lore_service::{
	BoxFuture, EmbeddingProvider, GenerationProvider, LoreService, Providers, RerankProvider,
	VectorIndex, rewrite::REWRITE_INSTRUCTION,
};

pub const TEST_DIMENSIONS: u32 = 4;

pub fn test_config() -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			max_body_bytes: 64 * 1_024,
		},
		index: Index {
			backend: IndexBackend::Pinecone,
			pinecone: Some(Pinecone {
				host: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			}),
			qdrant: None,
		},
		providers: ProvidersConfig {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "test-embed".to_string(),
				dimensions: TEST_DIMENSIONS,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			rerank: ProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/rerank".to_string(),
				model: "test-rerank".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			llm: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/chat/completions".to_string(),
				model: "test-chat".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		pipeline: Pipeline { retry_backoff_ms: 0, ..Pipeline::default() },
	}
}

/// Builds an index match whose metadata carries `text` under the default text key.
pub fn text_match(id: &str, score: f32, text: &str) -> IndexMatch {
	let mut metadata = Map::new();

	metadata.insert("text".to_string(), Value::String(text.to_string()));

	IndexMatch { id: id.to_string(), score, metadata }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryCall {
	pub namespace: String,
	pub top_k: u32,
	pub include_metadata: bool,
	pub vector: Vec<f32>,
}

#[derive(Default)]
pub struct FakeIndex {
	namespaces: BTreeMap<String, Vec<IndexMatch>>,
	describe_fails: bool,
	failing_queries: AtomicU32,
	describe_calls: AtomicUsize,
	queries: Mutex<Vec<QueryCall>>,
}
impl FakeIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_namespace(mut self, name: &str, matches: Vec<IndexMatch>) -> Self {
		self.namespaces.insert(name.to_string(), matches);

		self
	}

	pub fn failing_describe(mut self) -> Self {
		self.describe_fails = true;

		self
	}

	/// The next `count` queries fail before queries start succeeding.
	pub fn failing_queries(self, count: u32) -> Self {
		self.failing_queries.store(count, Ordering::SeqCst);

		self
	}

	pub fn describe_calls(&self) -> usize {
		self.describe_calls.load(Ordering::SeqCst)
	}

	pub fn queries(&self) -> Vec<QueryCall> {
		self.queries.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn queried_namespaces(&self) -> Vec<String> {
		self.queries().into_iter().map(|call| call.namespace).collect()
	}
}
impl VectorIndex for FakeIndex {
	fn describe_namespaces(&self) -> BoxFuture<'_, color_eyre::Result<Vec<String>>> {
		self.describe_calls.fetch_add(1, Ordering::SeqCst);

		let result = if self.describe_fails {
			Err(eyre::eyre!("index unreachable"))
		} else {
			Ok(self.namespaces.keys().cloned().collect())
		};

		Box::pin(async move { result })
	}

	fn query<'a>(
		&'a self,
		vector: &'a [f32],
		top_k: u32,
		namespace: &'a str,
		include_metadata: bool,
	) -> BoxFuture<'a, color_eyre::Result<Vec<IndexMatch>>> {
		self.queries.lock().unwrap_or_else(|err| err.into_inner()).push(QueryCall {
			namespace: namespace.to_string(),
			top_k,
			include_metadata,
			vector: vector.to_vec(),
		});

		let failing =
			self.failing_queries.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
		let result = if failing.is_ok() {
			Err(eyre::eyre!("query timed out"))
		} else {
			Ok(self
				.namespaces
				.get(namespace)
				.map(|matches| matches.iter().take(top_k as usize).cloned().collect())
				.unwrap_or_default())
		};

		Box::pin(async move { result })
	}
}

/// Returns the same non-normalized vector for every text.
pub struct FakeEmbedding {
	dimensions: usize,
	calls: AtomicUsize,
	inputs: Mutex<Vec<String>>,
}
impl FakeEmbedding {
	pub fn new(dimensions: u32) -> Self {
		Self { dimensions: dimensions as usize, calls: AtomicUsize::new(0), inputs: Mutex::new(Vec::new()) }
	}

	/// Every text embedded so far, in call order.
	pub fn inputs(&self) -> Vec<String> {
		self.inputs.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl EmbeddingProvider for FakeEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.inputs.lock().unwrap_or_else(|err| err.into_inner()).extend(texts.iter().cloned());

		let vectors = texts.iter().map(|_| vec![2.0; self.dimensions]).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RerankCall {
	pub query: String,
	pub docs: Vec<String>,
	pub top_n: usize,
}

/// Ranks documents in reverse submission order unless a fixed ranking is set.
#[derive(Default)]
pub struct FakeRerank {
	ranking: Option<Vec<usize>>,
	calls: Mutex<Vec<RerankCall>>,
}
impl FakeRerank {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_ranking(ranking: Vec<usize>) -> Self {
		Self { ranking: Some(ranking), calls: Mutex::new(Vec::new()) }
	}

	pub fn calls(&self) -> Vec<RerankCall> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl RerankProvider for FakeRerank {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
		top_n: usize,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RankedDocument>>> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).push(RerankCall {
			query: query.to_string(),
			docs: docs.to_vec(),
			top_n,
		});

		let order = self.ranking.clone().unwrap_or_else(|| (0..docs.len()).rev().collect());
		let ranked = order
			.into_iter()
			.take(top_n)
			.enumerate()
			.map(|(rank, index)| RankedDocument { index, relevance_score: 1.0 / (rank as f32 + 1.0) })
			.collect();

		Box::pin(async move { Ok(ranked) })
	}
}

/// Which pipeline stage a generation request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	Rewrite,
	Route,
	Answer,
}
impl Stage {
	fn of(messages: &[ChatMessage]) -> Self {
		match messages.first() {
			Some(first) if first.role == Role::System && first.content == REWRITE_INSTRUCTION =>
				Self::Rewrite,
			Some(first) if first.role == Role::System && first.content.contains("routing model") =>
				Self::Route,
			_ => Self::Answer,
		}
	}
}

#[derive(Debug, Clone)]
pub struct GenerationCall {
	pub stage: Stage,
	pub messages: Vec<ChatMessage>,
	pub temperature: Option<f32>,
}

/// Replies per stage. An `Err` reply makes that call fail with the given message.
pub struct ScriptedGeneration {
	rewrite: Result<String, String>,
	route: Result<String, String>,
	answer: Result<String, String>,
	failing_rewrites: AtomicU32,
	calls: Mutex<Vec<GenerationCall>>,
}
impl ScriptedGeneration {
	pub fn new(rewrite: &str, route: &str, answer: &str) -> Self {
		Self {
			rewrite: Ok(rewrite.to_string()),
			route: Ok(route.to_string()),
			answer: Ok(answer.to_string()),
			failing_rewrites: AtomicU32::new(0),
			calls: Mutex::new(Vec::new()),
		}
	}

	pub fn rewrite_error(mut self, message: &str) -> Self {
		self.rewrite = Err(message.to_string());

		self
	}

	pub fn route_error(mut self, message: &str) -> Self {
		self.route = Err(message.to_string());

		self
	}

	pub fn answer_error(mut self, message: &str) -> Self {
		self.answer = Err(message.to_string());

		self
	}

	/// The next `count` rewrite calls fail before the scripted reply is returned.
	pub fn failing_rewrites(self, count: u32) -> Self {
		self.failing_rewrites.store(count, Ordering::SeqCst);

		self
	}

	pub fn calls(&self) -> Vec<GenerationCall> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn calls_for(&self, stage: Stage) -> Vec<GenerationCall> {
		self.calls().into_iter().filter(|call| call.stage == stage).collect()
	}
}
impl GenerationProvider for ScriptedGeneration {
	fn complete<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
		temperature: Option<f32>,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		let stage = Stage::of(messages);

		self.calls.lock().unwrap_or_else(|err| err.into_inner()).push(GenerationCall {
			stage,
			messages: messages.to_vec(),
			temperature,
		});

		let reply = match stage {
			Stage::Rewrite => {
				let failing = self.failing_rewrites.fetch_update(
					Ordering::SeqCst,
					Ordering::SeqCst,
					|left| left.checked_sub(1),
				);

				if failing.is_ok() { Err("rewrite unavailable".to_string()) } else { self.rewrite.clone() }
			},
			Stage::Route => self.route.clone(),
			Stage::Answer => self.answer.clone(),
		};
		let result = reply.map_err(|message| eyre::eyre!(message));

		Box::pin(async move { result })
	}
}

/// A service wired to in-memory collaborators, with handles kept for assertions.
pub struct Harness {
	pub service: LoreService,
	pub index: Arc<FakeIndex>,
	pub embedding: Arc<FakeEmbedding>,
	pub rerank: Arc<FakeRerank>,
	pub generation: Arc<ScriptedGeneration>,
}
impl Harness {
	pub fn new(index: FakeIndex, generation: ScriptedGeneration) -> Self {
		Self::with_config(test_config(), index, FakeRerank::new(), generation)
	}

	pub fn with_config(
		cfg: Config,
		index: FakeIndex,
		rerank: FakeRerank,
		generation: ScriptedGeneration,
	) -> Self {
		let index = Arc::new(index);
		let embedding = Arc::new(FakeEmbedding::new(cfg.providers.embedding.dimensions));
		let rerank = Arc::new(rerank);
		let generation = Arc::new(generation);
		let providers = Providers::new(embedding.clone(), rerank.clone(), generation.clone());
		let service = LoreService::with_providers(cfg, index.clone(), providers);

		Self { service, index, embedding, rerank, generation }
	}
}

pub mod answer;
pub mod error;
pub mod namespaces;
pub mod rerank;
pub mod retrieve;
pub mod rewrite;
pub mod synthesize;

mod retry;

pub use answer::{AnswerResponse, QuestionRequest, SearchOutcome};
pub use error::{Error, Result};
pub use retrieve::Passage;
pub use synthesize::{NO_CONTEXT_ANSWER, unescape_generated};

use std::{future::Future, pin::Pin, sync::Arc};

use lore_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig};
use lore_index::{IndexClient, IndexMatch};
use lore_providers::{ChatMessage, RankedDocument, embedding, generation};

use crate::retry::RetryPolicy;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
		top_n: usize,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RankedDocument>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
		temperature: Option<f32>,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

/// A partitioned nearest-neighbor store. Partitions are called namespaces.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn describe_namespaces(&self) -> BoxFuture<'_, color_eyre::Result<Vec<String>>>;

	fn query<'a>(
		&'a self,
		vector: &'a [f32],
		top_k: u32,
		namespace: &'a str,
		include_metadata: bool,
	) -> BoxFuture<'a, color_eyre::Result<Vec<IndexMatch>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
	pub generation: Arc<dyn GenerationProvider>,
}

pub struct LoreService {
	pub cfg: Config,
	pub index: Arc<dyn VectorIndex>,
	pub providers: Providers,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
		top_n: usize,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RankedDocument>>> {
		Box::pin(lore_providers::rerank::rerank(cfg, query, docs, top_n))
	}
}

impl GenerationProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
		temperature: Option<f32>,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(generation::complete(cfg, messages, temperature))
	}
}

impl VectorIndex for IndexClient {
	fn describe_namespaces(&self) -> BoxFuture<'_, color_eyre::Result<Vec<String>>> {
		Box::pin(async move { Ok(IndexClient::describe_namespaces(self).await?) })
	}

	fn query<'a>(
		&'a self,
		vector: &'a [f32],
		top_k: u32,
		namespace: &'a str,
		include_metadata: bool,
	) -> BoxFuture<'a, color_eyre::Result<Vec<IndexMatch>>> {
		Box::pin(async move {
			Ok(IndexClient::query(self, vector, top_k, namespace, include_metadata).await?)
		})
	}
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		rerank: Arc<dyn RerankProvider>,
		generation: Arc<dyn GenerationProvider>,
	) -> Self {
		Self { embedding, rerank, generation }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);
		Self { embedding: provider.clone(), rerank: provider.clone(), generation: provider }
	}
}

impl LoreService {
	/// Connects the index backend selected in `cfg` and uses the HTTP providers.
	pub fn new(cfg: Config) -> Result<Self> {
		let index = IndexClient::from_config(&cfg.index)?;

		Ok(Self { cfg, index: Arc::new(index), providers: Providers::default() })
	}

	pub fn with_providers(cfg: Config, index: Arc<dyn VectorIndex>, providers: Providers) -> Self {
		Self { cfg, index, providers }
	}

	pub(crate) fn retry_policy(&self) -> RetryPolicy {
		RetryPolicy::from_config(&self.cfg.pipeline)
	}
}

pub mod error;
pub mod pinecone;
pub mod qdrant;

pub use error::{Error, Result};
pub use pinecone::PineconeIndex;
pub use qdrant::QdrantIndex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use lore_config::IndexBackend;

/// A nearest-neighbor hit inside one namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMatch {
	pub id: String,
	pub score: f32,
	#[serde(default)]
	pub metadata: Map<String, Value>,
}

/// The index backend selected by `index.backend`.
pub enum IndexClient {
	Pinecone(PineconeIndex),
	Qdrant(QdrantIndex),
}
impl IndexClient {
	pub fn from_config(cfg: &lore_config::Index) -> Result<Self> {
		match cfg.backend {
			IndexBackend::Pinecone => {
				let pinecone = cfg.pinecone.as_ref().ok_or_else(|| Error::InvalidConfig {
					message: "index.pinecone is required for the pinecone backend.".to_string(),
				})?;

				Ok(Self::Pinecone(PineconeIndex::new(pinecone)?))
			},
			IndexBackend::Qdrant => {
				let qdrant = cfg.qdrant.as_ref().ok_or_else(|| Error::InvalidConfig {
					message: "index.qdrant is required for the qdrant backend.".to_string(),
				})?;

				Ok(Self::Qdrant(QdrantIndex::new(qdrant)?))
			},
		}
	}

	pub async fn describe_namespaces(&self) -> Result<Vec<String>> {
		match self {
			Self::Pinecone(index) => index.describe_namespaces().await,
			Self::Qdrant(index) => index.describe_namespaces().await,
		}
	}

	pub async fn query(
		&self,
		vector: &[f32],
		top_k: u32,
		namespace: &str,
		include_metadata: bool,
	) -> Result<Vec<IndexMatch>> {
		match self {
			Self::Pinecone(index) => index.query(vector, top_k, namespace, include_metadata).await,
			Self::Qdrant(index) => index.query(vector, top_k, namespace, include_metadata).await,
		}
	}
}

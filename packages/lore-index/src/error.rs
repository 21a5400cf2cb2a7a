use qdrant_client::QdrantError;
use reqwest::header::{InvalidHeaderName, InvalidHeaderValue};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Index request failed: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] InvalidHeaderValue),
	#[error("Qdrant request failed: {0}")]
	Qdrant(Box<QdrantError>),
	#[error("{message}")]
	InvalidConfig { message: String },
	/// The backend answered, but not in the expected shape.
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl From<QdrantError> for Error {
	fn from(err: QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}

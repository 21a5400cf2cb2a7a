pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures that abort a request.
///
/// Routing problems and empty inputs never show up here; they resolve to fallbacks inside the
/// pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Index error: {message}")]
	Index { message: String },
}
impl Error {
	pub(crate) fn index(err: impl std::fmt::Display) -> Self {
		Self::Index { message: err.to_string() }
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<lore_index::Error> for Error {
	fn from(err: lore_index::Error) -> Self {
		Self::index(err)
	}
}

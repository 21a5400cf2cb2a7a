mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Index, IndexBackend, LlmProviderConfig, Pinecone, Pipeline,
	ProviderConfig, Providers, Qdrant, Service,
};

use std::{env, fs, net::SocketAddr, path::Path};

pub const ENV_PINECONE_API_KEY: &str = "LORE_PINECONE_API_KEY";
pub const ENV_EMBEDDING_API_KEY: &str = "LORE_EMBEDDING_API_KEY";
pub const ENV_RERANK_API_KEY: &str = "LORE_RERANK_API_KEY";
pub const ENV_LLM_API_KEY: &str = "LORE_LLM_API_KEY";
pub const ENV_LOG_LEVEL: &str = "LORE_LOG_LEVEL";
pub const ENV_HTTP_BIND: &str = "LORE_HTTP_BIND";

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	apply_env_overrides(&mut cfg, |key| env::var(key).ok());
	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

/// Overrides secrets and deployment settings from the environment.
///
/// `lookup` is the variable source; [`load`] passes the process environment.
pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F)
where
	F: Fn(&str) -> Option<String>,
{
	let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

	if let Some(v) = read(ENV_PINECONE_API_KEY)
		&& let Some(pinecone) = cfg.index.pinecone.as_mut()
	{
		pinecone.api_key = v;
	}
	if let Some(v) = read(ENV_EMBEDDING_API_KEY) {
		cfg.providers.embedding.api_key = v;
	}
	if let Some(v) = read(ENV_RERANK_API_KEY) {
		cfg.providers.rerank.api_key = v;
	}
	if let Some(v) = read(ENV_LLM_API_KEY) {
		cfg.providers.llm.api_key = v;
	}
	if let Some(v) = read(ENV_LOG_LEVEL) {
		cfg.service.log_level = v;
	}
	if let Some(v) = read(ENV_HTTP_BIND) {
		cfg.service.http_bind = v;
	}
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.parse::<SocketAddr>().is_err() {
		return Err(Error::Validation {
			message: "service.http_bind must be a socket address.".to_string(),
		});
	}
	if cfg.service.max_body_bytes == 0 {
		return Err(Error::Validation {
			message: "service.max_body_bytes must be greater than zero.".to_string(),
		});
	}

	match cfg.index.backend {
		IndexBackend::Pinecone => {
			let Some(pinecone) = cfg.index.pinecone.as_ref() else {
				return Err(Error::Validation {
					message: "index.pinecone is required when index.backend is pinecone."
						.to_string(),
				});
			};

			if pinecone.host.trim().is_empty() {
				return Err(Error::Validation {
					message: "index.pinecone.host must be non-empty.".to_string(),
				});
			}
			if pinecone.api_key.trim().is_empty() {
				return Err(Error::Validation {
					message: "index.pinecone.api_key must be non-empty.".to_string(),
				});
			}
			if pinecone.timeout_ms == 0 {
				return Err(Error::Validation {
					message: "index.pinecone.timeout_ms must be greater than zero.".to_string(),
				});
			}
		},
		IndexBackend::Qdrant => {
			let Some(qdrant) = cfg.index.qdrant.as_ref() else {
				return Err(Error::Validation {
					message: "index.qdrant is required when index.backend is qdrant.".to_string(),
				});
			};

			if qdrant.url.trim().is_empty() {
				return Err(Error::Validation {
					message: "index.qdrant.url must be non-empty.".to_string(),
				});
			}
			if qdrant.timeout_ms == 0 {
				return Err(Error::Validation {
					message: "index.qdrant.timeout_ms must be greater than zero.".to_string(),
				});
			}
		},
	}

	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("rerank", &cfg.providers.rerank.api_key),
		("llm", &cfg.providers.llm.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}
	for (label, base) in [
		("embedding", &cfg.providers.embedding.api_base),
		("rerank", &cfg.providers.rerank.api_base),
		("llm", &cfg.providers.llm.api_base),
	] {
		if base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_base must be non-empty."),
			});
		}
	}
	for (label, timeout_ms) in [
		("embedding", cfg.providers.embedding.timeout_ms),
		("rerank", cfg.providers.rerank.timeout_ms),
		("llm", cfg.providers.llm.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
	}

	for (label, value) in [
		("pipeline.ns_top_k", cfg.pipeline.ns_top_k),
		("pipeline.per_namespace", cfg.pipeline.per_namespace),
		("pipeline.final_k", cfg.pipeline.final_k),
		("pipeline.max_attempts", cfg.pipeline.max_attempts),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	if cfg.pipeline.text_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "pipeline.text_key must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if let Some(pinecone) = cfg.index.pinecone.as_mut() {
		pinecone.host = pinecone.host.trim().trim_end_matches('/').to_string();
	}
	if let Some(qdrant) = cfg.index.qdrant.as_mut() {
		qdrant.url = qdrant.url.trim().to_string();
	}

	for base in [
		&mut cfg.providers.embedding.api_base,
		&mut cfg.providers.rerank.api_base,
		&mut cfg.providers.llm.api_base,
	] {
		*base = base.trim().trim_end_matches('/').to_string();
	}
}

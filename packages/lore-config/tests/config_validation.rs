use std::{
	collections::HashMap,
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use lore_config::{Config, IndexBackend};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with<F>(edit: F) -> String
where
	F: FnOnce(&mut toml::Table),
{
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value.as_table_mut().expect("Template config must be a table.");

	edit(root);

	toml::to_string(&value).expect("Failed to render template config.")
}

fn section<'a>(root: &'a mut toml::Table, path: &[&str]) -> &'a mut toml::Table {
	let mut table = root;

	for key in path {
		table = table
			.get_mut(*key)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{key}]."));
	}

	table
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("lore_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn lore_example_toml_is_valid() {
	let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

	path.push("../../lore.example.toml");

	let cfg = lore_config::load(&path).expect("Expected lore.example.toml to be a valid config.");

	assert_eq!(cfg.index.backend, IndexBackend::Pinecone);
	assert_eq!(cfg.pipeline.ns_top_k, 4);
	assert_eq!(cfg.pipeline.per_namespace, 25);
	assert_eq!(cfg.pipeline.final_k, 10);
}

#[test]
fn pipeline_section_defaults_to_reference_parameters() {
	let payload = sample_toml_with(|root| {
		root.remove("pipeline");
	});
	let cfg: Config = toml::from_str(&payload).expect("Failed to parse config.");

	assert_eq!(cfg.pipeline.ns_top_k, 4);
	assert_eq!(cfg.pipeline.per_namespace, 25);
	assert_eq!(cfg.pipeline.final_k, 10);
	assert_eq!(cfg.pipeline.text_key, "text");
	assert_eq!(cfg.pipeline.max_attempts, 1);

	lore_config::validate(&cfg).expect("Defaults must validate.");
}

#[test]
fn load_trims_trailing_slashes_from_endpoints() {
	let payload = sample_toml_with(|root| {
		section(root, &["providers", "llm"])
			.insert("api_base".to_string(), Value::String("https://llm.local/ ".to_string()));
		section(root, &["index", "pinecone"])
			.insert("host".to_string(), Value::String("https://index.local/".to_string()));
	});
	let path = write_temp_config(payload);
	let result = lore_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected config to load.");

	assert_eq!(cfg.providers.llm.api_base, "https://llm.local");
	assert_eq!(cfg.index.pinecone.expect("pinecone section").host, "https://index.local");
}

#[test]
fn http_bind_must_be_socket_address() {
	let mut cfg = base_config();

	cfg.service.http_bind = "localhost".to_string();

	let err = lore_config::validate(&cfg).expect_err("Expected http_bind validation error.");

	assert!(
		err.to_string().contains("service.http_bind must be a socket address."),
		"Unexpected error: {err}"
	);
}

#[test]
fn selected_backend_section_is_required() {
	let mut cfg = base_config();

	cfg.index.backend = IndexBackend::Qdrant;
	cfg.index.qdrant = None;

	let err = lore_config::validate(&cfg).expect_err("Expected missing qdrant section error.");

	assert!(
		err.to_string().contains("index.qdrant is required when index.backend is qdrant."),
		"Unexpected error: {err}"
	);

	let mut cfg = base_config();

	cfg.index.pinecone = None;

	let err = lore_config::validate(&cfg).expect_err("Expected missing pinecone section error.");

	assert!(
		err.to_string().contains("index.pinecone is required when index.backend is pinecone."),
		"Unexpected error: {err}"
	);
}

#[test]
fn unknown_backend_fails_to_parse() {
	let payload = sample_toml_with(|root| {
		section(root, &["index"])
			.insert("backend".to_string(), Value::String("faiss".to_string()));
	});
	let path = write_temp_config(payload);
	let result = lore_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected parse error.");

	assert!(matches!(err, lore_config::Error::ParseConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn pipeline_counts_must_be_positive() {
	for field in ["ns_top_k", "per_namespace", "final_k", "max_attempts"] {
		let mut cfg = base_config();

		match field {
			"ns_top_k" => cfg.pipeline.ns_top_k = 0,
			"per_namespace" => cfg.pipeline.per_namespace = 0,
			"final_k" => cfg.pipeline.final_k = 0,
			_ => cfg.pipeline.max_attempts = 0,
		}

		let err = lore_config::validate(&cfg).expect_err("Expected pipeline validation error.");

		assert!(
			err.to_string().contains(&format!("pipeline.{field} must be greater than zero.")),
			"Unexpected error: {err}"
		);
	}
}

#[test]
fn provider_api_keys_must_be_non_empty() {
	let mut cfg = base_config();

	cfg.providers.rerank.api_key = "  ".to_string();

	let err = lore_config::validate(&cfg).expect_err("Expected api_key validation error.");

	assert!(
		err.to_string().contains("Provider rerank api_key must be non-empty."),
		"Unexpected error: {err}"
	);
}

#[test]
fn env_overrides_replace_secrets_and_ignore_blank_values() {
	let mut cfg = base_config();
	let vars = HashMap::from([
		(lore_config::ENV_LLM_API_KEY, "llm-secret"),
		(lore_config::ENV_PINECONE_API_KEY, "pc-secret"),
		(lore_config::ENV_RERANK_API_KEY, "   "),
		(lore_config::ENV_LOG_LEVEL, "lore_service=debug"),
	]);

	lore_config::apply_env_overrides(&mut cfg, |key| vars.get(key).map(|v| v.to_string()));

	assert_eq!(cfg.providers.llm.api_key, "llm-secret");
	assert_eq!(cfg.index.pinecone.as_ref().expect("pinecone section").api_key, "pc-secret");
	assert_eq!(cfg.providers.rerank.api_key, "set-via-LORE_RERANK_API_KEY");
	assert_eq!(cfg.service.log_level, "lore_service=debug");
}

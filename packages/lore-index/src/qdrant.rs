use std::{collections::HashMap, time::Duration};

use qdrant_client::{
	Qdrant,
	qdrant::{
		ListValue, PointId, Query, QueryPointsBuilder, ScoredPoint, Struct,
		Value as QdrantValue, point_id::PointIdOptions, value::Kind,
	},
};
use serde_json::{Map, Number, Value};

use crate::{IndexMatch, Result};

/// Qdrant-backed index where each namespace is a collection named
/// `<collection_prefix><namespace>`.
pub struct QdrantIndex {
	client: Qdrant,
	collection_prefix: String,
}
impl QdrantIndex {
	pub fn new(cfg: &lore_config::Qdrant) -> Result<Self> {
		let client =
			Qdrant::from_url(&cfg.url).timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { client, collection_prefix: cfg.collection_prefix.clone() })
	}

	pub async fn describe_namespaces(&self) -> Result<Vec<String>> {
		let response = self.client.list_collections().await?;
		let names = response.collections.into_iter().map(|c| c.name).collect::<Vec<_>>();

		Ok(namespaces_from_collections(&self.collection_prefix, names))
	}

	pub async fn query(
		&self,
		vector: &[f32],
		top_k: u32,
		namespace: &str,
		include_metadata: bool,
	) -> Result<Vec<IndexMatch>> {
		let collection = format!("{}{namespace}", self.collection_prefix);
		let search = QueryPointsBuilder::new(collection)
			.query(Query::new_nearest(vector.to_vec()))
			.limit(top_k as u64)
			.with_payload(include_metadata);
		let response = self.client.query(search).await?;

		Ok(response.result.into_iter().filter_map(scored_point_to_match).collect())
	}
}

fn namespaces_from_collections(prefix: &str, names: Vec<String>) -> Vec<String> {
	let mut namespaces = names
		.into_iter()
		.filter_map(|name| name.strip_prefix(prefix).map(str::to_string))
		.filter(|namespace| !namespace.is_empty())
		.collect::<Vec<_>>();

	namespaces.sort();
	namespaces.dedup();

	namespaces
}

fn scored_point_to_match(point: ScoredPoint) -> Option<IndexMatch> {
	let Some(id) = point.id.as_ref().and_then(point_id_to_string) else {
		tracing::warn!("Qdrant point is missing an id.");

		return None;
	};

	Some(IndexMatch { id, score: point.score, metadata: payload_to_json(point.payload) })
}

fn point_id_to_string(point_id: &PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(id)) => Some(id.to_string()),
		None => None,
	}
}

fn payload_to_json(payload: HashMap<String, QdrantValue>) -> Map<String, Value> {
	payload.into_iter().map(|(key, value)| (key, value_to_json(value))).collect()
}

fn value_to_json(value: QdrantValue) -> Value {
	match value.kind {
		None | Some(Kind::NullValue(_)) => Value::Null,
		Some(Kind::BoolValue(v)) => Value::Bool(v),
		Some(Kind::IntegerValue(v)) => Value::Number(v.into()),
		Some(Kind::DoubleValue(v)) => Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null),
		Some(Kind::StringValue(v)) => Value::String(v),
		Some(Kind::ListValue(ListValue { values })) =>
			Value::Array(values.into_iter().map(value_to_json).collect()),
		Some(Kind::StructValue(Struct { fields })) => Value::Object(payload_to_json(fields)),
	}
}

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;

use lore_api::{routes, state::AppState};
use lore_testkit::{FakeIndex, Harness, ScriptedGeneration, text_match};

fn app(index: FakeIndex, generation: ScriptedGeneration) -> Router {
	let harness = Harness::new(index, generation);

	routes::router(AppState::from_service(harness.service), 1_024)
}

fn energy_index() -> FakeIndex {
	FakeIndex::new().with_namespace("energy", vec![text_match("e-1", 0.9, "Solar output.")])
}

fn post_json(uri: &str, payload: String) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(Body::from(payload))
		.expect("Failed to build request.")
}

async fn json_body(response: axum::response::Response) -> Value {
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");

	serde_json::from_slice(&bytes).expect("Response body must be JSON.")
}

#[tokio::test]
async fn health_returns_ok() {
	let response = app(FakeIndex::new(), ScriptedGeneration::new("q", "[]", "a"))
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request."))
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn qa_returns_response_field() {
	let response = app(energy_index(), ScriptedGeneration::new("solar", r#"["energy"]"#, r"Hi!\nSolar."))
		.oneshot(post_json("/api/qa", serde_json::json!({ "message": "What is solar?" }).to_string()))
		.await
		.expect("Failed to call /api/qa.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json_body(response).await, serde_json::json!({ "response": "Hi!\nSolar." }));
}

#[tokio::test]
async fn missing_message_is_treated_as_empty() {
	let generation = ScriptedGeneration::new("", "[]", "a");
	let harness = Harness::new(energy_index(), generation);
	let generation = harness.generation.clone();
	let response = routes::router(AppState::from_service(harness.service), 1_024)
		.oneshot(post_json("/api/qa", "{}".to_string()))
		.await
		.expect("Failed to call /api/qa.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(generation.calls()[0].messages[1].content, "");
}

#[tokio::test]
async fn search_returns_outcome() {
	let response = app(energy_index(), ScriptedGeneration::new("solar", "not json", "a"))
		.oneshot(post_json("/api/search", serde_json::json!({ "message": "solar?" }).to_string()))
		.await
		.expect("Failed to call /api/search.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;

	assert_eq!(body["rewritten_query"], "solar");
	assert_eq!(body["fallback_used"], true);
	assert_eq!(body["namespaces_used"], serde_json::json!(["energy"]));
	assert_eq!(body["top_passages"][0]["id"], "e-1");
}

#[tokio::test]
async fn pipeline_failure_maps_to_generic_bad_gateway() {
	let generation = ScriptedGeneration::new("q", "[]", "a").rewrite_error("secret upstream detail");
	let response = app(energy_index(), generation)
		.oneshot(post_json("/api/qa", serde_json::json!({ "message": "hi" }).to_string()))
		.await
		.expect("Failed to call /api/qa.");

	assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
	assert_eq!(
		json_body(response).await,
		serde_json::json!({
			"error_code": "UPSTREAM_FAILURE",
			"message": "Failed to answer the question."
		})
	);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
	let payload = serde_json::json!({ "message": "x".repeat(4_096) }).to_string();
	let request = Request::builder()
		.method("POST")
		.uri("/api/qa")
		.header("content-type", "application/json")
		.header("content-length", payload.len())
		.body(Body::from(payload))
		.expect("Failed to build request.");
	let response = app(energy_index(), ScriptedGeneration::new("q", "[]", "a"))
		.oneshot(request)
		.await
		.expect("Failed to call /api/qa.");

	assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use lore_service::{AnswerResponse, QuestionRequest, SearchOutcome};

use crate::state::AppState;

const UPSTREAM_FAILURE: &str = "UPSTREAM_FAILURE";
const UPSTREAM_FAILURE_MESSAGE: &str = "Failed to answer the question.";

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/qa", post(qa))
		.route("/api/search", post(search))
		.with_state(state)
		.layer(RequestBodyLimitLayer::new(max_body_bytes))
		.layer(CorsLayer::permissive())
		.layer(TraceLayer::new_for_http())
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn qa(
	State(state): State<AppState>,
	Json(payload): Json<QuestionRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
	let response = state.service.answer(&payload.message).await?;

	Ok(Json(AnswerResponse { response }))
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<QuestionRequest>,
) -> Result<Json<SearchOutcome>, ApiError> {
	let outcome = state.service.search(&payload.message).await?;

	Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<lore_service::Error> for ApiError {
	fn from(err: lore_service::Error) -> Self {
		// Collaborator detail stays in the logs.
		tracing::error!(error = %err, "Pipeline request failed.");

		ApiError::new(StatusCode::BAD_GATEWAY, UPSTREAM_FAILURE, UPSTREAM_FAILURE_MESSAGE)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

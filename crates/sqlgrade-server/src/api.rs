//! HTTP JSON API

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlgrade_core::{ColumnDescriptor, FormattedTable, GradingVerdict, HistoryEntry, Outcome};
use sqlgrade_duck::{ExecutionError, QueryView, SessionError};
use sqlgrade_registry::RegistryError;
use thiserror::Error;
use tracing::{error, Instrument, Level};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to encode metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            // Problems with the learner's SQL are reported back, not logged as faults
            ApiError::Session(SessionError::EmptyQuery)
            | ApiError::Session(SessionError::Execution(ExecutionError::Database(_))) => {
                StatusCode::BAD_REQUEST
            }
            // The query ran but its result cannot be evaluated
            ApiError::Session(SessionError::Execution(ExecutionError::BudgetExceeded(_)))
            | ApiError::Session(SessionError::Decode(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Registry(RegistryError::QuestionNotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub columns: Vec<ColumnDescriptor>,
    pub result: FormattedTable,
    pub row_count: usize,
    pub elapsed_ms: u64,
    /// Non-fatal decode problems, such as columns of unsupported types
    pub warnings: Vec<String>,
}

impl From<QueryView> for QueryResponse {
    fn from(view: QueryView) -> Self {
        Self {
            columns: view.table.columns().to_vec(),
            row_count: view.table.row_count(),
            elapsed_ms: view.elapsed.as_millis() as u64,
            warnings: view
                .table
                .diagnostics()
                .iter()
                .map(ToString::to_string)
                .collect(),
            result: view.rendered,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub question_id: String,
    pub outcome: Outcome,
    pub verdict: GradingVerdict,
    #[serde(flatten)]
    pub query: QueryResponse,
}

/// Question as shown to learners; the reference SQL stays server-side.
#[derive(Debug, Serialize)]
pub struct QuestionSummary {
    pub id: String,
    pub title: String,
    pub prompt: String,
    pub order_sensitive: bool,
    pub column_name_sensitive: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/tables", get(tables))
        .route("/api/questions", get(questions))
        .route("/api/query", post(run_query))
        .route("/api/questions/:id/attempt", post(attempt))
        .route("/api/history", get(history).delete(clear_history))
        .route("/metrics", get(metrics))
        .layer(middleware::from_fn(isolation_headers))
        .with_state(state)
}

/// Cross-origin isolation on every response, plus a request id for tracing.
async fn isolation_headers(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("cross-origin-embedder-policy"),
        HeaderValue::from_static("require-corp"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(HeaderName::from_static("x-request-id"), value);
    }
    response
}

/// Run session work off the async runtime; DuckDB calls block.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, SessionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let history = state.session.history();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "questions": state.questions.len(),
        "history": { "entries": history.len(), "capacity": history.capacity() },
    }))
}

async fn tables(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let session = Arc::clone(&state.session);
    let tables = blocking(move || session.tables()).await?;
    Ok(Json(tables))
}

async fn questions(State(state): State<AppState>) -> Json<Vec<QuestionSummary>> {
    let list = state
        .questions
        .list()
        .iter()
        .map(|q| QuestionSummary {
            id: q.id.clone(),
            title: q.title.clone(),
            prompt: q.prompt.clone(),
            order_sensitive: q.order_sensitive,
            column_name_sensitive: q.column_name_sensitive,
        })
        .collect();
    Json(list)
}

async fn run_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<Json<QueryResponse>> {
    let session = Arc::clone(&state.session);
    let result = blocking(move || session.run(&request.sql)).await;

    match result {
        Ok(view) => {
            state.metrics.record_query(view.elapsed);
            Ok(Json(view.into()))
        }
        Err(err) => {
            state.metrics.record_query_error();
            Err(err)
        }
    }
}

async fn attempt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<Json<AttemptResponse>> {
    let policy = state.questions.get(&id)?.policy();
    let expected = state
        .references
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::Internal(format!("no reference result for question {id}")))?;

    let session = Arc::clone(&state.session);
    let result = blocking(move || session.attempt(&request.sql, &expected, &policy)).await;
    let report = match result {
        Ok(report) => report,
        Err(err) => {
            state.metrics.record_query_error();
            return Err(err);
        }
    };

    let outcome = report.verdict.outcome();
    state.metrics.record_query(report.view.elapsed);
    state.metrics.record_verdict(outcome);
    crate::log_event!(
        level: Level::INFO,
        event: "attempt_graded",
        question: id,
        outcome: outcome
    );

    Ok(Json(AttemptResponse {
        question_id: id,
        outcome,
        verdict: report.verdict,
        query: report.view.into(),
    }))
}

async fn history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(state.session.history().list())
}

async fn clear_history(State(state): State<AppState>) -> StatusCode {
    state.session.history().clear();
    StatusCode::NO_CONTENT
}

async fn metrics(State(state): State<AppState>) -> ApiResult<Response> {
    let (content_type, body) = state.metrics.encode()?;
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

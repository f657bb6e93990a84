//! HTTP API - the REST reference binding for the capture pipeline
//!
//! ## Endpoints
//!
//! - `POST /api/capture` - Capture raw text into a task with micro-steps
//! - `POST /api/clarify` - Answer clarification questions for a task
//! - `GET /api/task/:task_id` - Current snapshot of a captured task
//! - `GET /api/health` - Liveness check
//!
//! Error mapping: `Validation` 400, `TaskNotFound` 404, `ServiceBusy` 503
//! with `Retry-After`, everything else 500. LLM failures never reach this
//! layer; they degrade inside the pipeline.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use entitystore::{ContextProvider, EntityStore, KnowledgeGraphContext};

use crate::config::Config;
use crate::error::CaptureError;
use crate::llm::create_client;
use crate::pipeline::{CapturePipeline, CaptureRequest, CaptureResponse, ClarifyRequest};
use crate::store::{FileSessionStore, SessionStore, StoreError};

/// Shared application state
pub struct AppState {
    pub pipeline: CapturePipeline,
    pub store: Arc<dyn SessionStore>,
    pub knowledge: Arc<dyn ContextProvider>,
    pub default_user: String,
}

impl AppState {
    fn context_for(&self, user: Option<&str>) -> Result<KnowledgeGraphContext, CaptureError> {
        let user = user.unwrap_or(&self.default_user);
        self.knowledge
            .get_context(user)
            .map_err(|e| CaptureError::Context(e.to_string()))
    }
}

/// Build the router over prepared state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/capture", post(capture_handler))
        .route("/api/clarify", post(clarify_handler))
        .route("/api/task/:task_id", get(task_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(config: Config) -> eyre::Result<()> {
    let llm = create_client(&config.llm)?;
    let pipeline = CapturePipeline::new(llm, &config);
    let store = Arc::new(FileSessionStore::open(&config.storage.sessions_dir)?);
    let knowledge = Arc::new(EntityStore::open(&config.knowledge.store_path)?);

    let state = Arc::new(AppState {
        pipeline,
        store,
        knowledge,
        default_user: config.knowledge.default_user.clone(),
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("taskcapture API listening on {}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn capture_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CaptureRequest>,
) -> Result<Json<CaptureResponse>, ApiError> {
    let knowledge = state.context_for(request.user.as_deref())?;
    let (session, response) = state.pipeline.capture(&request, &knowledge).await?;
    state.store.save(&session).await.map_err(CaptureError::from)?;
    Ok(Json(response))
}

async fn clarify_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClarifyRequest>,
) -> Result<Json<CaptureResponse>, ApiError> {
    let mut session = load_session(&state, &request.task_id).await?;
    let knowledge = state.context_for(session.user.as_deref())?;
    let response = state.pipeline.clarify(&mut session, &request.answers, &knowledge).await?;
    state.store.update(&session).await.map_err(CaptureError::from)?;
    Ok(Json(response))
}

async fn task_handler(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<CaptureResponse>, ApiError> {
    let session = load_session(&state, &task_id).await?;
    let knowledge = state.context_for(session.user.as_deref())?;
    Ok(Json(state.pipeline.snapshot(&session, &knowledge)))
}

async fn load_session(state: &AppState, task_id: &str) -> Result<crate::domain::CaptureSession, CaptureError> {
    match state.store.load(task_id).await {
        Ok(session) => Ok(session),
        Err(StoreError::NotFound(id)) => Err(CaptureError::TaskNotFound(id)),
        Err(e) => Err(CaptureError::from(e)),
    }
}

/// Wrapper mapping pipeline errors onto HTTP responses
pub struct ApiError(CaptureError);

impl From<CaptureError> for ApiError {
    fn from(err: CaptureError) -> Self {
        Self(err)
    }
}

/// Status code and optional Retry-After seconds for an error
fn status_for(err: &CaptureError) -> (StatusCode, Option<u64>) {
    match err {
        CaptureError::Validation(_) => (StatusCode::BAD_REQUEST, None),
        CaptureError::TaskNotFound(_) => (StatusCode::NOT_FOUND, None),
        CaptureError::ServiceBusy { retry_after } => (StatusCode::SERVICE_UNAVAILABLE, Some(retry_after.as_secs())),
        CaptureError::Store(_) | CaptureError::Context(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, retry_after) = status_for(&self.0);
        let body = Json(serde_json::json!({
            "error": self.0.to_string(),
            "retryable": self.0.is_retryable(),
        }));

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after
            && let Ok(value) = header::HeaderValue::from_str(&secs.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&CaptureError::Validation("empty".to_string())).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&CaptureError::TaskNotFound("t".to_string())).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&CaptureError::Context("down".to_string())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let (status, retry) = status_for(&CaptureError::ServiceBusy {
            retry_after: Duration::from_secs(5),
        });
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(retry, Some(5));
    }
}

use super::state::ServerState;
use crate::background_jobs::HookEvent;
use crate::engine::RunOutcome;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/v1/users/{user_id}/recommendations",
            get(get_recommendations).delete(clear_user_cache),
        )
        .route(
            "/v1/users/{user_id}/recommendations/precompute",
            post(precompute_recommendations),
        )
        .route("/v1/recommendations", delete(clear_all_caches))
        .route("/v1/catalog/refresh", post(catalog_refresh))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Cache-backed read path. A cache miss yields an empty list, never an
/// error; refresh is owned by the precompute endpoint and the scheduler.
async fn get_recommendations(
    Path(user_id): Path<i64>,
    State(state): State<ServerState>,
) -> Response {
    Json(state.engine.get_recommendations(user_id)).into_response()
}

#[derive(Deserialize)]
struct PrecomputeParams {
    /// 1-based attempt counter supplied by an external scheduler.
    attempt: Option<u32>,
}

/// Trigger one precompute run; the JSON body carries the run status a
/// scheduler needs to decide on retries.
async fn precompute_recommendations(
    Path(user_id): Path<i64>,
    Query(params): Query<PrecomputeParams>,
    State(state): State<ServerState>,
) -> Response {
    let attempt = params.attempt.unwrap_or(1).max(1);
    let engine = state.engine.clone();
    let result = tokio::task::spawn_blocking(move || {
        engine.precompute(user_id, attempt, &CancellationToken::new())
    })
    .await;

    match result {
        Ok(outcome) => {
            let status = match &outcome {
                RunOutcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
                RunOutcome::Retry { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::OK,
            };
            (status, Json(outcome)).into_response()
        }
        Err(e) => {
            error!("Precompute task for user {} panicked: {}", user_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Per-user invalidation hook (logout, forced refresh).
async fn clear_user_cache(
    Path(user_id): Path<i64>,
    State(state): State<ServerState>,
) -> StatusCode {
    state.engine.clear_cache(Some(user_id));
    StatusCode::NO_CONTENT
}

/// Global invalidation hook.
async fn clear_all_caches(State(state): State<ServerState>) -> StatusCode {
    state.engine.clear_cache(None);
    StatusCode::NO_CONTENT
}

/// Catalog refresh notification: drop every cached list and let the
/// scheduler recompute through the OnCatalogChange hook.
async fn catalog_refresh(State(state): State<ServerState>) -> StatusCode {
    state.engine.clear_cache(None);
    if state.hook_sender.send(HookEvent::OnCatalogChange).await.is_err() {
        warn!("Scheduler hook channel closed, skipping OnCatalogChange");
    }
    StatusCode::ACCEPTED
}

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use models::User;
use service::store::UserStore;

use crate::errors::ApiError;
use crate::ratelimit::{self, FixedWindowLimiter};

/// Shared handler state. The store is injected behind the trait so tests
/// and alternate backends can swap it without touching the router.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub limiter: Arc<FixedWindowLimiter>,
}

pub async fn health() -> Json<Health> {
    Json(Health { message: "UP" })
}

/// Ids come in as raw path segments; anything that does not parse as an
/// integer behaves like an id no record can have.
fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse().map_err(|_| ApiError::UserNotFound)
}

async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<User>) {
    let user = state.store.create(body).await;
    (StatusCode::CREATED, Json(user))
}

async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.store.list().await)
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.get(id).await?))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.update(id, body).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.store.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Build the full application router: health, the user CRUD surface, and a
/// JSON 404 fallback, all gated by the per-client rate limit.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/users", get(list_users).post(create_user))
        .route(
            "/v1/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .fallback(not_found)
        // quota is consumed on every request, matched or not
        .layer(middleware::from_fn_with_state(state.clone(), ratelimit::enforce))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

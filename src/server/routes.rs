//! server::routes
//!
//! Router and request handlers.
//!
//! Routes:
//! - `GET|POST|DELETE /api/cms/auth`  - Credential status, save, clear
//! - `POST /api/cms/push`             - Publish pending content
//! - `POST /api/cms/reset`            - Discard local changes and pull
//! - `GET|PUT|PATCH /api/cms/locales` - Locale registry
//! - `PUT|PATCH /api/cms/projects`    - Project listing and slug renames
//! - `GET /api/cms/health`            - Liveness
//!
//! Handlers that mutate the working tree hold the
//! [`WorktreeLock`](crate::core::ops::WorktreeLock) until they return.
//! File reads and writes (credential store, content documents, the lock
//! itself) run on the blocking pool, never on an async worker.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument};

use super::error::ApiError;
use super::AppState;
use crate::core::ops::WorktreeLock;

type ApiResult = Result<Json<Value>, ApiError>;

/// Build the router with all CMS routes and shared state.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/cms/auth", any(handle_auth))
        .route("/api/cms/push", post(handle_push))
        .route("/api/cms/reset", post(handle_reset))
        .route("/api/cms/locales", any(handle_locales))
        .route("/api/cms/projects", any(handle_projects))
        .route("/api/cms/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse a JSON body; an empty body reads as `null`.
fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid payload"))
}

/// Run synchronous file work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal("Background task failed", e))?
}

async fn lock_worktree(state: &Arc<AppState>) -> Result<WorktreeLock, ApiError> {
    let state = Arc::clone(state);
    blocking(move || Ok(WorktreeLock::acquire(&state.paths)?)).await
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

#[instrument(skip_all, fields(%method))]
async fn handle_auth(State(state): State<Arc<AppState>>, method: Method, body: Bytes) -> ApiResult {
    match method {
        Method::GET => auth_status(&state).await,
        Method::POST => auth_save(&state, &parse_body(&body)?).await,
        Method::DELETE => {
            let store = Arc::clone(&state.credentials);
            blocking(move || Ok(store.clear()?)).await?;
            info!("credential cleared");
            Ok(Json(json!({ "ok": true, "hasToken": false })))
        }
        _ => Err(ApiError::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
        )),
    }
}

async fn auth_status(state: &AppState) -> ApiResult {
    let store = Arc::clone(&state.credentials);
    let Some(credential) = blocking(move || Ok(store.read()?)).await? else {
        return Ok(Json(json!({ "hasToken": false })));
    };

    match state.verifier.fetch_identity(&credential).await {
        Ok(user) => Ok(Json(json!({ "hasToken": true, "user": user }))),
        Err(err) => {
            debug!(error = %err, "identity lookup failed for stored credential");
            Ok(Json(json!({ "hasToken": true })))
        }
    }
}

async fn auth_save(state: &AppState, body: &Value) -> ApiResult {
    let token = body
        .get("token")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    if token.is_empty() {
        return Err(ApiError::bad_request("Token is required"));
    }

    let user = state.verifier.verify_credential(token).await?;
    let store = Arc::clone(&state.credentials);
    let token = token.to_string();
    blocking(move || Ok(store.save(&token)?)).await?;
    info!(login = %user.login, "credential saved");

    Ok(Json(json!({ "ok": true, "hasToken": true, "user": user })))
}

// ---------------------------------------------------------------------------
// Publish & resync
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
async fn handle_push(State(state): State<Arc<AppState>>) -> ApiResult {
    let _lock = lock_worktree(&state).await?;
    let outcome = state.publisher.publish().await?;

    Ok(Json(json!({
        "ok": true,
        "branch": outcome.branch,
        "remote": outcome.remote,
    })))
}

#[instrument(skip_all)]
async fn handle_reset(State(state): State<Arc<AppState>>) -> ApiResult {
    let _lock = lock_worktree(&state).await?;
    state.publisher.resync().await?;
    Ok(Json(json!({ "ok": true })))
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

#[instrument(skip_all, fields(%method))]
async fn handle_locales(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> ApiResult {
    match method {
        Method::GET => {
            let registry = blocking(move || Ok(state.locales.read_registry()?)).await?;
            Ok(Json(registry))
        }
        Method::PUT | Method::PATCH => {
            let body = parse_body(&body)?;
            let outcome = blocking(move || {
                let _lock = WorktreeLock::acquire(&state.paths)?;
                Ok(state.locales.update(&body)?)
            })
            .await?;
            Ok(Json(json!({
                "ok": true,
                "count": outcome.count,
                "path": outcome.path,
                "addedTranslations": outcome.added_translations,
            })))
        }
        _ => Ok(Json(json!({
            "ok": true,
            "message": "Use GET to read, PUT/PATCH to overwrite locales.json",
        }))),
    }
}

#[instrument(skip_all, fields(%method))]
async fn handle_projects(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> ApiResult {
    if method != Method::PUT && method != Method::PATCH {
        return Ok(Json(json!({
            "ok": true,
            "message": "Use PUT/PATCH with JSON body to overwrite projects.json",
        })));
    }

    let body = parse_body(&body)?;
    let outcome = blocking(move || {
        let _lock = WorktreeLock::acquire(&state.paths)?;
        Ok(state.projects.apply(&body)?)
    })
    .await?;

    Ok(Json(json!({
        "ok": true,
        "path": outcome.path,
        "renames": outcome.renames,
    })))
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

//!
//! fileserver HTTP server
//! ----------------------
//! This module defines the Axum-based HTTP binding for the resource mapper.
//!
//! Responsibilities:
//! - Route every path under `/` to one handler per verb (GET, POST, PUT, DELETE).
//! - Derive the target path and its kind hint from the request URI.
//! - Translate mapper outcomes into responses: JSON descriptors, raw file bytes,
//!   303 redirects on kind mismatch, and a single terminal 500 for everything else.
//! - Startup: resolve the served root, install the configured output formatter,
//!   bind the listener and serve.

use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{OriginalUri, Query, State};
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};
use futures_util::FutureExt; // for catch_unwind on async blocks
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::storage::{FsDriver, LocalFs};

pub mod formatter;
pub mod mapper;
pub mod options;
pub mod resource;

use formatter::OutputFormatter;
use mapper::ResourceMapper;
use options::{CreateOptions, DeleteOptions, FormOrJson, GetQuery, ListOptions, MoveOptions, ReadOptions, RequestBody};
use resource::{Kind, Outcome, TargetPath};

/// Shared server state injected into all handlers.
///
/// Holds the resource mapper, which in turn owns the driver handle and the
/// output formatter slot. Clones share both.
#[derive(Clone)]
pub struct AppState {
    pub mapper: ResourceMapper,
}

impl AppState {
    pub fn new(driver: Arc<dyn FsDriver>, formatter: OutputFormatter) -> Self {
        Self { mapper: ResourceMapper::new(driver, formatter) }
    }

    /// Administrative handle: set or clear the output formatter for every
    /// response formatted from now on.
    pub fn formatter(&self) -> &OutputFormatter { self.mapper.formatter() }
}

fn verbs() -> MethodRouter<AppState> {
    get(get_resource).post(post_resource).put(put_resource).delete(delete_resource)
}

/// Build the router. It can be served directly or nested into a larger app.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", verbs())
        .route("/{*path}", verbs())
        .with_state(state)
}

fn target_from(uri: &Uri, original: &Uri) -> Result<TargetPath, AppError> {
    TargetPath::from_request_uris(uri, original)
}

fn redirect(target: &TargetPath, actual: Kind) -> Response {
    let location = target.redirect_location(actual);
    info!(target: "fileserver::server", "kind mismatch on '{}': redirecting to '{}'", target.raw, location);
    let mut resp = (StatusCode::SEE_OTHER, format!("Redirecting to {}", location)).into_response();
    if let Ok(v) = HeaderValue::from_str(&location) {
        resp.headers_mut().insert(LOCATION, v);
    }
    resp
}

/// Run a handler body, converting a panic (e.g. inside a user-supplied output
/// formatter) into a 500 instead of dropping the connection.
async fn guarded<F>(fut: F) -> Result<Response, AppError>
where
    F: Future<Output = Result<Response, AppError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic_payload) => {
            let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() { *s }
                      else if let Some(s) = panic_payload.downcast_ref::<String>() { s.as_str() }
                      else { "panic" };
            error!(target: "panic", "HTTP handler panic: {}", msg);
            Err(AppError::internal("internal_panic", "internal server error"))
        }
    }
}

async fn get_resource(
    State(state): State<AppState>,
    uri: Uri,
    OriginalUri(original): OriginalUri,
    Query(query): Query<GetQuery>,
) -> Result<Response, AppError> {
    guarded(async move {
        let target = target_from(&uri, &original)?;
        debug!(target: "fileserver::server", "GET '{}' kind={:?}", target.decoded, target.kind);
        match target.kind {
            Kind::Directory => match state.mapper.list(&target, ListOptions::from_query(&query)).await? {
                Outcome::Found(items) => Ok((StatusCode::OK, Json(items)).into_response()),
                Outcome::WrongKind { actual, .. } => Ok(redirect(&target, actual)),
            },
            Kind::File => match state.mapper.read(&target, ReadOptions::from_query(&query)?).await? {
                Outcome::Found(file) => {
                    Ok((StatusCode::OK, [(CONTENT_TYPE, file.content_type)], file.body).into_response())
                }
                Outcome::WrongKind { actual, .. } => Ok(redirect(&target, actual)),
            },
        }
    })
    .await
}

async fn create(state: &AppState, target: &TargetPath, body: &RequestBody) -> Result<Response, AppError> {
    let opts = CreateOptions::from_body(body, target.kind)?;
    let d = state.mapper.create(target, opts).await?;
    Ok((StatusCode::CREATED, Json(d)).into_response())
}

/// Create/replace, or move when the body names `newPath`.
async fn post_resource(
    State(state): State<AppState>,
    uri: Uri,
    OriginalUri(original): OriginalUri,
    FormOrJson(body): FormOrJson<RequestBody>,
) -> Result<Response, AppError> {
    guarded(async move {
        let target = target_from(&uri, &original)?;
        debug!(target: "fileserver::server", "POST '{}' kind={:?}", target.decoded, target.kind);
        if let Some(mv) = MoveOptions::from_body(&body) {
            let d = state.mapper.move_to(&target, mv).await?;
            return Ok((StatusCode::OK, Json(d)).into_response());
        }
        create(&state, &target, &body).await
    })
    .await
}

async fn put_resource(
    State(state): State<AppState>,
    uri: Uri,
    OriginalUri(original): OriginalUri,
    FormOrJson(body): FormOrJson<RequestBody>,
) -> Result<Response, AppError> {
    guarded(async move {
        let target = target_from(&uri, &original)?;
        debug!(target: "fileserver::server", "PUT '{}' kind={:?}", target.decoded, target.kind);
        create(&state, &target, &body).await
    })
    .await
}

async fn delete_resource(
    State(state): State<AppState>,
    uri: Uri,
    OriginalUri(original): OriginalUri,
    FormOrJson(body): FormOrJson<RequestBody>,
) -> Result<Response, AppError> {
    guarded(async move {
        let target = target_from(&uri, &original)?;
        debug!(target: "fileserver::server", "DELETE '{}' kind={:?}", target.decoded, target.kind);
        let d = state.mapper.delete(&target, DeleteOptions::from_body(&body)).await?;
        Ok((StatusCode::OK, Json(d)).into_response())
    })
    .await
}

fn log_startup_folders(root: &Path) {
    let cwd = std::env::current_dir().ok();
    let exe = std::env::current_exe().ok();
    let user = std::env::var("USER").or_else(|_| std::env::var("USERNAME")).ok();
    info!(
        target: "startup",
        "fileserver starting. Folder configuration: cwd={:?}, exe={:?}, user={:?}, root={:?}, root_exists={}",
        cwd, exe, user, root, root.exists()
    );
}

/// Build the shared state for `config`: ensure the root exists, create the
/// driver and install the configured output formatter.
pub fn state_from_config(config: &ServerConfig) -> anyhow::Result<AppState> {
    let root = config.absolute_root()?;
    log_startup_folders(&root);
    std::fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create or access root directory: {}", root.display()))?;

    let formatter = OutputFormatter::new();
    if let Some(name) = config.output_formatter.as_deref() {
        formatter
            .set_named(name)
            .with_context(|| format!("While installing output formatter '{}'", name))?;
    }
    Ok(AppState::new(Arc::new(LocalFs::new(&root)), formatter))
}

/// Serve `state` on an already-bound listener until the process stops.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Start the fileserver HTTP server for `config`.
pub async fn run_with_config(config: ServerConfig) -> anyhow::Result<()> {
    let state = state_from_config(&config)?;
    let addr: SocketAddr = config.socket_addr();
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    serve(listener, state).await
}

//! HTTP application shell
//!
//! Builds the axum router with CORS, request logging and panic recovery, and runs
//! it with graceful shutdown.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::logging::Logger;

use super::middleware::{log_requests, PanicMessage};

/// Shared state for handlers and middleware
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    /// Logger used for request logs
    pub logger: Logger,
}

impl AppState {
    pub fn new(settings: Settings, logger: Logger) -> Self {
        Self {
            settings: Arc::new(settings),
            logger,
        }
    }
}

/// Handle to control the running server
pub struct ServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Get the address the server is listening on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shut the server down gracefully and wait for in-flight requests
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if the server task already exited
            let _ = tx.send(());
        }
        self.task.await.context("Server task panicked")
    }
}

/// Build the application router
///
/// The health check is also served under the configured API prefix.
pub fn router(state: AppState) -> Router {
    let mut routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health));
    if let Some(base) = state.settings.api_base() {
        routes = routes.nest(&base, Router::new().route("/health", get(health)));
    }
    with_layers(routes, state)
}

/// Wrap routes in the panic, logging and CORS layers (innermost first)
pub(crate) fn with_layers(routes: Router<AppState>, state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins());
    routes
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .layer(cors)
        .with_state(state)
}

/// CORS for the configured origins, with credentials and any method or header
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "Internal Server Error" })),
    )
        .into_response();
    response.extensions_mut().insert(PanicMessage(message));
    response
}

/// GET / handler
async fn root(State(state): State<AppState>) -> Json<Value> {
    state.logger.info("Root endpoint accessed");
    Json(json!({
        "message": format!("Welcome to {} API", state.settings.project_name)
    }))
}

/// GET /health handler
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Bind to the configured host and port and start serving
///
/// Returns a [`ServerHandle`] that can be used to shut down the server.
pub async fn start(state: AppState) -> Result<ServerHandle> {
    let addr = format!("{}:{}", state.settings.host, state.settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let bound_addr = listener.local_addr()?;

    let app = router(state);

    info!("Server listening on {}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("Server shutting down");
        })
        .await;

        if let Err(e) = result {
            error!("Server error: {}", e);
        }
    });

    Ok(ServerHandle {
        shutdown_tx: Some(shutdown_tx),
        addr: bound_addr,
        task,
    })
}

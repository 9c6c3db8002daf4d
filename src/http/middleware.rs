//! Request logging middleware
//!
//! Logs every request on start and completion with method, path, status and
//! processing time. Server errors are logged at ERROR so they also reach the
//! error-only log file.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::logging::{Fields, Severity};

use super::server::AppState;

/// Message of a handler panic, attached to the 500 response by the panic layer
#[derive(Debug, Clone)]
pub struct PanicMessage(pub String);

pub async fn log_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let request_id = Uuid::new_v4().to_string();

    state.logger.log_with(
        Severity::Info,
        "Request started",
        Fields::new()
            .with("request_id", request_id.as_str())
            .with("method", method.as_str())
            .with("path", path.as_str())
            .with("query", request.uri().query().unwrap_or(""))
            .with("client", client),
    );

    let response = next.run(request).await;
    let status = response.status();
    let process_time_ms = round_ms(start.elapsed().as_secs_f64() * 1000.0);

    let mut fields = Fields::new()
        .with("request_id", request_id)
        .with("method", method)
        .with("path", path)
        .with("status_code", status.as_u16())
        .with("process_time_ms", process_time_ms);

    if status.is_server_error() {
        fields.insert(
            "error_type",
            status.canonical_reason().unwrap_or("Server Error"),
        );
        if let Some(PanicMessage(message)) = response.extensions().get::<PanicMessage>() {
            fields.insert("error", message.as_str());
        }
        state
            .logger
            .log_with(Severity::Error, "Request failed", fields);
    } else {
        state
            .logger
            .log_with(Severity::Info, "Request completed", fields);
    }

    response
}

/// Round milliseconds to two decimals
fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_ms() {
        assert_eq!(round_ms(1.23456), 1.23);
        assert_eq!(round_ms(42.0), 42.0);
    }
}

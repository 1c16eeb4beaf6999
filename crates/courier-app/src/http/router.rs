//! Router construction and server host for event intake.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::Request,
    routing::{get, post},
};
use courier_telemetry::build_sha;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::http::handlers::{health, metrics, relocate};
use crate::http::telemetry::HttpMetricsLayer;

const HEADER_REQUEST_ID: &str = "x-request-id";

/// Axum router wrapper hosting the courier endpoints.
pub struct CourierServer {
    router: Router,
}

impl CourierServer {
    /// Build the router over a shared context.
    #[must_use]
    pub fn new(context: Arc<AppContext>) -> Self {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(courier_telemetry::propagate_request_id_layer())
            .layer(courier_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(context.metrics().clone()));

        let router = Router::new()
            .route("/", post(relocate))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route_layer(layered)
            .with_state(context);
        Self { router }
    }

    /// Router for in-process dispatch.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve on `listener` until `shutdown` resolves; in-flight requests finish first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] when the accept loop fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "courier listening");
        }
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| AppError::io("http.serve", err))
    }
}

//! Route handlers: event intake, liveness, and metrics exposition.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use courier_telemetry::{MetricsSnapshot, build_sha};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::context::AppContext;
use crate::http::errors::ApiError;
use crate::http::event::parse_event;

/// Response header naming how an accepted event ended.
pub const HEADER_OUTCOME: &str = "x-courier-outcome";

/// Outcome label for events that are acknowledged without relocation.
const OUTCOME_IGNORED: &str = "ignored";

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    build_sha: &'static str,
    transport: &'static str,
    metrics: MetricsSnapshot,
}

pub(crate) async fn relocate(
    State(state): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let event = parse_event(&headers, &body).map_err(|rejection| {
        warn!(reason = rejection.as_str(), "rejected malformed event");
        ApiError::bad_event(rejection)
    })?;

    if !event.is_finalized() {
        debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            object = %event.object,
            "ignoring non-finalize event"
        );
        return Ok(acknowledged(OUTCOME_IGNORED));
    }

    match state.pipeline().relocate(&event.object).await {
        Ok(report) => {
            let outcome = report
                .outcome
                .as_ref()
                .map_or(OUTCOME_IGNORED, |outcome| outcome.as_str());
            Ok(acknowledged(outcome))
        }
        Err(err) => {
            error!(
                event_id = %event.id,
                error = %err,
                kind = err.kind().as_str(),
                "relocation failed"
            );
            Err(ApiError::relocation(&err))
        }
    }
}

fn acknowledged(outcome: &'static str) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .insert(HEADER_OUTCOME, HeaderValue::from_static(outcome));
    response
}

pub(crate) async fn health(State(state): State<Arc<AppContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        build_sha: build_sha(),
        transport: state.pipeline().transport().as_str(),
        metrics: state.metrics().snapshot(),
    })
}

pub(crate) async fn metrics(State(state): State<Arc<AppContext>>) -> Result<Response, ApiError> {
    match state.metrics().render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}

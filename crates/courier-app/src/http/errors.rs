//! JSON error bodies for failed invocations.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_relocate::{ErrorKind, RelocateError};
use serde::Serialize;

use crate::http::event::EventRejection;

/// Error returned to the event delivery service.
///
/// 5xx responses ask the trigger to redeliver; 4xx responses mark the event as
/// undeliverable.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    operation: Option<&'static str>,
    object: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    object: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str) -> Self {
        Self {
            status,
            kind,
            operation: None,
            object: None,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal").with_detail(detail)
    }

    pub(crate) fn bad_event(rejection: EventRejection) -> Self {
        let api = Self::new(StatusCode::BAD_REQUEST, rejection.as_str());
        match rejection {
            EventRejection::MissingAttribute(name) => api.with_detail(name),
            EventRejection::MalformedBody | EventRejection::InvalidObject => api,
        }
    }

    pub(crate) fn relocation(err: &RelocateError) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound
            | ErrorKind::Integrity
            | ErrorKind::Auth
            | ErrorKind::Connect
            | ErrorKind::PreconditionFailed
            | ErrorKind::Timeout
            | ErrorKind::Transport => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: kind.as_str(),
            operation: err.operation(),
            object: err.object().map(str::to_string),
            detail: Some(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind,
            operation: self.operation,
            object: self.object,
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

//! CloudEvent intake for object-storage notifications.
//!
//! # Design
//! - Binary mode: `ce-*` headers plus the object data as the JSON body.
//! - Structured mode: `application/cloudevents+json` envelope carrying `data`.
//! - Only the bucket and object name are consumed; other fields are ignored.

use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use courier_storage::StorageObjectRef;
use serde::Deserialize;

/// Event type emitted when an object finishes uploading.
pub const FINALIZED_EVENT: &str = "google.cloud.storage.object.v1.finalized";

const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";
const HEADER_ID: &str = "ce-id";
const HEADER_TYPE: &str = "ce-type";
const HEADER_SPEC_VERSION: &str = "ce-specversion";

/// Why an event was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRejection {
    /// A required CloudEvent attribute was absent.
    MissingAttribute(&'static str),
    /// The body or envelope was not valid JSON of the expected shape.
    MalformedBody,
    /// The bucket or object name failed validation.
    InvalidObject,
}

impl EventRejection {
    /// Stable label for response bodies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingAttribute(_) => "missing_attribute",
            Self::MalformedBody => "malformed_body",
            Self::InvalidObject => "invalid_object",
        }
    }
}

/// Attributes of one storage notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// CloudEvent id.
    pub id: String,
    /// CloudEvent type.
    pub event_type: String,
    /// Object the event refers to.
    pub object: StorageObjectRef,
}

impl StorageEvent {
    /// Whether the event announces a newly written object.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.event_type == FINALIZED_EVENT
    }
}

#[derive(Debug, Deserialize)]
struct StorageObjectData {
    bucket: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
struct Envelope {
    id: Option<String>,
    #[serde(rename = "type")]
    event_type: Option<String>,
    specversion: Option<String>,
    data: Option<StorageObjectData>,
}

/// Parse a request in binary or structured content mode.
///
/// # Errors
///
/// Returns the [`EventRejection`] describing the first problem found.
pub fn parse_event(headers: &HeaderMap, body: &[u8]) -> Result<StorageEvent, EventRejection> {
    let structured = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(STRUCTURED_CONTENT_TYPE));
    if structured {
        parse_structured(body)
    } else {
        parse_binary(headers, body)
    }
}

fn parse_binary(headers: &HeaderMap, body: &[u8]) -> Result<StorageEvent, EventRejection> {
    let header = |name: &'static str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
            .ok_or(EventRejection::MissingAttribute(name))
    };
    header(HEADER_SPEC_VERSION)?;
    let id = header(HEADER_ID)?;
    let event_type = header(HEADER_TYPE)?;
    let data: StorageObjectData =
        serde_json::from_slice(body).map_err(|_| EventRejection::MalformedBody)?;
    build(id, event_type, data)
}

fn parse_structured(body: &[u8]) -> Result<StorageEvent, EventRejection> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|_| EventRejection::MalformedBody)?;
    envelope
        .specversion
        .ok_or(EventRejection::MissingAttribute("specversion"))?;
    let id = envelope.id.ok_or(EventRejection::MissingAttribute("id"))?;
    let event_type = envelope
        .event_type
        .ok_or(EventRejection::MissingAttribute("type"))?;
    let data = envelope
        .data
        .ok_or(EventRejection::MissingAttribute("data"))?;
    build(id, event_type, data)
}

fn build(
    id: String,
    event_type: String,
    data: StorageObjectData,
) -> Result<StorageEvent, EventRejection> {
    let object = StorageObjectRef::new(data.bucket, data.name)
        .map_err(|_| EventRejection::InvalidObject)?;
    Ok(StorageEvent {
        id,
        event_type,
        object,
    })
}

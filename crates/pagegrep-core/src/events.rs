//! Object-store change events and batch routing.
//!
//! A batch arrives either as a plain array of [`ChangeEvent`]s or as an S3
//! bucket notification (`{"Records": [...]}`). [`parse_batch`] accepts
//! both. [`route`] then splits the batch into a [`Plan`] without touching
//! any external system, so a bad event fails the batch before OCR or the
//! store are called.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const OBJECT_CREATED: &str = "OBJECT_CREATED";
pub const OBJECT_REMOVED: &str = "OBJECT_REMOVED";

/// File extensions that are indexed. Matching is case-sensitive.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// A single object-store notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_name: String,
    pub bucket: String,
    pub key: String,
}

impl ChangeEvent {
    pub fn new(
        event_name: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn created(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(OBJECT_CREATED, bucket, key)
    }

    pub fn removed(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(OBJECT_REMOVED, bucket, key)
    }
}

/// A `(bucket, key)` file reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

/// What a batch asks the pipeline to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Files to OCR and upsert, in event order.
    pub upserts: Vec<ObjectRef>,
    /// Files to delete, grouped by bucket, keys in event order.
    pub deletes: BTreeMap<String, Vec<String>>,
    /// Events dropped for an unsupported extension.
    pub skipped: usize,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("unsupported event: {0}")]
    UnsupportedEvent(String),
    #[error("malformed event batch: {0}")]
    Malformed(String),
}

impl EventError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedEvent(_) => "UNSUPPORTED_EVENT",
            Self::Malformed(_) => "MALFORMED_EVENTS",
        }
    }
}

/// Whether `key` ends in `.jpg`, `.jpeg` or `.png`.
pub fn has_supported_extension(key: &str) -> bool {
    SUPPORTED_EXTENSIONS.iter().any(|ext| {
        key.strip_suffix(ext)
            .is_some_and(|stem| stem.ends_with('.'))
    })
}

/// Split a batch into upserts and deletes.
///
/// Events for unsupported extensions are dropped before the event name is
/// looked at. Any other event name fails the whole batch.
pub fn route(events: &[ChangeEvent]) -> Result<Plan, EventError> {
    let mut plan = Plan::default();
    for event in events {
        if !has_supported_extension(&event.key) {
            plan.skipped += 1;
            continue;
        }
        match event.event_name.as_str() {
            OBJECT_CREATED => plan.upserts.push(ObjectRef {
                bucket: event.bucket.clone(),
                key: event.key.clone(),
            }),
            OBJECT_REMOVED => plan
                .deletes
                .entry(event.bucket.clone())
                .or_default()
                .push(event.key.clone()),
            other => return Err(EventError::UnsupportedEvent(other.to_string())),
        }
    }
    Ok(plan)
}

#[derive(Deserialize)]
struct Notification {
    #[serde(rename = "Records")]
    records: Vec<Record>,
}

#[derive(Deserialize)]
struct Record {
    #[serde(rename = "eventName")]
    event_name: String,
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: Named,
    object: ObjectKey,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
struct ObjectKey {
    key: String,
}

/// Parse an event batch from JSON.
///
/// Accepts an array of `{event_name, bucket, key}` objects or an S3
/// notification document. S3 event names map `ObjectCreated:*` and
/// `ObjectRemoved:*` onto the two supported names; other names are kept
/// as-is and rejected later by [`route`].
pub fn parse_batch(value: &Value) -> Result<Vec<ChangeEvent>, EventError> {
    if value.is_array() {
        return Vec::<ChangeEvent>::deserialize(value)
            .map_err(|e| EventError::Malformed(e.to_string()));
    }
    if value.get("Records").is_some() {
        let notification =
            Notification::deserialize(value).map_err(|e| EventError::Malformed(e.to_string()))?;
        return notification
            .records
            .into_iter()
            .map(|r| {
                Ok(ChangeEvent {
                    event_name: s3_event_name(&r.event_name),
                    bucket: r.s3.bucket.name,
                    key: decode_object_key(&r.s3.object.key)?,
                })
            })
            .collect();
    }
    Err(EventError::Malformed(
        "expected an array of events or a Records notification".into(),
    ))
}

fn s3_event_name(name: &str) -> String {
    if name.starts_with("ObjectCreated:") {
        OBJECT_CREATED.to_string()
    } else if name.starts_with("ObjectRemoved:") {
        OBJECT_REMOVED.to_string()
    } else {
        name.to_string()
    }
}

/// Notification keys are form-encoded: `+` is a space.
fn decode_object_key(raw: &str) -> Result<String, EventError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|k| k.into_owned())
        .map_err(|e| EventError::Malformed(format!("object key {:?}: {}", raw, e)))
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;


/// Action carried by an inbound trigger event.
///
/// Only `write` actions carry values and trigger pipeline processing;
/// `read` actions are ignored by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Write,
    Read,
}

/// Geo annotation attached to a value entry (latitude/longitude).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    pub lat: f64,
    pub long: f64,
}

/// One sensor field at one instant.
///
/// Keys are not guaranteed unique within a batch; lookups resolve
/// duplicates with last-match-wins (see [`find`]).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValueEntry {
    pub key: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<Geo>,
}

impl ValueEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            geo: None,
        }
    }
}

/// Inbound event from the hosting trigger system.
///
/// One event per device write, carrying the full value batch for that
/// write. The value set is append-only as it moves through the pipeline:
/// a `timestamp` is stamped once, a `transformed` marker added once, and
/// a computed `tmp` added once.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub action: Action,

    /// Opaque token identifying the destination thing/device.
    #[serde(rename = "thingToken", default)]
    pub thing_token: String,

    #[serde(default)]
    pub values: Vec<ValueEntry>,
}

/// Find the value for `key`, scanning the full slice.
///
/// When duplicate keys exist the **last** match wins: the fold starts
/// from `None` and unconditionally overwrites on match.
pub fn find<'a>(values: &'a [ValueEntry], key: &str) -> Option<&'a Value> {
    values.iter().fold(None, |found, entry| {
        if entry.key == key {
            Some(&entry.value)
        } else {
            found
        }
    })
}

/// Like [`find`], but returns the whole entry (needed to read its geo
/// annotation). Same last-match-wins semantics.
pub fn find_entry<'a>(values: &'a [ValueEntry], key: &str) -> Option<&'a ValueEntry> {
    values.iter().fold(None, |found, entry| {
        if entry.key == key {
            Some(entry)
        } else {
            found
        }
    })
}

/// Truthiness as the pipeline branches understand it: absent, `null`,
/// `false`, `0` and `""` all count as missing.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// The embedded batch timestamp (epoch milliseconds), if any.
pub fn timestamp_of(values: &[ValueEntry]) -> Option<i64> {
    find(values, "timestamp").and_then(Value::as_i64)
}

/// Fatal-input errors: mandatory data absent at a stage boundary.
///
/// The whole stage invocation fails with no partial effect; these are
/// never retried.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingIdentity,
    MissingValues,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingIdentity => write!(f, "missing thing token"),
            ValidationError::MissingValues => write!(f, "missing values"),
        }
    }
}

impl std::error::Error for ValidationError {}

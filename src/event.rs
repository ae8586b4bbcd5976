//! Log event model handed to the templates.
//!
//! A [`LogEvent`] is an owned snapshot of a `tracing` event: the writer may
//! run on another task than the one that logged, so nothing borrowed from the
//! original event survives past [`LogEvent::from_tracing`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::Level;
use tracing::field::{Field, Visit};

/// Owned log event, serialized as the template render context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    /// Time the event was captured.
    pub timestamp: DateTime<Utc>,
    /// Upper-case level name (`ERROR`, `WARN`, ...).
    pub level: String,
    /// Logger name; the `tracing` target.
    pub logger: String,
    /// Formatted message.
    pub message: String,
    /// Name of the thread that logged, when it has one.
    pub thread: Option<String>,
    /// Every other structured field of the event.
    pub fields: BTreeMap<String, Value>,
}

impl LogEvent {
    /// Create an event captured now, without structured fields.
    pub fn new(level: Level, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: level.as_str().to_string(),
            logger: logger.into(),
            message: message.into(),
            thread: None,
            fields: BTreeMap::new(),
        }
    }

    /// Add a structured field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set the thread name.
    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = Some(thread.into());
        self
    }

    /// Snapshot a `tracing` event.
    ///
    /// The `message` field becomes [`LogEvent::message`]; all other fields go
    /// to [`LogEvent::fields`].
    pub fn from_tracing(event: &tracing::Event<'_>) -> Self {
        let meta = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        Self {
            timestamp: Utc::now(),
            level: meta.level().as_str().to_string(),
            logger: meta.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            thread: std::thread::current().name().map(String::from),
            fields: visitor.fields,
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: BTreeMap<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            self.message = Some(text);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{:?}", value)));
    }
}

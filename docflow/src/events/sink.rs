//! Event sinks: where stage and harness events go.

use parking_lot::RwLock;
use std::fmt::Debug;
use tracing::{debug, info, warn, Level};

/// Receives the structured events emitted by the stage runner, storage
/// transfers and the harness. Emitting never fails.
pub trait EventSink: Send + Sync + Debug {
    /// Emits `event_type` (e.g. `stage.file_processed`) with optional data.
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// Forwards events to `tracing`, tagged with the emitting component.
///
/// Failure events (`*.file_failed`, a harness `failed` state) are raised
/// to WARN; everything else goes out at the sink's level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
    component: &'static str,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            component: "docflow",
        }
    }
}

impl LoggingEventSink {
    /// Logs routine events at `level` (DEBUG/TRACE or INFO).
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Tags every logged event with a component name.
    #[must_use]
    pub fn with_component(mut self, component: &'static str) -> Self {
        self.component = component;
        self
    }

    fn is_failure(event_type: &str, data: &serde_json::Value) -> bool {
        event_type.ends_with("failed") || data.get("state").and_then(|s| s.as_str()) == Some("failed")
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        let data = data.unwrap_or(serde_json::Value::Null);
        let component = self.component;

        if Self::is_failure(event_type, &data) {
            warn!(component, event_type, event_data = %data, "{event_type}");
        } else if self.level >= Level::DEBUG {
            // Level ordering: TRACE > DEBUG > INFO.
            debug!(component, event_type, event_data = %data, "{event_type}");
        } else {
            info!(component, event_type, event_data = %data, "{event_type}");
        }
    }
}

/// One event captured by [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// The event type.
    pub event_type: String,
    /// The payload, if any.
    pub data: Option<serde_json::Value>,
}

/// Keeps every event in memory, for assertions in tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything captured so far, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().clone()
    }

    /// Number of captured events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// True when nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Events whose type starts with `type_prefix` (`"stage."` matches all
    /// runner events).
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<RecordedEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }

    /// Payload of the most recent event of exactly `event_type`.
    #[must_use]
    pub fn last_of_type(&self, event_type: &str) -> Option<serde_json::Value> {
        self.events
            .read()
            .iter()
            .rev()
            .find(|event| event.event_type == event_type)
            .and_then(|event| event.data.clone())
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push(RecordedEvent {
            event_type: event_type.to_string(),
            data,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_detection() {
        assert!(LoggingEventSink::is_failure("stage.file_failed", &serde_json::Value::Null));
        assert!(LoggingEventSink::is_failure("harness.state", &json!({"state": "failed"})));
        assert!(!LoggingEventSink::is_failure("harness.state", &json!({"state": "polling"})));
        assert!(!LoggingEventSink::is_failure("stage.completed", &json!({"failures": []})));
    }

    #[test]
    fn test_logging_sink_accepts_any_payload() {
        let sink = LoggingEventSink::new(Level::DEBUG).with_component("preprocess");
        sink.emit("stage.file_processed", Some(json!({"file": "a.txt"})));
        sink.emit("stage.file_failed", None);
        NoOpEventSink.emit("stage.started", Some(json!({"files": 1})));
    }

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("stage.started", None);
        sink.emit("stage.completed", Some(json!({"processed": 3})));
        sink.emit("storage.uploaded", Some(json!({"key": "out/a.txt"})));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events()[0].event_type, "stage.started");
        assert_eq!(sink.events_of_type("stage.").len(), 2);
        assert_eq!(sink.last_of_type("stage.completed"), Some(json!({"processed": 3})));
        assert_eq!(sink.last_of_type("stage.started"), None);
    }
}

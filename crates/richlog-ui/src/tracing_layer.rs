//! `tracing` bridge: a [`Layer`] that feeds application events into sinks.
//!
//! Each event becomes a [`LogRecord`]: the level maps one-to-one (there is no
//! `tracing` equivalent of `Fatal`), the target becomes the logger name, the
//! `message` field becomes the message and every other field lands in the
//! property bag as a JSON value.
//!
//! Events from the richlog crates themselves are skipped so the sink's own
//! diagnostics never loop back into it.
//!
//! ```rust,ignore
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::util::SubscriberInitExt;
//!
//! tracing_subscriber::registry().with(RichTextLayer::new(vec![sink])).init();
//! tracing::info!(target: "orders", order = "A-17", "order shipped");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use richlog_core::{LogLevel, LogRecord};

use crate::sink::RichTextSink;

/// Targets whose events are never forwarded.
const OWN_TARGETS: [&str; 2] = ["richlog_core", "richlog_ui"];

pub struct RichTextLayer {
    sinks: Vec<RichTextSink>,
}

impl RichTextLayer {
    pub fn new(sinks: Vec<RichTextSink>) -> Self {
        Self { sinks }
    }

    fn map_level(level: &Level) -> LogLevel {
        match *level {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            Level::INFO => LogLevel::Info,
            Level::DEBUG => LogLevel::Debug,
            Level::TRACE => LogLevel::Trace,
        }
    }

    fn is_own(target: &str) -> bool {
        OWN_TARGETS
            .iter()
            .any(|own| target == *own || target.strip_prefix(own).is_some_and(|rest| rest.starts_with("::")))
    }

    /// Convert an event into a record.
    pub fn record_for(event: &Event<'_>) -> LogRecord {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let mut record = LogRecord::new(
            Self::map_level(metadata.level()),
            metadata.target(),
            visitor.message.unwrap_or_default(),
        );
        for (key, value) in visitor.fields {
            record = record.with_property(key, value);
        }
        record
    }
}

impl<S: Subscriber> Layer<S> for RichTextLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if Self::is_own(event.metadata().target()) || self.sinks.is_empty() {
            return;
        }
        let record = std::sync::Arc::new(Self::record_for(event));
        for sink in &self.sinks {
            if let Err(err) = sink.write(std::sync::Arc::clone(&record)) {
                tracing::warn!(target: "richlog_ui", sink = %sink.name(), %err, "bridged event dropped");
            }
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: BTreeMap<String, Value>,
}

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_owned()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TextSurface;
    use crate::dispatch;
    use crate::window::{Desktop, HostWindow};
    use pretty_assertions::assert_eq;
    use richlog_core::config::SinkConfig;
    use richlog_core::ErrorPolicy;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn own_targets_are_recognised() {
        assert!(RichTextLayer::is_own("richlog_ui"));
        assert!(RichTextLayer::is_own("richlog_ui::sink"));
        assert!(RichTextLayer::is_own("richlog_core::retention"));
        assert!(!RichTextLayer::is_own("richlog_uix"));
        assert!(!RichTextLayer::is_own("orders"));
    }

    #[test]
    fn events_become_records_on_the_control() {
        let desktop = Arc::new(Desktop::new());
        let window = desktop.show(HostWindow::new("main", "Main"));
        let control = window.add_control("log");
        let (dispatcher, mut ui) = dispatch::channel();
        let cfg = SinkConfig {
            window_name: Some("main".into()),
            control_name: Some("log".into()),
            layout: "${level} ${logger} ${message} ${property:name=order}".into(),
            ..SinkConfig::named("bridge")
        };
        let sink = RichTextSink::from_config(&cfg, ErrorPolicy::strict(), dispatcher).unwrap();
        sink.initialize(desktop).unwrap();

        let subscriber = tracing_subscriber::registry().with(RichTextLayer::new(vec![sink]));
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "orders", order = "A-17", "order late");
            tracing::debug!(target: "richlog_ui::sink", "internal chatter");
        });
        ui.pump();
        assert_eq!(control.text().unwrap(), "Warn orders order late A-17\n");
    }
}

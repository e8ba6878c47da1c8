//! Test builders — ergonomic constructors for `LogRecord` and `SinkConfig`.
//!
//! These builders are designed for readability in test assertions, not for
//! production use.

use richlog_core::config::SinkConfig;
use richlog_core::retention::RetentionPolicy;
use richlog_core::{LogLevel, LogRecord};

// ---------------------------------------------------------------------------
// LogRecordBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`LogRecord`] test fixtures.
///
/// ```rust,ignore
/// let record = LogRecordBuilder::new("payment declined")
///     .level(LogLevel::Error)
///     .logger("payments")
///     .property("order", "ORD-1")
///     .build();
/// ```
pub struct LogRecordBuilder {
    message: String,
    level: LogLevel,
    logger: String,
    ts: Option<chrono::DateTime<chrono::Utc>>,
    properties: Vec<(String, serde_json::Value)>,
}

impl LogRecordBuilder {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: LogLevel::Info,
            logger: "test".to_string(),
            ts: None,
            properties: Vec::new(),
        }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = logger.into();
        self
    }

    pub fn ts(mut self, ts: chrono::DateTime<chrono::Utc>) -> Self {
        self.ts = Some(ts);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> LogRecord {
        let mut record = LogRecord::new(self.level, self.logger, self.message);
        if let Some(ts) = self.ts {
            record = record.with_ts(ts);
        }
        for (key, value) in self.properties {
            record = record.with_property(key, value);
        }
        record
    }
}

/// Shorthand for an `Info` record with `message`.
pub fn record(message: impl Into<String>) -> LogRecord {
    LogRecordBuilder::new(message).build()
}

// ---------------------------------------------------------------------------
// SinkConfigBuilder
// ---------------------------------------------------------------------------

/// Sink config targeting control `log` on window `main`, rendering just the
/// message, no auto-create. Adjust with the setters.
pub struct SinkConfigBuilder {
    cfg: SinkConfig,
}

impl SinkConfigBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            cfg: SinkConfig {
                window_name: Some(WINDOW.into()),
                control_name: Some(CONTROL.into()),
                allow_auto_create: false,
                layout: "${message}".into(),
                ..SinkConfig::named(name)
            },
        }
    }

    pub fn layout(mut self, layout: &str) -> Self {
        self.cfg.layout = layout.into();
        self
    }

    pub fn max_lines(mut self, max: usize) -> Self {
        self.cfg.max_lines = max;
        self
    }

    pub fn retention(mut self, policy: RetentionPolicy) -> Self {
        self.cfg.retention = policy;
        self
    }

    pub fn links(mut self) -> Self {
        self.cfg.support_links = true;
        self
    }

    pub fn auto_create(mut self) -> Self {
        self.cfg.allow_auto_create = true;
        self
    }

    pub fn window(mut self, name: Option<&str>) -> Self {
        self.cfg.window_name = name.map(str::to_string);
        self
    }

    pub fn build(self) -> SinkConfig {
        self.cfg
    }
}

/// Window every builder-made sink looks for.
pub const WINDOW: &str = "main";
/// Control every builder-made sink looks for.
pub const CONTROL: &str = "log";

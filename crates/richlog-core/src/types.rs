//! Core types for richlog-core.
//!
//! This module defines the record handed to the sink by the logging
//! framework: the [`LogRecord`] itself, its [`LogLevel`], and the
//! [`Property`] values carried in its property bag.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::links::LinkInfo;

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Reserved property-bag key under which pending link metadata is stashed
/// while a record is being rendered.
pub const LINK_INFO_PROPERTY: &str = "richlog.link-info";

/// A single log record as produced by the logging framework.
///
/// Records are shared as `Arc<LogRecord>` between the producer, the retention
/// queue, the UI thread and the link registry. Everything except the property
/// bag is read-only once constructed.
#[derive(Debug)]
pub struct LogRecord {
    /// Process-wide, monotonically increasing sequence number.
    pub seq: u64,
    /// Time the record was created (UTC).
    pub ts: chrono::DateTime<chrono::Utc>,
    pub level: LogLevel,
    /// Logger (or `tracing` target) name.
    pub logger: String,
    /// Rendered message text.
    pub message: String,
    properties: Mutex<BTreeMap<String, Property>>,
}

/// A value in a record's property bag.
#[derive(Debug, Clone)]
pub enum Property {
    /// Plain structured value attached by the producer.
    Value(serde_json::Value),
    /// Link placeholders produced while rendering the record.
    Links(Arc<LinkInfo>),
}

impl LogRecord {
    /// Create a record stamped with the next sequence number and the current
    /// time.
    pub fn new(level: LogLevel, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
            ts: chrono::Utc::now(),
            level,
            logger: logger.into(),
            message: message.into(),
            properties: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_ts(mut self, ts: chrono::DateTime<chrono::Utc>) -> Self {
        self.ts = ts;
        self
    }

    pub fn with_property(self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.bag().insert(key.into(), Property::Value(value.into()));
    }

    /// Structured property value for `key`, if one was attached.
    pub fn property(&self, key: &str) -> Option<serde_json::Value> {
        match self.bag().get(key) {
            Some(Property::Value(v)) => Some(v.clone()),
            _ => None,
        }
    }

    /// Snapshot of all structured properties (link metadata excluded).
    pub fn properties(&self) -> Vec<(String, serde_json::Value)> {
        self.bag()
            .iter()
            .filter_map(|(k, p)| match p {
                Property::Value(v) => Some((k.clone(), v.clone())),
                Property::Links(_) => None,
            })
            .collect()
    }

    /// Link metadata attached during rendering, if any link was produced.
    pub fn link_info(&self) -> Option<Arc<LinkInfo>> {
        match self.bag().get(LINK_INFO_PROPERTY) {
            Some(Property::Links(info)) => Some(Arc::clone(info)),
            _ => None,
        }
    }

    /// Return the record's link metadata, creating it on first use.
    pub fn link_info_or_insert(&self) -> Arc<LinkInfo> {
        let mut bag = self.bag();
        if let Some(Property::Links(info)) = bag.get(LINK_INFO_PROPERTY) {
            return Arc::clone(info);
        }
        let info = Arc::new(LinkInfo::default());
        bag.insert(LINK_INFO_PROPERTY.to_string(), Property::Links(Arc::clone(&info)));
        info
    }

    fn bag(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Property>> {
        self.properties.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Log severity level.
///
/// Ordered by severity so conditions such as `level >= Warn` compare
/// naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// All levels, most severe first (the order built-in rules are consulted).
    pub const DESCENDING: [LogLevel; 6] = [
        LogLevel::Fatal,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// Mixed-case name, e.g. `Warn`.
    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warn => "Warn",
            LogLevel::Error => "Error",
            LogLevel::Fatal => "Fatal",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    /// Accepts `warn`, `Warn`, `WARNING` and the `LogLevel.Warn` spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("LogLevel.").unwrap_or(s);
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" | "critical" => Ok(LogLevel::Fatal),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

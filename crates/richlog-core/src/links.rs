//! Link bookkeeping: per-record placeholders and the id → record registry.
//!
//! While a record is rendered, every linkified fragment is replaced by a
//! unique placeholder and the placeholder → visible text pair is stored in the
//! record's [`LinkInfo`]. When the display writes the record, each placeholder
//! becomes the visible text followed by a hidden `#link<id>` marker, and the
//! line-scoped id is registered in the [`LinkRegistry`] together with the
//! surface it was painted into. Eviction removes ids again, and so does
//! releasing that surface, so a link that is no longer shown never resolves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use regex::Regex;

use crate::{LogRecord, SinkError};

/// Prefix of the hidden marker that follows a link's visible text.
pub const LINK_MARKER_PREFIX: &str = "#link";

static CLICKED_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?s)(.*)#link(\d+)$").expect("static regex"));
static EMBEDDED_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#link(\d+)").expect("static regex"));

/// Placeholder → visible text pairs produced while rendering one record.
#[derive(Debug, Default)]
pub struct LinkInfo {
    entries: Mutex<Vec<(String, String)>>,
}

impl LinkInfo {
    /// Register `text` and return the placeholder to emit in its place.
    pub fn add(&self, text: impl Into<String>) -> String {
        let placeholder = new_placeholder();
        self.lock().push((placeholder.clone(), text.into()));
        placeholder
    }

    pub fn get(&self, placeholder: &str) -> Option<String> {
        self.lock().iter().find(|(p, _)| p == placeholder).map(|(_, t)| t.clone())
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, String)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A fresh placeholder token, e.g. `(0f8fad5b-d9cb-469f-a165-70867728950e)`.
pub fn new_placeholder() -> String {
    format!("({})", uuid::Uuid::new_v4().hyphenated())
}

/// Hidden suffix appended after a link's visible text.
pub fn link_marker(id: u64) -> String {
    format!("{LINK_MARKER_PREFIX}{id}")
}

/// Split clicked link text into `(visible text, link id)`.
pub fn parse_clicked_link(text: &str) -> Result<(String, u64), SinkError> {
    let caps = CLICKED_LINK
        .captures(text)
        .ok_or_else(|| SinkError::MalformedLink(text.to_string()))?;
    let id = caps[2].parse::<u64>().map_err(|_| SinkError::MalformedLink(text.to_string()))?;
    Ok((caps[1].to_string(), id))
}

/// Every link id embedded in an encoded (RTF) fragment.
pub fn embedded_link_ids(encoded: &str) -> Vec<u64> {
    EMBEDDED_LINK
        .captures_iter(encoded)
        .filter_map(|c| c[1].parse().ok())
        .collect()
}

#[derive(Debug)]
struct Link {
    owner: u64,
    record: Arc<LogRecord>,
}

/// Thread-safe map from line-scoped link id to the record that produced it.
#[derive(Debug, Default)]
pub struct LinkRegistry {
    next_id: AtomicU64,
    links: Mutex<HashMap<u64, Link>>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id that has never been handed out by this registry.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Register link `id`; `owner` identifies the surface it was painted into.
    pub fn add(&self, id: u64, owner: u64, record: Arc<LogRecord>) {
        self.lock().insert(id, Link { owner, record });
    }

    pub fn get(&self, id: u64) -> Option<Arc<LogRecord>> {
        self.lock().get(&id).map(|link| Arc::clone(&link.record))
    }

    pub fn remove(&self, id: u64) -> Option<Arc<LogRecord>> {
        self.lock().remove(&id).map(|link| link.record)
    }

    /// Drop every link painted into `owner`. Returns how many were dropped.
    pub fn remove_owner(&self, owner: u64) -> usize {
        let mut links = self.lock();
        let before = links.len();
        links.retain(|_, link| link.owner != owner);
        before - links.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Link>> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

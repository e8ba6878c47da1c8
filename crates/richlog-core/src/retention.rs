//! Retention buffer — records kept for replay into a later-attached surface.
//!
//! The queue only exists while a policy other than [`RetentionPolicy::None`]
//! is active. Policy switches and stores share one mutex, so a writer can
//! never enqueue into a queue that is concurrently being discarded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;

use crate::rules::RowColoringRule;
use crate::{ErrorPolicy, LogRecord, SinkError};

/// What happens to records while no display surface is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Nothing is kept.
    #[default]
    None,
    /// Every record is kept (up to the line cap) and replayed into each newly
    /// attached surface.
    All,
    /// Only records that could not be displayed are kept; replay drains them.
    OnlyMissed,
}

/// A record waiting for replay, with its rendered line and matched rule.
#[derive(Debug, Clone)]
pub struct RetainedMessage {
    pub line: String,
    pub rule: Arc<RowColoringRule>,
    pub record: Arc<LogRecord>,
}

#[derive(Debug, Default)]
struct Inner {
    policy: RetentionPolicy,
    max_lines: usize,
    queue: Option<VecDeque<RetainedMessage>>,
}

/// Bounded FIFO of [`RetainedMessage`]s guarded by a single mutex.
#[derive(Debug, Default)]
pub struct RetentionBuffer {
    inner: Mutex<Inner>,
}

impl RetentionBuffer {
    pub fn new(max_lines: usize) -> Self {
        Self { inner: Mutex::new(Inner { max_lines, ..Inner::default() }) }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.lock().policy
    }

    pub fn max_lines(&self) -> usize {
        self.lock().max_lines
    }

    /// Switch policy. `None` discards the queue; any other policy creates an
    /// empty one if missing. A non-`None` policy without a line cap is a
    /// configuration error: it is reported and the policy degrades to `None`
    /// so the queue can never grow without bound.
    pub fn set_policy(&self, policy: RetentionPolicy, errors: &ErrorPolicy) -> Result<(), SinkError> {
        let mut inner = self.lock();
        if policy != RetentionPolicy::None && inner.max_lines == 0 {
            inner.policy = RetentionPolicy::None;
            inner.queue = None;
            drop(inner);
            return errors.report_or_throw(SinkError::Config(format!(
                "retention policy {policy:?} requires max_lines > 0"
            )));
        }
        inner.policy = policy;
        match policy {
            RetentionPolicy::None => inner.queue = None,
            RetentionPolicy::All | RetentionPolicy::OnlyMissed => {
                inner.queue.get_or_insert_with(VecDeque::new);
            }
        }
        tracing::debug!(?policy, max_lines = inner.max_lines, "retention policy set");
        Ok(())
    }

    /// Enqueue a message, evicting the oldest ones first so the queue never
    /// exceeds `max_lines`. No-op while the policy is `None`.
    pub fn store(&self, message: RetainedMessage) {
        let mut inner = self.lock();
        let max = inner.max_lines;
        let Some(queue) = inner.queue.as_mut() else { return };
        while max > 0 && queue.len() >= max {
            queue.pop_front();
        }
        queue.push_back(message);
    }

    /// Put back a message that could not be displayed. It goes to its place
    /// in record order, so a replay after a failed paint stays ordered; the
    /// cap still drops the oldest messages first.
    pub fn restore(&self, message: RetainedMessage) {
        let mut inner = self.lock();
        let max = inner.max_lines;
        let Some(queue) = inner.queue.as_mut() else { return };
        let at = queue.partition_point(|m| m.record.seq <= message.record.seq);
        queue.insert(at, message);
        while max > 0 && queue.len() > max {
            queue.pop_front();
        }
    }

    /// Remove and return every message, oldest first.
    pub fn drain_all(&self) -> Vec<RetainedMessage> {
        self.lock().queue.as_mut().map(|q| q.drain(..).collect()).unwrap_or_default()
    }

    /// Copy of every message, oldest first; the queue is left intact.
    pub fn peek_all(&self) -> Vec<RetainedMessage> {
        self.lock().queue.as_ref().map(|q| q.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().queue.as_ref().map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

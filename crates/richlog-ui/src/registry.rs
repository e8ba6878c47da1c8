//! Registry of active sinks.
//!
//! Passed explicitly to whoever needs it (the host's window setup code, the
//! click handler) rather than living in a global.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use richlog_core::SinkError;

use crate::control::{ControlId, TextSurface};
use crate::sink::RichTextSink;
use crate::window::HostWindow;

#[derive(Debug, Default)]
pub struct SinkRegistry {
    sinks: RwLock<Vec<RichTextSink>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink. A sink registered under the same name is replaced and
    /// closed.
    pub fn register(&self, sink: RichTextSink) {
        let replaced = {
            let mut sinks = self.write();
            let old = sinks.iter().position(|s| s.name() == sink.name()).map(|i| sinks.remove(i));
            sinks.push(sink);
            old
        };
        if let Some(old) = replaced {
            old.close();
        }
    }

    /// Remove and close the sink called `name`.
    pub fn unregister(&self, name: &str) -> Option<RichTextSink> {
        let removed = {
            let mut sinks = self.write();
            sinks.iter().position(|s| s.name() == name).map(|i| sinks.remove(i))
        };
        if let Some(sink) = &removed {
            sink.close();
        }
        removed
    }

    pub fn sink(&self, name: &str) -> Option<RichTextSink> {
        self.read().iter().find(|s| s.name() == name).cloned()
    }

    pub fn sinks(&self) -> Vec<RichTextSink> {
        self.read().clone()
    }

    /// The sink currently writing into `control`.
    pub fn sink_by_control(&self, control: ControlId) -> Option<RichTextSink> {
        self.read().iter().find(|s| s.control_id() == Some(control)).cloned()
    }

    /// Attach every sink configured for `window` whose control is unbound,
    /// disposed, or not the one now on the window. Returns how many sinks
    /// were attached; the first attach error is returned after all sinks
    /// have been tried.
    pub fn reinitialize_surfaces(&self, window: &Arc<HostWindow>) -> Result<usize, SinkError> {
        let mut attached = 0;
        let mut first_err = None;
        for sink in self.sinks() {
            if sink.window_name() != Some(window.name()) {
                continue;
            }
            let Some(control) = sink.control_name().and_then(|name| window.find_control(name)) else {
                continue;
            };
            if sink.is_bound_to(control.id()) {
                continue;
            }
            match sink.attach(Arc::clone(window), control, false) {
                Ok(()) => attached += 1,
                Err(err) => {
                    tracing::warn!(sink = %sink.name(), window = %window.name(), %err, "reattach failed");
                    first_err.get_or_insert(err);
                }
            }
        }
        tracing::debug!(window = %window.name(), attached, "surfaces reinitialized");
        match first_err {
            Some(err) => Err(err),
            None => Ok(attached),
        }
    }

    /// Close and forget every sink.
    pub fn close_all(&self) {
        let sinks = std::mem::take(&mut *self.write());
        for sink in sinks {
            sink.close();
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<RichTextSink>> {
        self.sinks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<RichTextSink>> {
        self.sinks.write().unwrap_or_else(PoisonError::into_inner)
    }
}

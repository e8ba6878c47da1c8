//! UI-thread dispatch: an ordered, fire-and-forget task queue.
//!
//! Producers hold a [`UiDispatcher`] and [`post`](UiDispatcher::post)
//! closures; the thread that owns the display holds the [`UiLoop`] and runs
//! them, either in bursts with [`pump`](UiLoop::pump) from its own event loop
//! or with a blocking [`run`](UiLoop::run). Tasks run in posting order.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use richlog_core::SinkError;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Create a connected dispatcher / loop pair.
pub fn channel() -> (UiDispatcher, UiLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiDispatcher { tx }, UiLoop { rx })
}

/// Producer handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UiDispatcher {
    tx: UnboundedSender<Task>,
}

impl UiDispatcher {
    /// Queue `task` for the UI thread without waiting for it.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> Result<(), SinkError> {
        self.tx.send(Box::new(task)).map_err(|_| SinkError::Dispatch)
    }

    /// Whether the UI loop has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side, owned by the UI thread.
#[derive(Debug)]
pub struct UiLoop {
    rx: UnboundedReceiver<Task>,
}

impl UiLoop {
    /// Run every task queued so far, including tasks those tasks post.
    /// Returns the number of tasks run.
    pub fn pump(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Run tasks until every dispatcher has been dropped.
    ///
    /// Blocks the current thread; do not call from inside an async runtime.
    pub fn run(mut self) {
        while let Some(task) = self.rx.blocking_recv() {
            task();
        }
        tracing::debug!("ui loop finished");
    }
}

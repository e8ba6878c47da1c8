//! [`RichTextSink`] — turns log records into styled lines on a rich-text
//! control.
//!
//! Rendering and rule selection happen on the caller's thread; the display
//! mutation is posted to the UI thread and never waited for. Records that
//! cannot be shown are kept according to the sink's [`RetentionPolicy`] and
//! replayed when a control is attached.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use richlog_core::coloring::ColoringEngine;
use richlog_core::config::SinkConfig;
use richlog_core::layout::{Layout, Render};
use richlog_core::links::{parse_clicked_link, LinkRegistry};
use richlog_core::retention::{RetainedMessage, RetentionBuffer, RetentionPolicy};
use richlog_core::{ErrorPolicy, LogRecord, SinkError};

use crate::adapter::{Binding, LinePainter, SurfaceAdapter, SurfaceOptions, SurfaceState};
use crate::control::{ControlId, SurfaceError, TextSurface};
use crate::dispatch::UiDispatcher;
use crate::window::{HostWindow, UiHost, WindowSpec};

/// Capacity of the link-click broadcast; slow subscribers lose old clicks.
const LINK_EVENT_CAPACITY: usize = 64;

/// A resolved click on a link.
#[derive(Debug, Clone)]
pub struct LinkClicked {
    /// Name of the sink that rendered the link.
    pub sink: String,
    /// Visible link text, without the hidden marker.
    pub link_text: String,
    pub record: Arc<LogRecord>,
}

#[derive(Debug, Clone, Copy, Default)]
struct WindowSettings {
    width: u16,
    height: u16,
    minimized: bool,
    tool_window: bool,
}

struct Inner {
    name: String,
    window_name: Option<String>,
    control_name: Option<String>,
    window: WindowSettings,
    allow_auto_create: bool,
    layout: Layout,
    painter: Arc<LinePainter>,
    coloring: Arc<ColoringEngine>,
    links: Arc<LinkRegistry>,
    retention: RetentionBuffer,
    adapter: SurfaceAdapter,
    errors: ErrorPolicy,
    dispatcher: UiDispatcher,
    host: Mutex<Option<Arc<dyn UiHost>>>,
    link_events: broadcast::Sender<LinkClicked>,
    /// Held while a write picks its target and while attach swaps it, so a
    /// record is either in the replay snapshot or painted after it.
    write_gate: Mutex<()>,
}

impl Inner {
    /// Paint on the UI thread; failures are logged and, under `OnlyMissed`,
    /// the message goes back into the queue for the next attach.
    fn paint(&self, control: &dyn TextSurface, msg: RetainedMessage) {
        if let Err(err) = self.painter.paint(control, &msg) {
            self.display_failed(msg, err);
        }
    }

    fn display_failed(&self, msg: RetainedMessage, err: SurfaceError) {
        tracing::warn!(sink = %self.name, seq = msg.record.seq, %err, "display write failed");
        if self.retention.policy() == RetentionPolicy::OnlyMissed {
            self.retention.restore(msg);
        }
    }
}

/// The rich-text sink. Clones share the same state.
#[derive(Clone)]
pub struct RichTextSink {
    inner: Arc<Inner>,
}

impl fmt::Debug for RichTextSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RichTextSink")
            .field("name", &self.inner.name)
            .field("window_name", &self.inner.window_name)
            .field("control_name", &self.inner.control_name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RichTextSink {
    /// Build a sink from its configuration.
    ///
    /// Malformed rules or layouts go through [`ErrorPolicy::report_or_throw`];
    /// in lenient mode the sink falls back to the default layout and no
    /// custom rules.
    pub fn from_config(cfg: &SinkConfig, errors: ErrorPolicy, dispatcher: UiDispatcher) -> Result<Self, SinkError> {
        if cfg.name.trim().is_empty() {
            errors.report_or_throw(SinkError::Config("sink name is required".into()))?;
        }
        let layout = match cfg.layout() {
            Ok(layout) => layout,
            Err(err) => {
                errors.report_or_throw(err)?;
                Layout::default()
            }
        };
        let coloring = match cfg.coloring() {
            Ok(engine) => engine,
            Err(err) => {
                errors.report_or_throw(err)?;
                ColoringEngine { use_defaults: cfg.use_default_rules, ..ColoringEngine::default() }
            }
        };
        let coloring = Arc::new(coloring);
        let links = Arc::new(LinkRegistry::new());
        let painter = Arc::new(LinePainter {
            coloring: Arc::clone(&coloring),
            links: Arc::clone(&links),
            options: SurfaceOptions {
                auto_scroll: cfg.auto_scroll,
                max_lines: cfg.max_lines,
                support_links: cfg.support_links,
            },
        });

        let retention = RetentionBuffer::new(cfg.max_lines);
        retention.set_policy(cfg.retention, &errors)?;

        let (link_events, _) = broadcast::channel(LINK_EVENT_CAPACITY);
        tracing::debug!(sink = %cfg.name, layout = %layout.source(), retention = ?retention.policy(), "sink configured");

        Ok(Self {
            inner: Arc::new(Inner {
                name: cfg.name.clone(),
                window_name: non_empty(cfg.window_name.as_deref()),
                control_name: non_empty(cfg.control_name.as_deref()),
                window: WindowSettings {
                    width: cfg.width,
                    height: cfg.height,
                    minimized: cfg.show_minimized,
                    tool_window: cfg.tool_window,
                },
                allow_auto_create: cfg.allow_auto_create,
                layout,
                painter,
                coloring,
                links,
                retention,
                adapter: SurfaceAdapter::new(),
                errors,
                dispatcher,
                host: Mutex::new(None),
                link_events,
                write_gate: Mutex::new(()),
            }),
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn window_name(&self) -> Option<&str> {
        self.inner.window_name.as_deref()
    }

    pub fn control_name(&self) -> Option<&str> {
        self.inner.control_name.as_deref()
    }

    pub fn state(&self) -> SurfaceState {
        self.inner.adapter.state()
    }

    pub fn binding(&self) -> Option<Binding> {
        self.inner.adapter.binding()
    }

    /// Id of the bound control, live or not.
    pub fn control_id(&self) -> Option<ControlId> {
        self.binding().map(|b| b.control.id())
    }

    pub fn is_bound_to(&self, control: ControlId) -> bool {
        self.inner.adapter.is_bound_to(control)
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        self.inner.retention.policy()
    }

    /// Number of messages waiting for replay.
    pub fn retained(&self) -> usize {
        self.inner.retention.len()
    }

    pub fn links(&self) -> &LinkRegistry {
        &self.inner.links
    }

    /// Receive every resolved link click from now on.
    pub fn subscribe_links(&self) -> broadcast::Receiver<LinkClicked> {
        self.inner.link_events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Bind to the configured window and control on `host`, or create an
    /// accessory window when allowed. A sink that is already bound to a live
    /// control is left alone.
    pub fn initialize(&self, host: Arc<dyn UiHost>) -> Result<(), SinkError> {
        *self.host_slot() = Some(Arc::clone(&host));
        if self.inner.adapter.live_control().is_some() {
            return Ok(());
        }
        let inner = &self.inner;
        let allow = inner.allow_auto_create;

        let Some(window_name) = inner.window_name.as_deref() else {
            if allow {
                return self.create_surface(host.as_ref());
            }
            return inner.errors.report_or_throw(SinkError::Config(format!(
                "sink `{}`: window_name is required when auto-create is off",
                inner.name
            )));
        };

        let Some(window) = host.open_window(window_name) else {
            if allow {
                tracing::info!(sink = %inner.name, window = %window_name, "window not open, creating it");
                return self.create_surface(host.as_ref());
            }
            tracing::info!(sink = %inner.name, window = %window_name, "window not open yet, waiting for it");
            return Ok(());
        };

        let Some(control_name) = inner.control_name.as_deref() else {
            inner.errors.report_or_throw(SinkError::Config(format!(
                "sink `{}`: control_name is required",
                inner.name
            )))?;
            return if allow { self.create_surface(host.as_ref()) } else { Ok(()) };
        };

        match window.find_control(control_name) {
            Some(control) => self.attach(window, control, false),
            None if allow => {
                inner.errors.report_or_throw(SinkError::Config(format!(
                    "sink `{}`: control `{control_name}` not found on window `{window_name}`",
                    inner.name
                )))?;
                self.create_surface(host.as_ref())
            }
            None => {
                tracing::info!(sink = %inner.name, window = %window_name, control = %control_name, "control not found yet, waiting for it");
                Ok(())
            }
        }
    }

    /// Bind to `control` on `window` and replay retained messages into it.
    /// `created` marks the window as owned by this sink; a window the sink
    /// already owns stays owned when only its control is replaced.
    pub fn attach(&self, window: Arc<HostWindow>, control: Arc<dyn TextSurface>, created: bool) -> Result<(), SinkError> {
        if self.inner.adapter.is_bound_to(control.id()) {
            tracing::trace!(sink = %self.inner.name, control = %control.name(), "already attached");
            return Ok(());
        }
        let gate = self.write_gate();
        let created = created
            || self.inner.adapter.binding().is_some_and(|b| b.created && Arc::ptr_eq(&b.window, &window));
        // the replay is queued before any write can see the new binding
        let replayed = self.replay(Arc::clone(&control));
        let previous = self.inner.adapter.bind(Binding {
            window: Arc::clone(&window),
            control: Arc::clone(&control),
            created,
        });
        drop(gate);

        if let Some(previous) = previous {
            self.release(previous, Some(&window));
        }
        tracing::debug!(
            sink = %self.inner.name,
            window = %window.name(),
            control = %control.name(),
            created,
            "surface attached"
        );
        replayed
    }

    /// Unbind the control. A window the sink created is closed; other
    /// windows are left alone.
    pub fn detach(&self) {
        if let Some(binding) = self.inner.adapter.unbind() {
            self.release(binding, None);
            tracing::debug!(sink = %self.inner.name, "surface detached");
        }
    }

    /// Shut the sink down.
    pub fn close(&self) {
        self.detach();
        tracing::debug!(sink = %self.inner.name, "sink closed");
    }

    /// Change the retention policy at runtime.
    pub fn set_retention(&self, policy: RetentionPolicy) -> Result<(), SinkError> {
        self.inner.retention.set_policy(policy, &self.inner.errors)
    }

    /// Drop the links painted into a control that is no longer bound, and
    /// close its window if the sink owns it and `keep` is a different one.
    fn release(&self, binding: Binding, keep: Option<&Arc<HostWindow>>) {
        let dropped = self.inner.links.remove_owner(binding.control.id());
        if dropped > 0 {
            tracing::debug!(sink = %self.inner.name, control = %binding.control.name(), links = dropped, "links dropped");
        }
        if !binding.created || keep.is_some_and(|w| Arc::ptr_eq(w, &binding.window)) {
            return;
        }
        let host = self.host_slot().clone();
        match host {
            Some(host) => host.close_window(&binding.window),
            None => binding.window.close(),
        }
    }

    fn create_surface(&self, host: &dyn UiHost) -> Result<(), SinkError> {
        let s = self.inner.window;
        let spec = WindowSpec {
            width: s.width,
            height: s.height,
            minimized: s.minimized,
            tool_window: s.tool_window,
            ..WindowSpec::accessory(self.inner.window_name.as_deref(), self.inner.control_name.as_deref())
        };
        let window = host.create_window(&spec);
        let control = window.find_control(&spec.control_name).ok_or_else(|| {
            SinkError::Display(format!("window `{}` was created without control `{}`", spec.name, spec.control_name))
        })?;
        tracing::info!(sink = %self.inner.name, window = %spec.name, "created accessory window");
        self.attach(window, control, true)
    }

    fn replay(&self, control: Arc<dyn TextSurface>) -> Result<(), SinkError> {
        let inner = &self.inner;
        let messages = match inner.retention.policy() {
            RetentionPolicy::None => return Ok(()),
            RetentionPolicy::All => {
                if !inner.adapter.mark_replayed(control.id()) {
                    tracing::debug!(sink = %inner.name, control = %control.name(), "already replayed into this control");
                    return Ok(());
                }
                inner.retention.peek_all()
            }
            RetentionPolicy::OnlyMissed => inner.retention.drain_all(),
        };
        if messages.is_empty() {
            return Ok(());
        }
        tracing::debug!(sink = %inner.name, count = messages.len(), "replaying retained messages");
        let task_inner = Arc::clone(inner);
        let posted = inner.dispatcher.post(move || {
            for msg in messages {
                task_inner.paint(control.as_ref(), msg);
            }
        });
        if let Err(err) = posted {
            return inner.errors.warn_or_throw(err);
        }
        Ok(())
    }

    fn host_slot(&self) -> MutexGuard<'_, Option<Arc<dyn UiHost>>> {
        self.inner.host.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_gate(&self) -> MutexGuard<'_, ()> {
        self.inner.write_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    /// Render, colour and display one record. Never waits for the UI thread.
    pub fn write(&self, record: impl Into<Arc<LogRecord>>) -> Result<(), SinkError> {
        let record = record.into();
        if !self.ensure_surface()? {
            tracing::trace!(sink = %self.inner.name, seq = record.seq, "no surface and nothing retained, record skipped");
            return Ok(());
        }
        let msg = self.prepare(record);
        let delivered = {
            let _gate = self.write_gate();
            let delivered = match self.inner.adapter.live_control() {
                Some(control) => {
                    let inner = Arc::clone(&self.inner);
                    let task_msg = msg.clone();
                    self.dispatch(move || inner.paint(control.as_ref(), task_msg))
                }
                None => false,
            };
            self.retain(msg, delivered);
            delivered
        };
        self.recover(delivered)
    }

    /// Write several records with a single dispatch to the UI thread.
    pub fn write_batch<I>(&self, records: I) -> Result<(), SinkError>
    where
        I: IntoIterator,
        I::Item: Into<Arc<LogRecord>>,
    {
        let records: Vec<Arc<LogRecord>> = records.into_iter().map(Into::into).collect();
        if records.is_empty() {
            return Ok(());
        }
        if !self.ensure_surface()? {
            tracing::trace!(sink = %self.inner.name, count = records.len(), "no surface and nothing retained, batch skipped");
            return Ok(());
        }
        let messages: Vec<RetainedMessage> = records.into_iter().map(|r| self.prepare(r)).collect();
        let delivered = {
            let _gate = self.write_gate();
            let delivered = match self.inner.adapter.live_control() {
                Some(control) => {
                    let inner = Arc::clone(&self.inner);
                    let batch = messages.clone();
                    self.dispatch(move || {
                        for msg in batch {
                            inner.paint(control.as_ref(), msg);
                        }
                    })
                }
                None => false,
            };
            for msg in messages {
                self.retain(msg, delivered);
            }
            delivered
        };
        self.recover(delivered)
    }

    /// Make sure a write has somewhere to go. Returns `false` when the
    /// record can be dropped without rendering: nothing is bound, nothing
    /// can be created and nothing is retained.
    fn ensure_surface(&self) -> Result<bool, SinkError> {
        if self.inner.adapter.live_control().is_some() {
            return Ok(true);
        }
        let host = self.host_slot().clone();
        if let (true, Some(host)) = (self.inner.allow_auto_create, host) {
            if let Err(err) = self.create_surface(host.as_ref()) {
                self.inner.errors.warn_or_throw(err)?;
            }
            return Ok(true);
        }
        Ok(self.inner.retention.policy() != RetentionPolicy::None)
    }

    /// After an undelivered write, create a surface if allowed so the
    /// retained record is replayed right away.
    fn recover(&self, delivered: bool) -> Result<(), SinkError> {
        if delivered || !self.inner.allow_auto_create || self.inner.adapter.live_control().is_some() {
            return Ok(());
        }
        let Some(host) = self.host_slot().clone() else { return Ok(()) };
        if let Err(err) = self.create_surface(host.as_ref()) {
            self.inner.errors.warn_or_throw(err)?;
        }
        Ok(())
    }

    fn prepare(&self, record: Arc<LogRecord>) -> RetainedMessage {
        let line = self.inner.layout.render(&record);
        let rule = self.inner.coloring.row_rule(&record);
        RetainedMessage { line, rule, record }
    }

    fn dispatch(&self, task: impl FnOnce() + Send + 'static) -> bool {
        match self.inner.dispatcher.post(task) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(sink = %self.inner.name, %err, "could not reach the UI thread");
                false
            }
        }
    }

    fn retain(&self, msg: RetainedMessage, delivered: bool) {
        match self.inner.retention.policy() {
            RetentionPolicy::All => self.inner.retention.store(msg),
            RetentionPolicy::OnlyMissed if !delivered => self.inner.retention.store(msg),
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    /// Resolve the text of a clicked link and notify subscribers.
    ///
    /// Unknown or malformed links are reported through the error policy and
    /// produce no notification.
    pub fn handle_link_click(&self, clicked: &str) -> Result<Option<LinkClicked>, SinkError> {
        let (link_text, id) = match parse_clicked_link(clicked) {
            Ok(parsed) => parsed,
            Err(err) => {
                self.inner.errors.report_or_throw(err)?;
                return Ok(None);
            }
        };
        let Some(record) = self.inner.links.get(id) else {
            self.inner.errors.report_or_throw(SinkError::UnknownLink(id))?;
            return Ok(None);
        };
        let event = LinkClicked { sink: self.inner.name.clone(), link_text, record };
        // no subscribers is fine
        let _ = self.inner.link_events.send(event.clone());
        tracing::debug!(sink = %self.inner.name, link = id, "link clicked");
        Ok(Some(event))
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

//! Host windows and the UI host that opens, creates and closes them.
//!
//! Controls are looked up by name in a per-window map, so "find the control
//! called X on window Y" never walks a widget tree.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::control::TextSurface;
use crate::rich_text::RichTextBox;

/// Title given to windows the sink creates for itself.
pub const CREATED_WINDOW_TITLE: &str = "richlog";

/// How to build a window the sink creates on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub name: String,
    pub title: String,
    pub width: u16,
    pub height: u16,
    pub minimized: bool,
    pub tool_window: bool,
    /// Name of the single rich-text control placed on the window.
    pub control_name: String,
}

impl WindowSpec {
    /// Spec for an accessory window; a missing name gets a unique one.
    pub fn accessory(name: Option<&str>, control_name: Option<&str>) -> Self {
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("richlog-{}", uuid::Uuid::new_v4().simple()),
        };
        let control_name = match control_name {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => "richlog".to_string(),
        };
        Self {
            name,
            title: CREATED_WINDOW_TITLE.to_string(),
            width: 0,
            height: 0,
            minimized: false,
            tool_window: true,
            control_name,
        }
    }
}

pub struct HostWindow {
    name: String,
    title: String,
    size: (u16, u16),
    minimized: bool,
    tool_window: bool,
    closed: AtomicBool,
    controls: Mutex<BTreeMap<String, Arc<RichTextBox>>>,
}

impl fmt::Debug for HostWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostWindow")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl HostWindow {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            size: (0, 0),
            minimized: false,
            tool_window: false,
            closed: AtomicBool::new(false),
            controls: Mutex::new(BTreeMap::new()),
        }
    }

    /// Build the window described by `spec`, including its control.
    pub fn from_spec(spec: &WindowSpec) -> Self {
        let window = Self {
            size: (spec.width, spec.height),
            minimized: spec.minimized,
            tool_window: spec.tool_window,
            ..Self::new(spec.name.clone(), spec.title.clone())
        };
        window.add_control(spec.control_name.clone());
        window
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn is_tool_window(&self) -> bool {
        self.tool_window
    }

    /// Create and place a new rich-text control. A control with the same
    /// name is replaced.
    pub fn add_control(&self, name: impl Into<String>) -> Arc<RichTextBox> {
        let control = Arc::new(RichTextBox::new(name));
        self.insert_control(Arc::clone(&control));
        control
    }

    pub fn insert_control(&self, control: Arc<RichTextBox>) {
        if let Some(old) = self.lock().insert(control.name().to_string(), control) {
            old.dispose();
        }
    }

    /// Remove a control from the window, disposing it.
    pub fn remove_control(&self, name: &str) -> Option<Arc<RichTextBox>> {
        let removed = self.lock().remove(name);
        if let Some(control) = &removed {
            control.dispose();
        }
        removed
    }

    pub fn find_control(&self, name: &str) -> Option<Arc<RichTextBox>> {
        self.lock().get(name).cloned()
    }

    pub fn controls(&self) -> Vec<Arc<RichTextBox>> {
        self.lock().values().cloned().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the window and dispose every control on it. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for control in self.lock().values() {
            control.dispose();
        }
        tracing::debug!(window = %self.name, "window closed");
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Arc<RichTextBox>>> {
        self.controls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The windowing system as the sink sees it.
pub trait UiHost: Send + Sync + fmt::Debug {
    /// An open window called `name`.
    fn open_window(&self, name: &str) -> Option<Arc<HostWindow>>;
    /// Create and show a window.
    fn create_window(&self, spec: &WindowSpec) -> Arc<HostWindow>;
    fn close_window(&self, window: &HostWindow);
}

/// In-memory [`UiHost`]: a name-indexed set of open windows.
#[derive(Debug, Default)]
pub struct Desktop {
    windows: Mutex<BTreeMap<String, Arc<HostWindow>>>,
}

impl Desktop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show an application-owned window.
    pub fn show(&self, window: HostWindow) -> Arc<HostWindow> {
        let window = Arc::new(window);
        self.lock().insert(window.name().to_string(), Arc::clone(&window));
        window
    }

    pub fn windows(&self) -> Vec<Arc<HostWindow>> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Arc<HostWindow>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UiHost for Desktop {
    fn open_window(&self, name: &str) -> Option<Arc<HostWindow>> {
        self.lock().get(name).filter(|w| !w.is_closed()).cloned()
    }

    fn create_window(&self, spec: &WindowSpec) -> Arc<HostWindow> {
        tracing::debug!(window = %spec.name, control = %spec.control_name, "creating window");
        self.show(HostWindow::from_spec(spec))
    }

    fn close_window(&self, window: &HostWindow) {
        window.close();
        let mut windows = self.lock();
        if windows.get(window.name()).is_some_and(|w| w.is_closed()) {
            windows.remove(window.name());
        }
    }
}

//! Fixtures: an in-memory desktop plus UI loop, and config documents.

use std::sync::Arc;

use richlog_core::config::SinkConfig;
use richlog_core::ErrorPolicy;
use richlog_ui::dispatch::{self, UiDispatcher, UiLoop};
use richlog_ui::window::{Desktop, HostWindow, UiHost};
use richlog_ui::{RichTextBox, RichTextSink, SinkRegistry, TextSurface};

use super::builders::{CONTROL, WINDOW};

/// A desktop, one UI loop, and a registry, wired the way a host
/// application wires them.
pub struct Stage {
    pub desktop: Arc<Desktop>,
    pub registry: SinkRegistry,
    dispatcher: UiDispatcher,
    ui: UiLoop,
}

impl Stage {
    pub fn new() -> Self {
        let (dispatcher, ui) = dispatch::channel();
        Self { desktop: Arc::new(Desktop::new()), registry: SinkRegistry::new(), dispatcher, ui }
    }

    pub fn host(&self) -> Arc<dyn UiHost> {
        Arc::clone(&self.desktop) as Arc<dyn UiHost>
    }

    /// Build, initialize and register a strict-mode sink.
    pub fn sink(&self, cfg: &SinkConfig) -> RichTextSink {
        self.sink_with(cfg, ErrorPolicy::strict())
    }

    pub fn sink_with(&self, cfg: &SinkConfig, errors: ErrorPolicy) -> RichTextSink {
        let sink = self.unstarted(cfg, errors);
        sink.initialize(self.host()).expect("initialize");
        self.registry.register(sink.clone());
        sink
    }

    /// A sink sharing this stage's UI loop, not yet initialized or registered.
    pub fn unstarted(&self, cfg: &SinkConfig, errors: ErrorPolicy) -> RichTextSink {
        RichTextSink::from_config(cfg, errors, self.dispatcher.clone()).expect("sink config")
    }

    /// Open window `main` holding an empty control `log`.
    pub fn open_main(&self) -> (Arc<HostWindow>, Arc<RichTextBox>) {
        let window = self
            .desktop
            .open_window(WINDOW)
            .unwrap_or_else(|| self.desktop.show(HostWindow::new(WINDOW, "Main")));
        let control = window.add_control(CONTROL);
        (window, control)
    }

    /// Run everything posted to the UI thread so far.
    pub fn pump(&mut self) -> usize {
        self.ui.pump()
    }
}

/// Visible lines of a control, without the trailing empty line.
pub fn lines_of(control: &RichTextBox) -> Vec<String> {
    control.visible_text().lines().map(str::to_string).collect()
}

/// Full text of a surface, hidden markers included.
pub fn raw_text(control: &dyn TextSurface) -> String {
    control.text().expect("live control")
}

/// A config exercising every sink option.
pub const FULL_CONFIG_TOML: &str = r##"
throw_exceptions = true

[[sinks]]
name              = "orders"
window_name       = "main"
control_name      = "log"
width             = 640
height            = 480
show_minimized    = true
tool_window       = false
auto_scroll       = true
max_lines         = 250
retention         = "all"
use_default_rules = true
allow_auto_create = false
support_links     = true
layout            = "${level} ${message} ${link:property:name=order}"

[[sinks.row_rules]]
condition = "level >= Warn and contains(message, 'late')"
fg        = "#ff8800"
bg        = "Empty"
style     = ["bold", "underline"]

[[sinks.word_rules]]
text        = "ORD"
whole_words = true
ignore_case = true
fg          = "Blue"

[[sinks.word_rules]]
regex = "\\d+ms"
fg    = "Purple"
style = ["italic"]

[[sinks]]
name = "accessory"
"##;

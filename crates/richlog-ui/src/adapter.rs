//! Display surface adapter: the binding to a live control and the write
//! protocol that paints one record into it.
//!
//! # Write protocol
//!
//! [`LinePainter::paint`] runs on the UI thread and, for one retained
//! message:
//!
//! 1. notes the insertion offset (current text length),
//! 2. collapses the selection there and applies the row colours and the
//!    toggled row style as the insertion format,
//! 3. appends the line plus `\n`,
//! 4. selects the appended span and re-applies the row colours,
//! 5. styles every word-rule match inside the span, in rule order,
//! 6. replaces link placeholders back-to-front with the visible text and a
//!    hidden `#link<id>` marker, registering each id,
//! 7. evicts the oldest lines over `max_lines`, unregistering the link ids
//!    found in the hidden runs of the evicted RTF,
//! 8. scrolls to the end when auto-scroll is on.
//!
//! Any failure abandons the rest of the write; the caller decides what to do
//! with the undelivered message.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use richlog_core::coloring::{combine_style, ColoringEngine};
use richlog_core::links::{embedded_link_ids, link_marker, LinkRegistry};
use richlog_core::retention::RetainedMessage;
use richlog_core::rules::{FontStyle, Rgb};

use crate::control::{CharFormat, ControlId, SurfaceError, TextSurface};
use crate::rtf;
use crate::window::HostWindow;

/// Per-sink display settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceOptions {
    pub auto_scroll: bool,
    /// 0 = unlimited.
    pub max_lines: usize,
    pub support_links: bool,
}

// ---------------------------------------------------------------------------
// Binding state
// ---------------------------------------------------------------------------

/// The window and control a sink currently writes into.
#[derive(Debug, Clone)]
pub struct Binding {
    pub window: Arc<HostWindow>,
    pub control: Arc<dyn TextSurface>,
    /// The sink created the window and is responsible for closing it.
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Unattached,
    Attached,
    /// The bound control was destroyed; writes treat this as unattached.
    Disposed,
}

#[derive(Debug, Default)]
pub struct SurfaceAdapter {
    binding: Mutex<Option<Binding>>,
    last_replayed: Mutex<Option<ControlId>>,
}

impl SurfaceAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SurfaceState {
        match self.lock().as_ref() {
            None => SurfaceState::Unattached,
            Some(b) if b.control.is_disposed() => SurfaceState::Disposed,
            Some(_) => SurfaceState::Attached,
        }
    }

    /// Snapshot of the bound control if it is still usable. The snapshot may
    /// go stale before it is used; the write then fails and is reported.
    pub fn live_control(&self) -> Option<Arc<dyn TextSurface>> {
        self.lock()
            .as_ref()
            .filter(|b| !b.control.is_disposed())
            .map(|b| Arc::clone(&b.control))
    }

    pub fn binding(&self) -> Option<Binding> {
        self.lock().clone()
    }

    /// Whether `control` is bound and live.
    pub fn is_bound_to(&self, control: ControlId) -> bool {
        self.lock().as_ref().is_some_and(|b| b.control.id() == control && !b.control.is_disposed())
    }

    /// Install `binding`, returning the one it replaces.
    pub fn bind(&self, binding: Binding) -> Option<Binding> {
        self.lock().replace(binding)
    }

    pub fn unbind(&self) -> Option<Binding> {
        self.lock().take()
    }

    /// Record `control` as the latest `All`-replay target. Returns `false`
    /// if it already was, in which case the replay must be skipped.
    pub fn mark_replayed(&self, control: ControlId) -> bool {
        let mut last = self.last_replayed.lock().unwrap_or_else(PoisonError::into_inner);
        if *last == Some(control) {
            return false;
        }
        *last = Some(control);
        true
    }

    fn lock(&self) -> MutexGuard<'_, Option<Binding>> {
        self.binding.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Painting
// ---------------------------------------------------------------------------

/// Everything the UI thread needs to paint records for one sink.
#[derive(Debug)]
pub struct LinePainter {
    pub coloring: Arc<ColoringEngine>,
    pub links: Arc<LinkRegistry>,
    pub options: SurfaceOptions,
}

impl LinePainter {
    pub fn paint(&self, control: &dyn TextSurface, msg: &RetainedMessage) -> Result<(), SurfaceError> {
        let rule = &msg.rule;
        let start = control.text_len()?;

        control.select(start, 0)?;
        apply_style(control, rule.fg, rule.bg, rule.style)?;

        control.append_text(&msg.line)?;
        control.append_text("\n")?;

        let appended = control.text_len()? - start;
        control.select(start, appended)?;
        control.set_selection_back_color(rule.bg)?;
        control.set_selection_color(rule.fg)?;

        self.paint_words(control, start, &msg.line)?;

        if self.options.support_links {
            self.insert_links(control, start, msg)?;
        }

        if self.options.max_lines > 0 {
            self.evict(control)?;
        }

        if self.options.auto_scroll {
            let end = control.text_len()?;
            control.select(end, 0)?;
            control.scroll_to_caret()?;
        }
        Ok(())
    }

    fn paint_words(&self, control: &dyn TextSurface, start: usize, line: &str) -> Result<(), SurfaceError> {
        if self.coloring.word_rules.is_empty() {
            return Ok(());
        }
        let spans = match self.coloring.word_spans(line, 0) {
            Ok(spans) => spans,
            Err(err) => {
                tracing::warn!(%err, "word rules skipped for this line");
                return Ok(());
            }
        };
        for span in spans {
            let from = start + line[..span.start].chars().count();
            let len = line[span.start..span.start + span.len].chars().count();
            control.select(from, len)?;
            apply_style(control, span.rule.fg, span.rule.bg, span.rule.style)?;
        }
        Ok(())
    }

    fn insert_links(&self, control: &dyn TextSurface, start: usize, msg: &RetainedMessage) -> Result<(), SurfaceError> {
        let Some(info) = msg.record.link_info() else { return Ok(()) };
        let appended: Vec<char> = control.text()?.chars().skip(start).collect();

        // (char offset in the appended span, placeholder length, link text)
        let mut found: Vec<(usize, usize, String)> = Vec::new();
        for (placeholder, text) in info.entries() {
            let needle: Vec<char> = placeholder.chars().collect();
            if needle.is_empty() {
                continue;
            }
            let mut i = 0;
            while i + needle.len() <= appended.len() {
                if appended[i..i + needle.len()] == needle[..] {
                    found.push((i, needle.len(), text.clone()));
                    i += needle.len();
                } else {
                    i += 1;
                }
            }
        }
        found.sort_by(|a, b| b.0.cmp(&a.0));

        for (offset, len, text) in found {
            let id = self.links.next_id();
            let marker = link_marker(id);
            control.select(start + offset, len)?;
            control.set_selected_rtf(&format!("{{\\rtf1\\ansi {}\\v {}\\v0}}", rtf::escape(&text), marker))?;
            control.select(start + offset, text.chars().count() + marker.chars().count())?;
            control.set_selection_link(true)?;
            self.links.add(id, control.id(), Arc::clone(&msg.record));
            tracing::trace!(link = id, %text, "link inserted");
        }
        Ok(())
    }

    fn evict(&self, control: &dyn TextSurface) -> Result<(), SurfaceError> {
        let lines = control.content_line_count()?;
        if lines <= self.options.max_lines {
            return Ok(());
        }
        let end = control.first_char_index_of_line(lines - self.options.max_lines)?;
        control.select(0, end)?;
        if self.options.support_links {
            // only hidden markers count; visible text may spell `#link<n>` too
            match control
                .selected_rtf()
                .and_then(|encoded| rtf::decode(&encoded, CharFormat::default()).map_err(SurfaceError::from))
            {
                Ok(cells) => {
                    for id in rtf::hidden_runs(&cells).iter().flat_map(|run| embedded_link_ids(run)) {
                        self.links.remove(id);
                    }
                }
                Err(err) => tracing::warn!(%err, "could not scan evicted lines for links"),
            }
        }
        control.set_selected_rtf(rtf::EMPTY_RTF)?;
        tracing::trace!(removed_lines = lines - self.options.max_lines, "evicted oldest lines");
        Ok(())
    }
}

/// Apply colours and the toggled style to the current selection.
fn apply_style(control: &dyn TextSurface, fg: Option<Rgb>, bg: Option<Rgb>, style: FontStyle) -> Result<(), SurfaceError> {
    control.set_selection_back_color(bg)?;
    control.set_selection_color(fg)?;
    let current = control.selection_style()?;
    control.set_selection_style(combine_style(current, style))
}

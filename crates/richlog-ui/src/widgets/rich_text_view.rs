//! Rich-text view — draws a [`RichTextBox`] with the formats the sink wrote.
//!
//! The box owns the scroll position (`top_line`) so the sink's
//! scroll-to-caret and the user's own scrolling act on the same state. The
//! view only remembers where it last drew, which is what click hit-testing
//! needs.

use std::cell::Cell;
use std::sync::Arc;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget},
};

use crate::event::AppEvent;
use crate::rich_text::RichTextBox;
use crate::theme::Theme;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RichTextViewState {
    pub control: Arc<RichTextBox>,
    /// When true, new text keeps the view pinned to the tail.
    pub follow: bool,
    /// Cached from the last render for scrolling and hit-testing.
    text_area: Cell<Rect>,
}

impl RichTextViewState {
    pub fn new(control: Arc<RichTextBox>) -> Self {
        Self { control, follow: true, text_area: Cell::new(Rect::default()) }
    }

    fn page(&self) -> isize {
        self.text_area.get().height.max(1) as isize
    }

    /// Apply a navigation event. Scrolling up stops following the tail;
    /// `G` resumes it.
    pub fn handle(&mut self, event: &AppEvent) {
        match event {
            AppEvent::LineUp => {
                self.follow = false;
                self.control.scroll_by(-1);
            }
            AppEvent::LineDown => self.control.scroll_by(1),
            AppEvent::PageUp => {
                self.follow = false;
                self.control.scroll_by(-self.page());
            }
            AppEvent::PageDown => self.control.scroll_by(self.page()),
            AppEvent::ScrollToTail => {
                self.follow = true;
                self.control.scroll_to_end();
            }
            _ => return,
        }
        tracing::trace!(top_line = self.control.top_line(), follow = self.follow, "view: scrolled");
    }

    /// Character index under a terminal cell, if the cell shows text.
    pub fn hit_test(&self, column: u16, row: u16) -> Option<usize> {
        let area = self.text_area.get();
        if column < area.x || column >= area.right() || row < area.y || row >= area.bottom() {
            return None;
        }
        let line = self.control.top_line() + (row - area.y) as usize;
        self.control.index_at(line, (column - area.x) as usize)
    }
}

// ---------------------------------------------------------------------------
// Widget
// ---------------------------------------------------------------------------

pub struct RichTextView<'a> {
    state: &'a RichTextViewState,
    title: &'a str,
    focused: bool,
    theme: &'a Theme,
}

impl<'a> RichTextView<'a> {
    pub fn new(state: &'a RichTextViewState, title: &'a str, focused: bool, theme: &'a Theme) -> Self {
        Self { state, title, focused, theme }
    }
}

impl Widget for RichTextView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused { self.theme.border_focused } else { self.theme.border_unfocused };
        let title = if self.state.follow { format!(" {} ", self.title) } else { format!(" {} (paused, G to follow) ", self.title) };
        let block = Block::bordered().title(title).border_style(border_style);
        let inner = block.inner(area);
        block.render(area, buf);

        // text fills the inner area minus a 1-column scrollbar strip
        let text_area = Rect { width: inner.width.saturating_sub(1), ..inner };
        let sb_area = Rect { x: inner.right().saturating_sub(1), width: 1, ..inner };
        self.state.text_area.set(text_area);

        let control = &self.state.control;
        control.set_viewport_lines(text_area.height as usize);
        if self.state.follow {
            control.scroll_to_end();
        }

        let lines = control.styled_lines();
        let total = lines.len();
        let top = control.top_line().min(total);
        let visible: Vec<Line<'static>> = lines
            .into_iter()
            .skip(top)
            .take(text_area.height as usize)
            .map(|runs| {
                Line::from(
                    runs.into_iter()
                        .map(|run| Span::styled(run.text, self.theme.char_style(&run.format)))
                        .collect::<Vec<_>>(),
                )
            })
            .collect();

        Paragraph::new(visible).render(text_area, buf);

        if total > 0 {
            let mut sb_state = ScrollbarState::new(total).position(top).viewport_content_length(text_area.height as usize);
            StatefulWidget::render(
                Scrollbar::new(ScrollbarOrientation::VerticalRight).begin_symbol(None).end_symbol(None),
                sb_area,
                buf,
                &mut sb_state,
            );
        }
    }
}

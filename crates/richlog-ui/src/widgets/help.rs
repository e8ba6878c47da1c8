//! Help popup — centred floating overlay listing all keybindings.
//!
//! Toggle with `?`; close with `?` or `Escape`.

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Widget},
};

const BINDINGS: &[(&str, &str)] = &[
    ("q  /  Ctrl+c", "Quit"),
    ("↑ k  /  ↓ j", "Scroll one line"),
    ("PageUp  /  Ctrl+u", "Scroll up one page"),
    ("PageDown / Ctrl+d", "Scroll down one page"),
    ("G", "Jump to the newest line and follow"),
    ("click", "Open the record behind a link"),
    ("Escape", "Close popup"),
    ("?", "Toggle this help popup"),
];

pub struct HelpPopup<'a> {
    theme: &'a Theme,
}

impl<'a> HelpPopup<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self { theme }
    }
}

impl Widget for HelpPopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let popup = centered_rect(64, BINDINGS.len() as u16 + 2, area);
        Clear.render(popup, buf);

        let block = Block::bordered()
            .title(" richlog — keybindings (? to close) ")
            .border_style(self.theme.popup_border);
        let inner = block.inner(popup);
        block.render(popup, buf);

        let lines: Vec<Line> = BINDINGS
            .iter()
            .map(|(key, desc)| {
                Line::from(vec![Span::styled(format!("  {key:<22}"), self.theme.popup_key), Span::raw(*desc)])
            })
            .collect();

        Paragraph::new(lines).render(inner, buf);
    }
}

/// A `width` x `height` rectangle centred in `area`, clipped to it.
pub(crate) fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect { x, y, width: width.min(area.width), height: height.min(area.height) }
}

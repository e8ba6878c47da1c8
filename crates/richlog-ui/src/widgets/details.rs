//! Link details popup: the record behind a clicked link.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Widget, Wrap},
};

use crate::sink::LinkClicked;
use crate::theme::Theme;
use crate::widgets::help::centered_rect;

pub struct DetailsPopup<'a> {
    clicked: &'a LinkClicked,
    theme: &'a Theme,
}

impl<'a> DetailsPopup<'a> {
    pub fn new(clicked: &'a LinkClicked, theme: &'a Theme) -> Self {
        Self { clicked, theme }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let record = &self.clicked.record;
        let field = |label: &str, value: String| {
            Line::from(vec![Span::styled(format!("{label:<10}"), self.theme.popup_label), Span::raw(value)])
        };
        let mut lines = vec![
            field("link", self.clicked.link_text.clone()),
            field("sink", self.clicked.sink.clone()),
            field("time", record.ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
            field("level", record.level.to_string()),
            field("logger", record.logger.clone()),
            field("message", record.message.clone()),
        ];
        for (key, value) in record.properties() {
            lines.push(Line::from(vec![
                Span::styled(format!("  {key:<8}"), self.theme.popup_key),
                Span::raw(match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                }),
            ]));
        }
        lines
    }
}

impl Widget for DetailsPopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = self.lines();
        let popup = centered_rect(72, lines.len() as u16 + 2, area);
        Clear.render(popup, buf);

        let block = Block::bordered().title(" link (Esc to close) ").border_style(self.theme.popup_border);
        let inner = block.inner(popup);
        block.render(popup, buf);

        Paragraph::new(lines).wrap(Wrap { trim: false }).render(inner, buf);
    }
}

//! The demo console: one window whose rich-text control a sink writes into.
//!
//! [`App::run`] sets up the terminal, drains the UI queue every tick so
//! posted writes land on the control, and tears everything down cleanly on
//! exit or panic. The console thread is the UI thread; producers write to
//! the sink from anywhere.

use std::{io, sync::Arc, time::Duration};

use crossterm::{
    event::{self as ct_event, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};

use crate::{
    control::TextSurface,
    dispatch::UiLoop,
    event::{self, AppEvent},
    registry::SinkRegistry,
    rich_text::RichTextBox,
    sink::LinkClicked,
    theme::Theme,
    widgets::{
        details::DetailsPopup,
        help::HelpPopup,
        rich_text_view::{RichTextView, RichTextViewState},
    },
};

const TICK: Duration = Duration::from_millis(16);

pub struct App {
    title: String,
    view: RichTextViewState,
    registry: Arc<SinkRegistry>,
    ui: UiLoop,
    theme: Theme,
    details: Option<LinkClicked>,
    show_help: bool,
    quit: bool,
}

impl App {
    pub fn new(
        title: impl Into<String>,
        control: Arc<RichTextBox>,
        registry: Arc<SinkRegistry>,
        ui: UiLoop,
        theme: Theme,
    ) -> Self {
        Self {
            title: title.into(),
            view: RichTextViewState::new(control),
            registry,
            ui,
            theme,
            details: None,
            show_help: false,
            quit: false,
        }
    }

    /// Set up the terminal, run the event loop, and restore the terminal on exit.
    pub fn run(mut self) -> anyhow::Result<()> {
        install_panic_hook();

        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        // Always restore terminal, even if the loop returned an error
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        let _ = terminal.show_cursor();

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> anyhow::Result<()> {
        loop {
            self.tick();
            terminal.draw(|frame| self.draw(frame))?;

            if self.quit {
                break;
            }

            if ct_event::poll(TICK)? {
                if let Some(ev) = event::to_app_event(ct_event::read()?) {
                    tracing::trace!(event = ?ev, "input");
                    self.handle(ev);
                }
            }
        }
        Ok(())
    }

    /// Run every task the sinks have posted since the last tick.
    pub fn tick(&mut self) -> usize {
        self.ui.pump()
    }

    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(RichTextView::new(&self.view, &self.title, self.details.is_none(), &self.theme), area);

        if let Some(clicked) = &self.details {
            frame.render_widget(DetailsPopup::new(clicked, &self.theme), area);
        }
        if self.show_help {
            frame.render_widget(HelpPopup::new(&self.theme), area);
        }
    }

    pub fn handle(&mut self, event: AppEvent) {
        // Popups intercept everything but their close keys.
        if self.show_help {
            if matches!(event, AppEvent::ToggleHelp | AppEvent::Escape | AppEvent::Quit) {
                self.show_help = false;
            }
            return;
        }
        if self.details.is_some() {
            if matches!(event, AppEvent::Escape | AppEvent::Quit | AppEvent::Click { .. }) {
                self.details = None;
            }
            return;
        }

        match event {
            AppEvent::Quit => self.quit = true,
            AppEvent::ToggleHelp => self.show_help = true,
            AppEvent::Click { column, row } => self.click(column, row),
            AppEvent::Escape | AppEvent::Resize(..) => {}
            nav => self.view.handle(&nav),
        }
    }

    pub fn details(&self) -> Option<&LinkClicked> {
        self.details.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    fn click(&mut self, column: u16, row: u16) {
        let Some(index) = self.view.hit_test(column, row) else { return };
        let control = &self.view.control;
        let link_text = match control.link_text_at(index) {
            Ok(Some(text)) => text,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(%err, "link lookup failed");
                return;
            }
        };
        let Some(sink) = self.registry.sink_by_control(control.id()) else {
            tracing::debug!(control = control.name(), "click on a control no sink owns");
            return;
        };
        match sink.handle_link_click(&link_text) {
            Ok(clicked) => self.details = clicked,
            Err(err) => tracing::warn!(sink = %sink.name(), %err, "link click rejected"),
        }
    }
}

/// Restore the terminal before the default panic message is printed.
fn install_panic_hook() {
    let original = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original(info);
    }));
}

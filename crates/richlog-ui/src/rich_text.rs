//! [`RichTextBox`] — the in-memory rich-text control.
//!
//! Holds one [`CharFormat`] per character plus a selection and an insertion
//! ("typing") format. An empty selection at the end of the text picks up the
//! control's base format; anywhere else it inherits the preceding character,
//! which is how native rich-edit controls behave.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use richlog_core::rules::{FontStyle, Rgb};

use crate::control::{next_control_id, CharFormat, ControlId, SurfaceError, TextSurface};
use crate::rtf;

const DEFAULT_VIEWPORT_LINES: usize = 20;

#[derive(Debug, Default)]
struct State {
    chars: Vec<char>,
    formats: Vec<CharFormat>,
    sel_start: usize,
    sel_len: usize,
    typing: CharFormat,
    /// First line shown in the viewport.
    top_line: usize,
}

impl State {
    fn len(&self) -> usize {
        self.chars.len()
    }

    fn range(&self) -> std::ops::Range<usize> {
        self.sel_start..self.sel_start + self.sel_len
    }

    fn line_of(&self, index: usize) -> usize {
        self.chars[..index.min(self.len())].iter().filter(|c| **c == '\n').count()
    }

    fn apply(&mut self, f: impl Fn(&mut CharFormat)) {
        if self.sel_len == 0 {
            f(&mut self.typing);
        } else {
            let range = self.range();
            self.formats[range].iter_mut().for_each(f);
        }
    }
}

/// A run of identically formatted visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub format: CharFormat,
    /// Character index of the run's first character.
    pub start: usize,
}

#[derive(Debug)]
pub struct RichTextBox {
    id: ControlId,
    name: String,
    base: CharFormat,
    disposed: AtomicBool,
    viewport_lines: AtomicUsize,
    state: Mutex<State>,
}

impl RichTextBox {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_base_format(name, CharFormat::default())
    }

    pub fn with_base_format(name: impl Into<String>, base: CharFormat) -> Self {
        Self {
            id: next_control_id(),
            name: name.into(),
            base,
            disposed: AtomicBool::new(false),
            viewport_lines: AtomicUsize::new(DEFAULT_VIEWPORT_LINES),
            state: Mutex::new(State { typing: base, ..State::default() }),
        }
    }

    /// Height used by [`TextSurface::scroll_to_caret`]; the view updates it
    /// on every draw.
    pub fn set_viewport_lines(&self, lines: usize) {
        self.viewport_lines.store(lines.max(1), Ordering::Relaxed);
    }

    pub fn top_line(&self) -> usize {
        self.lock().top_line
    }

    /// Scroll the viewport by `delta` lines, clamped to the content.
    pub fn scroll_by(&self, delta: isize) {
        let mut st = self.lock();
        let last = st.line_of(st.len());
        st.top_line = st.top_line.saturating_add_signed(delta).min(last);
    }

    pub fn scroll_to_end(&self) {
        let viewport = self.viewport_lines.load(Ordering::Relaxed);
        let mut st = self.lock();
        let lines = st.line_of(st.len()) + 1;
        st.top_line = lines.saturating_sub(viewport);
    }

    /// Format of the character at `index`.
    pub fn format_at(&self, index: usize) -> Option<CharFormat> {
        self.lock().formats.get(index).copied()
    }

    /// The text with hidden characters removed.
    pub fn visible_text(&self) -> String {
        let st = self.lock();
        st.chars.iter().zip(&st.formats).filter(|(_, f)| !f.hidden).map(|(c, _)| c).collect()
    }

    /// Visible content split into lines of formatting runs.
    pub fn styled_lines(&self) -> Vec<Vec<Run>> {
        let st = self.lock();
        let mut lines = vec![Vec::<Run>::new()];
        for (i, (ch, fmt)) in st.chars.iter().zip(&st.formats).enumerate() {
            if *ch == '\n' {
                lines.push(Vec::new());
                continue;
            }
            if fmt.hidden {
                continue;
            }
            let Some(line) = lines.last_mut() else { continue };
            match line.last_mut() {
                Some(run) if run.format == *fmt && run.start + run.text.chars().count() == i => {
                    run.text.push(*ch)
                }
                _ => line.push(Run { text: ch.to_string(), format: *fmt, start: i }),
            }
        }
        lines
    }

    /// Character index under visible column `column` of `line`.
    pub fn index_at(&self, line: usize, column: usize) -> Option<usize> {
        let st = self.lock();
        let mut current_line = 0;
        let mut col = 0;
        for (i, (ch, fmt)) in st.chars.iter().zip(&st.formats).enumerate() {
            if current_line > line {
                break;
            }
            if *ch == '\n' {
                current_line += 1;
                continue;
            }
            if current_line == line && !fmt.hidden {
                if col == column {
                    return Some(i);
                }
                col += 1;
            }
        }
        None
    }

    fn check(&self) -> Result<MutexGuard<'_, State>, SurfaceError> {
        if self.is_disposed() {
            return Err(SurfaceError::Disposed(self.name.clone()));
        }
        Ok(self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TextSurface for RichTextBox {
    fn id(&self) -> ControlId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            tracing::debug!(control = %self.name, "control disposed");
        }
    }

    fn text(&self) -> Result<String, SurfaceError> {
        Ok(self.check()?.chars.iter().collect())
    }

    fn text_len(&self) -> Result<usize, SurfaceError> {
        Ok(self.check()?.len())
    }

    fn select(&self, start: usize, len: usize) -> Result<(), SurfaceError> {
        let mut st = self.check()?;
        let start = start.min(st.len());
        let len = len.min(st.len() - start);
        st.sel_start = start;
        st.sel_len = len;
        st.typing = if start == st.len() || start == 0 {
            self.base
        } else {
            st.formats[start - 1]
        };
        st.typing.link = false;
        Ok(())
    }

    fn selection(&self) -> Result<(usize, usize), SurfaceError> {
        let st = self.check()?;
        Ok((st.sel_start, st.sel_len))
    }

    fn selection_style(&self) -> Result<FontStyle, SurfaceError> {
        let st = self.check()?;
        Ok(if st.sel_len == 0 { st.typing.style } else { st.formats[st.sel_start].style })
    }

    fn set_selection_style(&self, style: FontStyle) -> Result<(), SurfaceError> {
        self.check()?.apply(|f| f.style = style);
        Ok(())
    }

    fn set_selection_color(&self, fg: Option<Rgb>) -> Result<(), SurfaceError> {
        self.check()?.apply(|f| f.fg = fg);
        Ok(())
    }

    fn set_selection_back_color(&self, bg: Option<Rgb>) -> Result<(), SurfaceError> {
        self.check()?.apply(|f| f.bg = bg);
        Ok(())
    }

    fn set_selection_link(&self, link: bool) -> Result<(), SurfaceError> {
        let mut st = self.check()?;
        let range = st.range();
        st.formats[range].iter_mut().for_each(|f| f.link = link);
        Ok(())
    }

    fn append_text(&self, text: &str) -> Result<(), SurfaceError> {
        let mut st = self.check()?;
        let fmt = st.typing;
        for ch in text.chars() {
            st.chars.push(ch);
            st.formats.push(fmt);
        }
        Ok(())
    }

    fn selected_rtf(&self) -> Result<String, SurfaceError> {
        let st = self.check()?;
        let range = st.range();
        let cells: Vec<(char, CharFormat)> =
            st.chars[range.clone()].iter().copied().zip(st.formats[range].iter().copied()).collect();
        Ok(rtf::encode(&cells))
    }

    fn set_selected_rtf(&self, src: &str) -> Result<(), SurfaceError> {
        let mut st = self.check()?;
        let mut base = if st.sel_len > 0 { st.formats[st.sel_start] } else { st.typing };
        base.link = false;
        base.hidden = false;
        let cells = rtf::decode(src, base)?;
        let range = st.range();
        let inserted = cells.len();
        let (chars, formats): (Vec<char>, Vec<CharFormat>) = cells.into_iter().unzip();
        st.chars.splice(range.clone(), chars);
        st.formats.splice(range, formats);
        st.sel_start += inserted;
        st.sel_len = 0;
        let last = st.line_of(st.len());
        st.top_line = st.top_line.min(last);
        Ok(())
    }

    fn content_line_count(&self) -> Result<usize, SurfaceError> {
        let st = self.check()?;
        let mut count = 0;
        let mut line = 0;
        let mut has_content = false;
        for ch in &st.chars {
            if *ch == '\n' {
                if has_content {
                    count = line + 1;
                }
                line += 1;
                has_content = false;
            } else {
                has_content = true;
            }
        }
        if has_content {
            count = line + 1;
        }
        Ok(count)
    }

    fn first_char_index_of_line(&self, line: usize) -> Result<usize, SurfaceError> {
        let st = self.check()?;
        if line == 0 {
            return Ok(0);
        }
        Ok(st
            .chars
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == '\n')
            .nth(line - 1)
            .map_or(st.len(), |(i, _)| i + 1))
    }

    fn scroll_to_caret(&self) -> Result<(), SurfaceError> {
        let viewport = self.viewport_lines.load(Ordering::Relaxed);
        let mut st = self.check()?;
        let caret_line = st.line_of(st.sel_start);
        if caret_line < st.top_line {
            st.top_line = caret_line;
        } else if caret_line >= st.top_line + viewport {
            st.top_line = caret_line + 1 - viewport;
        }
        Ok(())
    }

    fn link_text_at(&self, index: usize) -> Result<Option<String>, SurfaceError> {
        let st = self.check()?;
        if !st.formats.get(index).is_some_and(|f| f.link) {
            return Ok(None);
        }
        // a hidden marker followed by visible text is where one link ends and the next begins
        let boundary = |at: usize| st.formats[at - 1].hidden && !st.formats[at].hidden;
        let mut start = index;
        while start > 0 && st.formats[start - 1].link && !boundary(start) {
            start -= 1;
        }
        let mut end = index + 1;
        while end < st.len() && st.formats[end].link && !boundary(end) {
            end += 1;
        }
        Ok(Some(st.chars[start..end].iter().collect()))
    }
}

//! The rich-text control contract the sink writes through.
//!
//! Indices are character (not byte) offsets into the control's full text,
//! hidden characters included. Lines are `\n`-terminated logical lines; the
//! control never soft-wraps for the purpose of these queries.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use richlog_core::rules::{FontStyle, Rgb};
use richlog_core::SinkError;

use crate::rtf::RtfError;

/// Process-unique control identity.
pub type ControlId = u64;

static NEXT_CONTROL_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_control_id() -> ControlId {
    NEXT_CONTROL_ID.fetch_add(1, Ordering::Relaxed)
}

/// Formatting of a single character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharFormat {
    /// `None` means the control's default foreground.
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
    pub style: FontStyle,
    pub hidden: bool,
    pub link: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("control `{0}` has been disposed")]
    Disposed(String),
    #[error(transparent)]
    Rtf(#[from] RtfError),
}

impl From<SurfaceError> for SinkError {
    fn from(err: SurfaceError) -> Self {
        SinkError::Display(err.to_string())
    }
}

/// A rich-text display control.
///
/// Every method fails with [`SurfaceError::Disposed`] once the control has
/// been disposed. Implementations are only ever driven from the UI thread,
/// but must be shareable with it.
pub trait TextSurface: Send + Sync + fmt::Debug {
    fn id(&self) -> ControlId;
    fn name(&self) -> &str;
    fn is_disposed(&self) -> bool;
    fn dispose(&self);

    fn text(&self) -> Result<String, SurfaceError>;
    /// Length of the full text in characters.
    fn text_len(&self) -> Result<usize, SurfaceError>;

    /// Select `len` characters from `start`. Out-of-range values are clamped.
    fn select(&self, start: usize, len: usize) -> Result<(), SurfaceError>;
    fn selection(&self) -> Result<(usize, usize), SurfaceError>;

    /// Style of the selection; for an empty selection, the insertion style.
    fn selection_style(&self) -> Result<FontStyle, SurfaceError>;
    fn set_selection_style(&self, style: FontStyle) -> Result<(), SurfaceError>;
    fn set_selection_color(&self, fg: Option<Rgb>) -> Result<(), SurfaceError>;
    fn set_selection_back_color(&self, bg: Option<Rgb>) -> Result<(), SurfaceError>;
    fn set_selection_link(&self, link: bool) -> Result<(), SurfaceError>;

    /// Append `text` using the current insertion format. The selection is
    /// left where it was.
    fn append_text(&self, text: &str) -> Result<(), SurfaceError>;

    fn selected_rtf(&self) -> Result<String, SurfaceError>;
    /// Replace the selection with a decoded RTF fragment. The selection then
    /// collapses to the end of the inserted text.
    fn set_selected_rtf(&self, rtf: &str) -> Result<(), SurfaceError>;

    /// Number of lines up to and including the last line holding content.
    fn content_line_count(&self) -> Result<usize, SurfaceError>;
    /// Character index where `line` starts; the text length past the end.
    fn first_char_index_of_line(&self, line: usize) -> Result<usize, SurfaceError>;
    fn scroll_to_caret(&self) -> Result<(), SurfaceError>;

    /// Full text (hidden part included) of the link covering `index`.
    fn link_text_at(&self, index: usize) -> Result<Option<String>, SurfaceError>;
}

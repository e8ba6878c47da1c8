//! richlog-ui — display side of the rich-text logging sink.
//!
//! ```text
//! producer thread                     UI thread
//! ───────────────                     ─────────
//! RichTextSink::write ──► UiDispatcher ──► UiLoop::pump ──► LinePainter ──► RichTextBox
//!        │                                                                      │
//!        └──► RetentionBuffer (no live control)              click ◄── RichTextView
//! ```
//!
//! [`RichTextSink`] is the entry point: built from a [`SinkConfig`], bound to
//! a control on a [`HostWindow`], fed either directly or through the
//! [`RichTextLayer`] `tracing` bridge. Every control mutation runs on
//! whichever thread drives the [`UiLoop`].
//!
//! [`SinkConfig`]: richlog_core::config::SinkConfig

pub mod adapter;
pub mod app;
pub mod control;
pub mod dispatch;
pub mod event;
pub mod registry;
pub mod rich_text;
pub mod rtf;
pub mod sink;
pub mod theme;
pub mod tracing_layer;
pub mod widgets;
pub mod window;

pub use control::{CharFormat, ControlId, TextSurface};
pub use dispatch::{UiDispatcher, UiLoop};
pub use registry::SinkRegistry;
pub use rich_text::RichTextBox;
pub use sink::{LinkClicked, RichTextSink};
pub use tracing_layer::RichTextLayer;
pub use window::{Desktop, HostWindow, UiHost, WindowSpec};

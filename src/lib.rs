//! richlog — rich-text logging sink.
//!
//! Renders log records into a rich-text display control: whole rows styled by
//! condition-based row rules, words highlighted by text/regex rules, oldest
//! lines evicted past a limit, records retained while no control is attached,
//! and clickable links that resolve back to the record that produced them.
//!
//! # Architecture
//!
//! ```text
//! tracing event ──► RichTextLayer ──► RichTextSink ──► UiDispatcher ──► RichTextBox
//!                                          │                                 │
//!                                          └──► RetentionBuffer    click ◄───┘
//! ```
//!
//! The UI-free decisions live in [`core`]; controls, dispatch and the sink
//! facade live in [`ui`]. [`demo`] drives the console binary.

pub mod demo;

pub use richlog_core as core;
pub use richlog_ui as ui;

pub use richlog_core::config::{Config, SinkConfig};
pub use richlog_core::{ErrorPolicy, LogLevel, LogRecord, SinkError};
pub use richlog_ui::{Desktop, HostWindow, LinkClicked, RichTextBox, RichTextLayer, RichTextSink, SinkRegistry};

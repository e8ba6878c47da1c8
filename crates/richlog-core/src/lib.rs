//! richlog-core — UI-free core of the rich-text logging sink.
//!
//! This crate holds everything the sink decides *before* a display surface is
//! touched: which row rule styles a record, which word spans get highlighted,
//! what is retained while no surface is attached, and which link ids resolve
//! back to which record.
//!
//! # Architecture
//!
//! ```text
//! LogRecord ──► Layout ──► Coloring ──► (display | Retention)
//!                  │                        │
//!                  └── LinkInfo ──► LinkRegistry ◄── click
//! ```
//!
//! The display side (controls, dispatcher, sink facade) lives in
//! `richlog-ui`.

pub mod coloring;
pub mod condition;
pub mod config;
pub mod error;
pub mod layout;
pub mod links;
pub mod retention;
pub mod rules;
pub mod types;

pub use error::{ErrorPolicy, SinkError};
pub use types::{LogLevel, LogRecord, Property};

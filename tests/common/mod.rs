//! Shared test utilities for richlog integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Nothing here touches a terminal: controls are in-memory
//! `RichTextBox`es and the UI thread is whoever calls `Stage::pump`.

pub mod assertions;
pub mod builders;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;

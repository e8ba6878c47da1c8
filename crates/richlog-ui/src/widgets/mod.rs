//! Ratatui widgets for the richlog console.

pub mod details;
pub mod help;
pub mod rich_text_view;

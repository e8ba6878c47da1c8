//! Configuration types for richlog.
//!
//! [`Config::load`] reads `~/.config/richlog/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist. [`Config::defaults`] returns
//! the same defaults without touching the filesystem (useful in tests).
//!
//! Each `[[sinks]]` entry is a [`SinkConfig`]. Rules and layouts stay as plain
//! strings here; [`SinkConfig::coloring`] and [`SinkConfig::layout`] validate
//! and compile them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::coloring::ColoringEngine;
use crate::layout::{Layout, DEFAULT_LAYOUT};
use crate::retention::RetentionPolicy;
use crate::rules::{parse_color, FontStyle, RowColoringRule, WordColoringRule};
use crate::{ErrorPolicy, SinkError};

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
throw_exceptions = false

[[sinks]]
name              = "console"
window_name       = "main"
control_name      = "log"
auto_scroll       = true
max_lines         = 1000
retention         = "only_missed"
use_default_rules = true
support_links     = true
layout            = "${time} ${level:uppercase=true} ${logger} ${message} ${link:property:name=link}"

[[sinks.word_rules]]
regex = "\\b\\d+ms\\b"
fg    = "Purple"
style = ["bold"]
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration, loaded from `~/.config/richlog/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Raise configuration and display errors instead of logging them.
    #[serde(default)]
    pub throw_exceptions: bool,
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// One `[[sinks]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    pub name: String,
    /// Host window to look for. `None` always creates an accessory window.
    #[serde(default)]
    pub window_name: Option<String>,
    /// Control to log into, looked up by name on the host window.
    #[serde(default)]
    pub control_name: Option<String>,
    /// Initial size of a created window (0 = host default).
    #[serde(default)]
    pub width: u16,
    #[serde(default)]
    pub height: u16,
    #[serde(default)]
    pub show_minimized: bool,
    #[serde(default = "default_true")]
    pub tool_window: bool,
    #[serde(default)]
    pub auto_scroll: bool,
    /// Maximum number of lines kept on the surface (0 = unlimited).
    #[serde(default)]
    pub max_lines: usize,
    #[serde(default)]
    pub retention: RetentionPolicy,
    #[serde(default)]
    pub use_default_rules: bool,
    /// Create an accessory window when the configured one is missing.
    #[serde(default = "default_true")]
    pub allow_auto_create: bool,
    #[serde(default)]
    pub support_links: bool,
    #[serde(default = "default_layout")]
    pub layout: String,
    #[serde(default)]
    pub row_rules: Vec<RowRuleConfig>,
    #[serde(default)]
    pub word_rules: Vec<WordRuleConfig>,
}

/// `[[sinks.row_rules]]`
#[derive(Debug, Clone, Deserialize)]
pub struct RowRuleConfig {
    pub condition: String,
    #[serde(default = "default_color")]
    pub fg: String,
    #[serde(default = "default_color")]
    pub bg: String,
    #[serde(default)]
    pub style: Vec<String>,
}

/// `[[sinks.word_rules]]` — exactly one of `text` and `regex`.
#[derive(Debug, Clone, Deserialize)]
pub struct WordRuleConfig {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub whole_words: bool,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default = "default_color")]
    pub fg: String,
    #[serde(default = "default_color")]
    pub bg: String,
    #[serde(default)]
    pub style: Vec<String>,
}

fn default_true() -> bool { true }
fn default_color() -> String { "Empty".to_string() }
fn default_layout() -> String { DEFAULT_LAYOUT.to_string() }

impl SinkConfig {
    /// A sink config with every field at its default.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            window_name: None,
            control_name: None,
            width: 0,
            height: 0,
            show_minimized: false,
            tool_window: true,
            auto_scroll: false,
            max_lines: 0,
            retention: RetentionPolicy::None,
            use_default_rules: false,
            allow_auto_create: true,
            support_links: false,
            layout: default_layout(),
            row_rules: Vec::new(),
            word_rules: Vec::new(),
        }
    }

    pub fn layout(&self) -> Result<Layout, SinkError> {
        Layout::parse(&self.layout)
    }

    /// Compile the configured rules. Any malformed condition, colour, style
    /// or pattern is a configuration error.
    pub fn coloring(&self) -> Result<ColoringEngine, SinkError> {
        let row_rules = self
            .row_rules
            .iter()
            .map(|r| {
                let style = FontStyle::from_names(&r.style)?;
                RowColoringRule::parse(&r.condition, &r.fg, &r.bg, style).map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let word_rules = self
            .word_rules
            .iter()
            .map(|w| {
                let rule = match (&w.text, &w.regex) {
                    (Some(text), None) => WordColoringRule::text(text.clone()),
                    (None, Some(pattern)) => WordColoringRule::pattern(pattern.clone()),
                    _ => {
                        return Err(SinkError::Config(format!(
                            "word rule in sink `{}` needs exactly one of `text` or `regex`",
                            self.name
                        )))
                    }
                };
                Ok(Arc::new(
                    rule.whole_words(w.whole_words)
                        .ignore_case(w.ignore_case)
                        .colors(parse_color(&w.fg)?, parse_color(&w.bg)?)
                        .style(FontStyle::from_names(&w.style)?),
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        ColoringEngine::new(row_rules, word_rules, self.use_default_rules)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/richlog/config.toml`. Creates the file with the
    /// built-in defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        Self::load_from(&path)
    }

    /// Load an explicit file.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(src: &str) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(src, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        Self::from_toml_str(DEFAULT_CONFIG).expect("built-in default config must be valid TOML")
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        ErrorPolicy { throw_exceptions: self.throw_exceptions }
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("richlog")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

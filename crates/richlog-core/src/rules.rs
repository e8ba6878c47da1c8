//! Row and word coloring rules.
//!
//! A [`RowColoringRule`] styles a whole record when its [`Condition`] holds;
//! a [`WordColoringRule`] styles every match of a literal or pattern inside
//! the rendered text. Both are immutable once built and shared as `Arc`s so a
//! retained message can keep a reference to the rule that matched it.
//!
//! # Colour names
//!
//! Colours are given by name (case-insensitive, `DarkGray` and `dark_gray`
//! are the same), as `#rrggbb`, or as `Empty` which leaves the control's own
//! colour in place.

use std::sync::{Arc, LazyLock, OnceLock};

use bitflags::bitflags;
use regex::{Regex, RegexBuilder};

use crate::condition::Condition;
use crate::{LogLevel, LogRecord, SinkError};

bitflags! {
    /// Font style bits. Rules combine these with the current style by XOR,
    /// see [`combine_style`](crate::coloring::combine_style).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontStyle: u8 {
        const BOLD = 0b0001;
        const ITALIC = 0b0010;
        const UNDERLINE = 0b0100;
        const STRIKEOUT = 0b1000;
    }
}

impl FontStyle {
    pub const REGULAR: FontStyle = FontStyle::empty();

    /// Parse a list such as `["bold", "italic"]`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, SinkError> {
        names.iter().try_fold(FontStyle::REGULAR, |acc, name| {
            let bit = match name.as_ref().trim().to_ascii_lowercase().as_str() {
                "bold" => FontStyle::BOLD,
                "italic" => FontStyle::ITALIC,
                "underline" | "underlined" => FontStyle::UNDERLINE,
                "strikeout" | "strikethrough" => FontStyle::STRIKEOUT,
                "regular" | "" => FontStyle::REGULAR,
                other => return Err(SinkError::Config(format!("unknown font style `{other}`"))),
            };
            Ok(acc | bit)
        })
    }
}

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Parse a colour name. `Ok(None)` means `Empty` (keep the control default).
pub fn parse_color(s: &str) -> Result<Option<Rgb>, SinkError> {
    let key: String = s
        .trim()
        .chars()
        .filter(|c| *c != '_' && *c != ' ')
        .collect::<String>()
        .to_ascii_lowercase();
    let rgb = match key.as_str() {
        "" | "empty" => return Ok(None),
        "black" => Rgb(0, 0, 0),
        "white" => Rgb(255, 255, 255),
        "red" => Rgb(255, 0, 0),
        "darkred" => Rgb(139, 0, 0),
        "maroon" => Rgb(128, 0, 0),
        "green" => Rgb(0, 128, 0),
        "darkgreen" => Rgb(0, 100, 0),
        "lime" => Rgb(0, 255, 0),
        "blue" => Rgb(0, 0, 255),
        "darkblue" => Rgb(0, 0, 139),
        "navy" => Rgb(0, 0, 128),
        "yellow" => Rgb(255, 255, 0),
        "gold" => Rgb(255, 215, 0),
        "orange" => Rgb(255, 165, 0),
        "darkorange" => Rgb(255, 140, 0),
        "cyan" | "aqua" => Rgb(0, 255, 255),
        "teal" => Rgb(0, 128, 128),
        "magenta" | "fuchsia" => Rgb(255, 0, 255),
        "purple" => Rgb(128, 0, 128),
        "pink" => Rgb(255, 192, 203),
        "brown" => Rgb(165, 42, 42),
        "olive" => Rgb(128, 128, 0),
        "gray" | "grey" => Rgb(128, 128, 128),
        "darkgray" | "darkgrey" => Rgb(169, 169, 169),
        "lightgray" | "lightgrey" => Rgb(211, 211, 211),
        "silver" => Rgb(192, 192, 192),
        s if s.starts_with('#') && s.len() == 7 && s.is_ascii() => {
            let channel = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&s[range], 16)
                    .map_err(|_| SinkError::Config(format!("invalid hex colour `{s}`")))
            };
            Rgb(channel(1..3)?, channel(3..5)?, channel(5..7)?)
        }
        _ => return Err(SinkError::Config(format!("unknown colour `{}`", s.trim()))),
    };
    Ok(Some(rgb))
}

// ---------------------------------------------------------------------------
// Row rules
// ---------------------------------------------------------------------------

/// Styles an entire record when `condition` holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowColoringRule {
    pub condition: Condition,
    /// Foreground colour, `None` keeps the control default.
    pub fg: Option<Rgb>,
    /// Background colour, `None` keeps the control default.
    pub bg: Option<Rgb>,
    pub style: FontStyle,
}

static DEFAULT_RULE: LazyLock<Arc<RowColoringRule>> = LazyLock::new(|| {
    Arc::new(RowColoringRule {
        condition: Condition::Const(true),
        fg: None,
        bg: None,
        style: FontStyle::REGULAR,
    })
});

static BUILTIN_RULES: LazyLock<Vec<Arc<RowColoringRule>>> = LazyLock::new(|| {
    let rule = |level, fg, bg, style| {
        Arc::new(RowColoringRule { condition: Condition::level_is(level), fg, bg, style })
    };
    vec![
        rule(LogLevel::Fatal, Some(Rgb(255, 255, 255)), Some(Rgb(255, 0, 0)), FontStyle::BOLD),
        rule(LogLevel::Error, Some(Rgb(255, 0, 0)), None, FontStyle::BOLD | FontStyle::ITALIC),
        rule(LogLevel::Warn, Some(Rgb(255, 165, 0)), None, FontStyle::UNDERLINE),
        rule(LogLevel::Info, Some(Rgb(0, 0, 0)), None, FontStyle::REGULAR),
        rule(LogLevel::Debug, Some(Rgb(128, 128, 128)), None, FontStyle::REGULAR),
        rule(LogLevel::Trace, Some(Rgb(169, 169, 169)), None, FontStyle::ITALIC),
    ]
});

impl RowColoringRule {
    pub fn new(condition: Condition, fg: Option<Rgb>, bg: Option<Rgb>, style: FontStyle) -> Self {
        Self { condition, fg, bg, style }
    }

    /// Parse the condition and colour names of a configured rule.
    pub fn parse(condition: &str, fg: &str, bg: &str, style: FontStyle) -> Result<Self, SinkError> {
        Ok(Self {
            condition: Condition::parse(condition)?,
            fg: parse_color(fg)?,
            bg: parse_color(bg)?,
            style,
        })
    }

    /// The neutral rule used when nothing else matches.
    pub fn default_rule() -> Arc<Self> {
        Arc::clone(&DEFAULT_RULE)
    }

    /// The six built-in per-level rules, Fatal first.
    pub fn builtin() -> &'static [Arc<Self>] {
        &BUILTIN_RULES
    }

    pub fn is_default(rule: &Arc<Self>) -> bool {
        Arc::ptr_eq(rule, &DEFAULT_RULE)
    }

    pub fn matches(&self, record: &LogRecord) -> bool {
        self.condition.evaluate(record)
    }
}

// ---------------------------------------------------------------------------
// Word rules
// ---------------------------------------------------------------------------

/// Styles every occurrence of a literal text or a pattern.
///
/// Exactly one of `text` and `regex` is set. The pattern is compiled on first
/// use and cached.
#[derive(Debug)]
pub struct WordColoringRule {
    pub text: Option<String>,
    pub regex: Option<String>,
    pub whole_words: bool,
    pub ignore_case: bool,
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
    pub style: FontStyle,
    compiled: OnceLock<Regex>,
}

impl WordColoringRule {
    /// Rule matching the literal `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self::blank(Some(text.into()), None)
    }

    /// Rule matching the regular expression `pattern`.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::blank(None, Some(pattern.into()))
    }

    fn blank(text: Option<String>, regex: Option<String>) -> Self {
        Self {
            text,
            regex,
            whole_words: false,
            ignore_case: false,
            fg: None,
            bg: None,
            style: FontStyle::REGULAR,
            compiled: OnceLock::new(),
        }
    }

    pub fn whole_words(mut self, on: bool) -> Self {
        self.whole_words = on;
        self
    }

    pub fn ignore_case(mut self, on: bool) -> Self {
        self.ignore_case = on;
        self
    }

    pub fn colors(mut self, fg: Option<Rgb>, bg: Option<Rgb>) -> Self {
        self.fg = fg;
        self.bg = bg;
        self
    }

    pub fn style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    /// Check that exactly one matcher is set and that it compiles.
    pub fn validate(&self) -> Result<(), SinkError> {
        self.compiled().map(|_| ())
    }

    /// The resolved pattern: literal text is escaped and, for whole-word
    /// rules, wrapped in word boundaries.
    pub fn compiled(&self) -> Result<&Regex, SinkError> {
        if let Some(re) = self.compiled.get() {
            return Ok(re);
        }
        let pattern = match (&self.text, &self.regex) {
            (None, Some(pattern)) if !pattern.is_empty() => pattern.clone(),
            (Some(text), None) if !text.is_empty() => {
                let escaped = regex::escape(text);
                if self.whole_words {
                    format!(r"\b{escaped}\b")
                } else {
                    escaped
                }
            }
            _ => {
                return Err(SinkError::Config(
                    "word rule needs exactly one of `text` or `regex`".to_string(),
                ))
            }
        };
        let re = RegexBuilder::new(&pattern).case_insensitive(self.ignore_case).build()?;
        Ok(self.compiled.get_or_init(|| re))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Red", Some(Rgb(255, 0, 0)))]
    #[case("dark_gray", Some(Rgb(169, 169, 169)))]
    #[case("DarkGray", Some(Rgb(169, 169, 169)))]
    #[case("#ff0080", Some(Rgb(255, 0, 128)))]
    #[case("Empty", None)]
    fn colours_parse(#[case] name: &str, #[case] expected: Option<Rgb>) {
        assert_eq!(parse_color(name).unwrap(), expected);
    }

    #[test]
    fn unknown_colour_is_a_config_error() {
        assert!(matches!(parse_color("chartreuse"), Err(SinkError::Config(_))));
        assert!(matches!(parse_color("#zz0000"), Err(SinkError::Config(_))));
        // seven bytes, but not seven hex digits
        assert!(matches!(parse_color("#aééa"), Err(SinkError::Config(_))));
    }

    #[test]
    fn builtin_rules_match_the_classic_defaults() {
        let rules = RowColoringRule::builtin();
        let conditions: Vec<String> = rules.iter().map(|r| r.condition.to_string()).collect();
        assert_eq!(
            conditions,
            [
                "level == LogLevel.Fatal",
                "level == LogLevel.Error",
                "level == LogLevel.Warn",
                "level == LogLevel.Info",
                "level == LogLevel.Debug",
                "level == LogLevel.Trace",
            ]
        );
        assert_eq!(rules[0].bg, Some(Rgb(255, 0, 0)));
        assert_eq!(rules[1].style, FontStyle::BOLD | FontStyle::ITALIC);
        assert_eq!(rules[2].fg, Some(Rgb(255, 165, 0)));
        assert_eq!(rules[5].style, FontStyle::ITALIC);
    }

    #[test]
    fn font_style_names() {
        assert_eq!(
            FontStyle::from_names(&["Bold", "underline"]).unwrap(),
            FontStyle::BOLD | FontStyle::UNDERLINE
        );
        assert!(FontStyle::from_names(&["blink"]).is_err());
    }

    #[test]
    fn literal_text_is_escaped() {
        let rule = WordColoringRule::text("a.b");
        let re = rule.compiled().unwrap();
        assert!(re.is_match("xa.by"));
        assert!(!re.is_match("axb"));
    }

    #[test]
    fn whole_words_and_ignore_case() {
        let rule = WordColoringRule::text("err").whole_words(true).ignore_case(true);
        let re = rule.compiled().unwrap();
        assert!(re.is_match("an ERR here"));
        assert!(!re.is_match("error"));
    }

    #[test]
    fn rule_without_matcher_is_rejected() {
        let rule = WordColoringRule::blank(None, None);
        assert!(matches!(rule.validate(), Err(SinkError::Config(_))));
        let both = WordColoringRule::blank(Some("a".into()), Some("b".into()));
        assert!(both.validate().is_err());
    }

    #[test]
    fn bad_pattern_is_a_pattern_error() {
        assert!(matches!(WordColoringRule::pattern("(").validate(), Err(SinkError::Pattern(_))));
    }
}

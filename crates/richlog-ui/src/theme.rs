//! Colour theme for the demo console.
//!
//! The theme only covers chrome (borders, popups, link highlight); the text
//! itself is drawn with the colours and styles the sink put on each
//! character. [`Theme::char_style`] converts one to the other.

use config::{Config, File, FileFormat};
use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

use richlog_core::rules::{FontStyle, Rgb};

use crate::control::CharFormat;

const DEFAULT_THEME_SRC: &str = r##"
# Pure black text is unreadable on dark terminals; draw it in the default
# foreground instead.
black_as_default = true

[borders]
focused   = { fg = "cyan", bold = true }
unfocused = { fg = "dark_gray" }

[link]
style = { fg = "light_blue", underlined = true }

[popup]
border = { fg = "yellow", bold = true }
key    = { bold = true }
label  = { fg = "dark_gray" }
"##;

// ---------------------------------------------------------------------------
// Raw (serde) types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawStyle {
    fg: Option<String>,
    bg: Option<String>,
    #[serde(default)]
    bold: bool,
    #[serde(default)]
    italic: bool,
    #[serde(default)]
    underlined: bool,
}

impl RawStyle {
    fn into_style(self) -> Style {
        let mut style = Style::default();
        if let Some(c) = self.fg.as_deref().and_then(parse_color) {
            style = style.fg(c);
        }
        if let Some(c) = self.bg.as_deref().and_then(parse_color) {
            style = style.bg(c);
        }
        if self.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.underlined {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        style
    }
}

#[derive(Debug, Deserialize)]
struct RawBorders {
    focused: RawStyle,
    unfocused: RawStyle,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    style: RawStyle,
}

#[derive(Debug, Deserialize)]
struct RawPopup {
    border: RawStyle,
    key: RawStyle,
    label: RawStyle,
}

#[derive(Debug, Deserialize)]
struct RawTheme {
    #[serde(default)]
    black_as_default: bool,
    borders: RawBorders,
    link: RawLink,
    popup: RawPopup,
}

// ---------------------------------------------------------------------------
// Public Theme type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Theme {
    pub border_focused: Style,
    pub border_unfocused: Style,
    /// Patched over link runs.
    pub link: Style,
    pub popup_border: Style,
    pub popup_key: Style,
    pub popup_label: Style,
    black_as_default: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self::load_default()
    }
}

impl Theme {
    pub fn load_default() -> Self {
        Self::from_toml_str(DEFAULT_THEME_SRC).expect("embedded default theme must be valid TOML")
    }

    pub fn from_toml_str(src: &str) -> anyhow::Result<Self> {
        let raw: RawTheme = Config::builder()
            .add_source(File::from_str(src, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        Ok(Self {
            border_focused: raw.borders.focused.into_style(),
            border_unfocused: raw.borders.unfocused.into_style(),
            link: raw.link.style.into_style(),
            popup_border: raw.popup.border.into_style(),
            popup_key: raw.popup.key.into_style(),
            popup_label: raw.popup.label.into_style(),
            black_as_default: raw.black_as_default,
        })
    }

    /// Terminal style for a character's format.
    pub fn char_style(&self, format: &CharFormat) -> Style {
        let mut style = Style::default();
        if let Some(fg) = format.fg.filter(|c| !(self.black_as_default && *c == Rgb(0, 0, 0))) {
            style = style.fg(rgb(fg));
        }
        if let Some(bg) = format.bg {
            style = style.bg(rgb(bg));
        }
        for (bit, modifier) in [
            (FontStyle::BOLD, Modifier::BOLD),
            (FontStyle::ITALIC, Modifier::ITALIC),
            (FontStyle::UNDERLINE, Modifier::UNDERLINED),
            (FontStyle::STRIKEOUT, Modifier::CROSSED_OUT),
        ] {
            if format.style.contains(bit) {
                style = style.add_modifier(modifier);
            }
        }
        if format.link {
            style = style.patch(self.link);
        }
        style
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rgb(Rgb(r, g, b): Rgb) -> Color {
    Color::Rgb(r, g, b)
}

/// Parse a terminal colour name or `#rrggbb`.
fn parse_color(s: &str) -> Option<Color> {
    match s.to_ascii_lowercase().as_str() {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" | "grey" => Some(Color::Gray),
        "dark_gray" | "darkgray" | "dark_grey" | "darkgrey" => Some(Color::DarkGray),
        "light_blue" => Some(Color::LightBlue),
        "white" => Some(Color::White),
        s if s.starts_with('#') && s.len() == 7 => {
            let r = u8::from_str_radix(&s[1..3], 16).ok()?;
            let g = u8::from_str_radix(&s[3..5], 16).ok()?;
            let b = u8::from_str_radix(&s[5..7], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        _ => None,
    }
}

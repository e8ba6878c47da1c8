//! Minimal RTF encoding for rich-text selections.
//!
//! Only the subset the sink needs round-trips: colour table, bold / italic /
//! underline / strikeout, hidden text (`\v`), paragraph breaks and escaped
//! characters. Everything else (`\pard`, font tables, sizes, …) is parsed and
//! ignored so fragments produced by richer editors still decode.

use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take};
use nom::character::complete::{alpha1, anychar, char, multispace0, one_of};
use nom::combinator::{cut, map, map_res, opt, value};
use nom::error::Error;
use nom::multi::many0;
use nom::sequence::{delimited, preceded, terminated};
use nom::{IResult, Parser};

use crate::control::CharFormat;
use richlog_core::rules::{FontStyle, Rgb};

/// An empty document; assigning it to a selection deletes the selection.
pub const EMPTY_RTF: &str = r"{\rtf1\ansi}";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RtfError {
    #[error("document must start with `{{\\rtf`")]
    NotRtf,
    #[error("unbalanced braces")]
    Unbalanced,
    #[error("bad escape at byte {0}")]
    BadEscape(usize),
}

/// Encode `(char, format)` cells as an RTF document.
pub fn encode(cells: &[(char, CharFormat)]) -> String {
    let mut colors: Vec<Rgb> = Vec::new();
    let color_index = |c: Option<Rgb>, colors: &mut Vec<Rgb>| -> usize {
        match c {
            None => 0,
            Some(rgb) => match colors.iter().position(|x| *x == rgb) {
                Some(i) => i + 1,
                None => {
                    colors.push(rgb);
                    colors.len()
                }
            },
        }
    };

    let mut body = String::new();
    let mut current = CharFormat::default();
    for (ch, fmt) in cells {
        let mut words = String::new();
        if fmt.fg != current.fg {
            words.push_str(&format!("\\cf{}", color_index(fmt.fg, &mut colors)));
        }
        if fmt.bg != current.bg {
            words.push_str(&format!("\\highlight{}", color_index(fmt.bg, &mut colors)));
        }
        toggle(&mut words, current.style, fmt.style, FontStyle::BOLD, "\\b", "\\b0");
        toggle(&mut words, current.style, fmt.style, FontStyle::ITALIC, "\\i", "\\i0");
        toggle(&mut words, current.style, fmt.style, FontStyle::UNDERLINE, "\\ul", "\\ulnone");
        toggle(&mut words, current.style, fmt.style, FontStyle::STRIKEOUT, "\\strike", "\\strike0");
        if fmt.hidden != current.hidden {
            words.push_str(if fmt.hidden { "\\v" } else { "\\v0" });
        }
        if !words.is_empty() {
            body.push_str(&words);
            body.push(' ');
        }
        current = *fmt;
        push_escaped(&mut body, *ch);
    }

    let mut out = String::from("{\\rtf1\\ansi");
    if !colors.is_empty() {
        out.push_str("{\\colortbl ;");
        for Rgb(r, g, b) in &colors {
            out.push_str(&format!("\\red{r}\\green{g}\\blue{b};"));
        }
        out.push('}');
    }
    if !body.is_empty() {
        out.push(' ');
        out.push_str(&body);
    }
    out.push('}');
    out
}

/// Escape plain text for embedding in a hand-built fragment.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        push_escaped(&mut out, ch);
    }
    out
}

fn toggle(out: &mut String, from: FontStyle, to: FontStyle, bit: FontStyle, on: &str, off: &str) {
    match (from.contains(bit), to.contains(bit)) {
        (false, true) => out.push_str(on),
        (true, false) => out.push_str(off),
        _ => {}
    }
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '\n' => out.push_str("\\par\n"),
        '\\' | '{' | '}' => {
            out.push('\\');
            out.push(ch);
        }
        c if c.is_ascii() => out.push(c),
        c => {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                // RTF \u takes a signed 16-bit value
                out.push_str(&format!("\\u{}?", *unit as i16));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Token<'a> {
    Open,
    Close,
    /// A complete `{\colortbl ;\redN\greenN\blueN;…}` group.
    ColorTable(Vec<Rgb>),
    Word(&'a str, Option<i32>),
    Symbol(char),
    Hex(u8),
    Text(&'a str),
    /// Raw line breaks carry no meaning in RTF.
    Newline,
}

/// Destinations whose content is never text.
const SKIPPED_DESTINATIONS: [&str; 3] = ["fonttbl", "stylesheet", "colortbl"];

fn color_channel<'a>(name: &'static str) -> impl Parser<&'a str, Output = u8, Error = Error<&'a str>> {
    preceded((char('\\'), tag(name)), nom::character::complete::u8)
}

fn color_table(input: &str) -> IResult<&str, Vec<Rgb>> {
    let entry = map(
        terminated((color_channel("red"), color_channel("green"), color_channel("blue")), char(';')),
        |(r, g, b): (u8, u8, u8)| Rgb(r, g, b),
    );
    // the leading empty entry is the "auto" colour, index 0
    delimited((char('{'), tag("\\colortbl"), multispace0, char(';')), many0(entry), char('}')).parse(input)
}

/// `\word`, `\word12`, `\word-3`; one trailing space is the delimiter.
fn control_word(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(char('\\'), (alpha1, opt(nom::character::complete::i32)), opt(char(' '))),
        |(name, param)| Token::Word(name, param),
    )
    .parse(input)
}

/// `\'hh`; a malformed byte is a hard failure rather than a control symbol.
fn hex_escape(input: &str) -> IResult<&str, Token<'_>> {
    preceded(tag("\\'"), cut(map_res(take(2usize), |hex: &str| u8::from_str_radix(hex, 16).map(Token::Hex))))
        .parse(input)
}

fn control_symbol(input: &str) -> IResult<&str, Token<'_>> {
    map(preceded(char('\\'), anychar), Token::Symbol).parse(input)
}

fn token(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        map(color_table, Token::ColorTable),
        value(Token::Open, char('{')),
        value(Token::Close, char('}')),
        hex_escape,
        control_word,
        control_symbol,
        value(Token::Newline, one_of("\r\n")),
        map(is_not("\\{}\r\n"), Token::Text),
    ))
    .parse(input)
}

fn tokenize(src: &str) -> Result<Vec<Token<'_>>, RtfError> {
    let mut tokens = Vec::new();
    let mut rest = src;
    while !rest.is_empty() {
        match token(rest) {
            Ok((next, tok)) => {
                tokens.push(tok);
                rest = next;
            }
            Err(_) => return Err(RtfError::BadEscape(src.len() - rest.len())),
        }
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode an RTF document into cells. Characters start from `base` and each
/// control word overrides the relevant attribute.
pub fn decode(src: &str, base: CharFormat) -> Result<Vec<(char, CharFormat)>, RtfError> {
    if !src.trim_start().starts_with("{\\rtf") {
        return Err(RtfError::NotRtf);
    }
    let mut out = Vec::new();
    let mut colors: Vec<Rgb> = Vec::new();
    // (format, skip-destination) per open group
    let mut stack: Vec<(CharFormat, bool)> = Vec::new();
    let mut fmt = base;
    let mut skip = false;
    let mut pending_high: Option<u16> = None;
    let mut fallback = false;

    for tok in tokenize(src)? {
        // \uN is followed by one fallback char (\uc1)
        let drop_fallback = std::mem::take(&mut fallback);
        match tok {
            Token::Open => stack.push((fmt, skip)),
            Token::Close => (fmt, skip) = stack.pop().ok_or(RtfError::Unbalanced)?,
            Token::ColorTable(table) => colors = table,
            Token::Word(name, _) if SKIPPED_DESTINATIONS.contains(&name) => skip = true,
            Token::Symbol('*') => skip = true,
            _ if skip => {}
            Token::Word(name, param) => match name {
                "par" | "line" => out.push(('\n', fmt)),
                "tab" => out.push(('\t', fmt)),
                "plain" => fmt = CharFormat::default(),
                "b" => set_bit(&mut fmt, FontStyle::BOLD, param != Some(0)),
                "i" => set_bit(&mut fmt, FontStyle::ITALIC, param != Some(0)),
                "ul" => set_bit(&mut fmt, FontStyle::UNDERLINE, param != Some(0)),
                "ulnone" => set_bit(&mut fmt, FontStyle::UNDERLINE, false),
                "strike" => set_bit(&mut fmt, FontStyle::STRIKEOUT, param != Some(0)),
                "v" => fmt.hidden = param != Some(0),
                "cf" => fmt.fg = lookup(&colors, param),
                "highlight" | "cb" => fmt.bg = lookup(&colors, param),
                "u" => {
                    fallback = true;
                    let unit = param.unwrap_or(0).rem_euclid(65536) as u16;
                    if (0xD800..0xDC00).contains(&unit) {
                        pending_high = Some(unit);
                    } else {
                        let units: Vec<u16> = match pending_high.take() {
                            Some(high) => vec![high, unit],
                            None => vec![unit],
                        };
                        for ch in char::decode_utf16(units) {
                            out.push((ch.unwrap_or(char::REPLACEMENT_CHARACTER), fmt));
                        }
                    }
                }
                _ => {}
            },
            Token::Symbol(c) => match c {
                '\\' | '{' | '}' => out.push((c, fmt)),
                '~' => out.push(('\u{a0}', fmt)),
                '\n' | '\r' => out.push(('\n', fmt)),
                _ => {}
            },
            Token::Hex(byte) => out.push((char::from(byte), fmt)),
            Token::Text(text) => out.extend(text.chars().skip(usize::from(drop_fallback)).map(|c| (c, fmt))),
            Token::Newline => {}
        }
    }

    if !stack.is_empty() {
        return Err(RtfError::Unbalanced);
    }
    Ok(out)
}

/// Text of every run of hidden characters, in document order.
pub fn hidden_runs(cells: &[(char, CharFormat)]) -> Vec<String> {
    cells
        .chunk_by(|a, b| a.1.hidden == b.1.hidden)
        .filter(|run| run.first().is_some_and(|(_, f)| f.hidden))
        .map(|run| run.iter().map(|(c, _)| c).collect())
        .collect()
}

fn set_bit(fmt: &mut CharFormat, bit: FontStyle, on: bool) {
    fmt.style.set(bit, on);
}

fn lookup(colors: &[Rgb], index: Option<i32>) -> Option<Rgb> {
    match index {
        Some(n) if n > 0 => colors.get(n as usize - 1).copied(),
        _ => None,
    }
}

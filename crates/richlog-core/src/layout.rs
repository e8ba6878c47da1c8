//! Layout templates — turn a [`LogRecord`] into the line the sink displays.
//!
//! A template mixes literal text with `${renderer[:option=value]}` tokens:
//!
//! | Token | Output |
//! |-------|--------|
//! | `${longdate}` | `2024-05-01 13:45:10.123` |
//! | `${time}` | `13:45:10.123` |
//! | `${level}` / `${level:uppercase=true}` | `Warn` / `WARN` |
//! | `${logger}` | logger name |
//! | `${message}` | message text |
//! | `${seq}` | sequence number |
//! | `${property:name=key}` | property value (strings unquoted) |
//! | `${link:<inner>}` | `<inner>` rendered as a clickable link |
//!
//! The link renderer does not emit its text directly: it stores the text in
//! the record's [`LinkInfo`](crate::links::LinkInfo) and emits a unique
//! placeholder, which the display replaces with the real link.

use crate::{LogRecord, SinkError};

/// The classic default layout.
pub const DEFAULT_LAYOUT: &str = "${longdate}|${level:uppercase=true}|${logger}|${message}";

/// Anything that can render a record into a single line.
pub trait Render: Send + Sync {
    fn render(&self, record: &LogRecord) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    LongDate,
    Time,
    Level { uppercase: bool },
    Logger,
    Message,
    Seq,
    Property(String),
    Link(Box<Segment>),
}

/// A parsed layout template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    source: String,
    segments: Vec<Segment>,
}

impl Layout {
    pub fn parse(template: &str) -> Result<Self, SinkError> {
        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find("${") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 2..];
            let close = after
                .find('}')
                .ok_or_else(|| SinkError::Layout(format!("unterminated `${{` in `{template}`")))?;
            segments.push(parse_token(&after[..close])?);
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Self { source: template.to_string(), segments })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether any `${link:…}` token appears in the template.
    pub fn has_links(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Link(_)))
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::parse(DEFAULT_LAYOUT).expect("default layout must parse")
    }
}

impl Render for Layout {
    fn render(&self, record: &LogRecord) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            render_segment(segment, record, &mut out);
        }
        out
    }
}

fn render_segment(segment: &Segment, record: &LogRecord, out: &mut String) {
    match segment {
        Segment::Literal(s) => out.push_str(s),
        Segment::LongDate => out.push_str(&record.ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
        Segment::Time => out.push_str(&record.ts.format("%H:%M:%S%.3f").to_string()),
        Segment::Level { uppercase: true } => out.push_str(&record.level.name().to_uppercase()),
        Segment::Level { uppercase: false } => out.push_str(record.level.name()),
        Segment::Logger => out.push_str(&record.logger),
        Segment::Message => out.push_str(&record.message),
        Segment::Seq => out.push_str(&record.seq.to_string()),
        Segment::Property(key) => match record.property(key) {
            Some(serde_json::Value::String(s)) => out.push_str(&s),
            Some(serde_json::Value::Null) | None => {}
            Some(other) => out.push_str(&other.to_string()),
        },
        Segment::Link(inner) => {
            let mut text = String::new();
            render_segment(inner, record, &mut text);
            if !text.is_empty() {
                out.push_str(&record.link_info_or_insert().add(text));
            }
        }
    }
}

fn parse_token(token: &str) -> Result<Segment, SinkError> {
    let (name, options) = token.split_once(':').unwrap_or((token, ""));
    let bad = |why: &str| SinkError::Layout(format!("{why} in `${{{token}}}`"));
    let segment = match name.trim() {
        "longdate" => Segment::LongDate,
        "time" => Segment::Time,
        "level" => {
            let uppercase = match option(options, "uppercase") {
                None => false,
                Some(v) => v.parse::<bool>().map_err(|_| bad("uppercase must be true or false"))?,
            };
            Segment::Level { uppercase }
        }
        "logger" => Segment::Logger,
        "message" => Segment::Message,
        "seq" => Segment::Seq,
        "property" => {
            let key = option(options, "name").ok_or_else(|| bad("missing `name=`"))?;
            Segment::Property(key.to_string())
        }
        "link" => {
            if options.trim().is_empty() {
                return Err(bad("link needs an inner renderer"));
            }
            let inner = parse_token(options)?;
            if matches!(inner, Segment::Link(_)) {
                return Err(bad("links cannot nest"));
            }
            Segment::Link(Box::new(inner))
        }
        other => return Err(bad(&format!("unknown renderer `{other}`"))),
    };
    Ok(segment)
}

fn option<'a>(options: &'a str, key: &str) -> Option<&'a str> {
    options
        .split(',')
        .filter_map(|kv| kv.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim())
}

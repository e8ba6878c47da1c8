//! Row-rule condition expressions.
//!
//! Conditions are parsed once, when a rule is built from configuration, so a
//! malformed expression surfaces as [`SinkError::Condition`] at setup time and
//! evaluation per record can never fail.
//!
//! # Grammar
//!
//! ```text
//! expr    := and ("or" and)*
//! and     := unary ("and" unary)*
//! unary   := "not" unary | primary
//! primary := "(" expr ")" | "true" | "false"
//!          | func "(" operand "," 'text' ")"
//!          | operand cmp operand
//! func    := contains | starts-with | ends-with
//! operand := level | logger | message | property['key'] | 'text' | <level name>
//! cmp     := == | != | < | <= | > | >=
//! ```
//!
//! Level names accept the `LogLevel.Warn` spelling, so rules written for the
//! classic condition syntax (`level == LogLevel.Warn`) parse unchanged.

use std::cmp::Ordering;
use std::fmt;

use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, tag_no_case, take_while};
use nom::character::complete::{char, multispace0, satisfy};
use nom::combinator::{all_consuming, map, map_opt, map_res, not, recognize, value};
use nom::error::Error;
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::{IResult, Parser};

use crate::{LogLevel, LogRecord, SinkError};

/// A parsed boolean condition over a [`LogRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Const(bool),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Compare { left: Operand, op: CmpOp, right: Operand },
    Call { func: StrFunc, subject: Operand, needle: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Level,
    Logger,
    Message,
    Property(String),
    LevelLiteral(LogLevel),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrFunc {
    Contains,
    StartsWith,
    EndsWith,
}

/// Resolved operand value.
enum Value {
    Level(LogLevel),
    Text(String),
}

impl Condition {
    /// Condition matching records of exactly `level`.
    pub fn level_is(level: LogLevel) -> Self {
        Condition::Compare {
            left: Operand::Level,
            op: CmpOp::Eq,
            right: Operand::LevelLiteral(level),
        }
    }

    pub fn parse(src: &str) -> Result<Self, SinkError> {
        match all_consuming(ws(or_expr)).parse(src) {
            Ok((_, cond)) => Ok(cond),
            Err(e) => Err(SinkError::Condition { expr: src.to_string(), reason: describe(src, e) }),
        }
    }

    pub fn evaluate(&self, record: &LogRecord) -> bool {
        match self {
            Condition::Const(b) => *b,
            Condition::Not(inner) => !inner.evaluate(record),
            Condition::And(a, b) => a.evaluate(record) && b.evaluate(record),
            Condition::Or(a, b) => a.evaluate(record) || b.evaluate(record),
            Condition::Compare { left, op, right } => {
                match compare(&left.resolve(record), &right.resolve(record)) {
                    Some(ord) => op.holds(ord),
                    None => *op == CmpOp::Ne,
                }
            }
            Condition::Call { func, subject, needle } => {
                let hay = match subject.resolve(record) {
                    Value::Level(l) => l.name().to_string(),
                    Value::Text(t) => t,
                };
                match func {
                    StrFunc::Contains => hay.contains(needle.as_str()),
                    StrFunc::StartsWith => hay.starts_with(needle.as_str()),
                    StrFunc::EndsWith => hay.ends_with(needle.as_str()),
                }
            }
        }
    }
}

impl Operand {
    fn resolve(&self, record: &LogRecord) -> Value {
        match self {
            Operand::Level => Value::Level(record.level),
            Operand::Logger => Value::Text(record.logger.clone()),
            Operand::Message => Value::Text(record.message.clone()),
            Operand::Property(key) => Value::Text(match record.property(key) {
                Some(serde_json::Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => String::new(),
            }),
            Operand::LevelLiteral(l) => Value::Level(*l),
            Operand::Text(t) => Value::Text(t.clone()),
        }
    }
}

impl CmpOp {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// Levels compare by severity, text lexically; a level compared with text
/// parses the text as a level name. Incomparable pairs yield `None`.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Level(x), Value::Level(y)) => Some(x.cmp(y)),
        (Value::Text(x), Value::Text(y)) => Some(x.as_str().cmp(y.as_str())),
        (Value::Level(x), Value::Text(t)) => t.parse::<LogLevel>().ok().map(|y| x.cmp(&y)),
        (Value::Text(t), Value::Level(y)) => t.parse::<LogLevel>().ok().map(|x| x.cmp(y)),
    }
}

// ---------------------------------------------------------------------------
// Display — renders back to parseable source
// ---------------------------------------------------------------------------

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Const(b) => write!(f, "{b}"),
            Condition::Not(inner) => write!(f, "not {inner}"),
            Condition::And(a, b) => write!(f, "({a} and {b})"),
            Condition::Or(a, b) => write!(f, "({a} or {b})"),
            Condition::Compare { left, op, right } => write!(f, "{left} {} {right}", op.symbol()),
            Condition::Call { func, subject, needle } => {
                let name = match func {
                    StrFunc::Contains => "contains",
                    StrFunc::StartsWith => "starts-with",
                    StrFunc::EndsWith => "ends-with",
                };
                write!(f, "{name}({subject}, {})", quote(needle))
            }
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Level => f.write_str("level"),
            Operand::Logger => f.write_str("logger"),
            Operand::Message => f.write_str("message"),
            Operand::Property(key) => write!(f, "property[{}]", quote(key)),
            Operand::LevelLiteral(l) => write!(f, "LogLevel.{}", l.name()),
            Operand::Text(t) => f.write_str(&quote(t)),
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// ---------------------------------------------------------------------------
// Parser — one nom function per grammar rule
// ---------------------------------------------------------------------------

type Res<'a, T> = IResult<&'a str, T>;

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn ws<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

/// Case-insensitive keyword that must not run into a longer identifier.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = Error<&'a str>> {
    ws(terminated(tag_no_case(word), not(satisfy(is_ident_char))))
}

fn identifier(input: &str) -> Res<'_, &str> {
    recognize(pair(satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'), take_while(is_ident_char)))
        .parse(input)
}

/// `'text'` with `''` standing for one quote.
fn quoted(input: &str) -> Res<'_, String> {
    delimited(
        char('\''),
        map(many0(alt((is_not("'"), value("'", tag("''"))))), |parts: Vec<&str>| parts.concat()),
        char('\''),
    )
    .parse(input)
}

fn cmp_op(input: &str) -> Res<'_, CmpOp> {
    ws(alt((
        value(CmpOp::Eq, tag("==")),
        value(CmpOp::Ne, tag("!=")),
        value(CmpOp::Le, tag("<=")),
        value(CmpOp::Ge, tag(">=")),
        value(CmpOp::Lt, tag("<")),
        value(CmpOp::Gt, tag(">")),
    )))
    .parse(input)
}

fn named_operand(id: &str) -> Result<Operand, String> {
    match id.to_ascii_lowercase().as_str() {
        "level" => Ok(Operand::Level),
        "logger" => Ok(Operand::Logger),
        "message" => Ok(Operand::Message),
        _ => id.parse::<LogLevel>().map(Operand::LevelLiteral).map_err(|_| format!("unknown identifier `{id}`")),
    }
}

fn operand(input: &str) -> Res<'_, Operand> {
    ws(alt((
        map(quoted, Operand::Text),
        map(
            preceded(keyword("property"), delimited(ws(char('[')), quoted, ws(char(']')))),
            Operand::Property,
        ),
        map_res(identifier, named_operand),
    )))
    .parse(input)
}

fn call(input: &str) -> Res<'_, Condition> {
    map(
        (map_opt(ws(identifier), str_func), char('('), operand, char(','), ws(quoted), char(')')),
        |(func, _, subject, _, needle, _)| Condition::Call { func, subject, needle },
    )
    .parse(input)
}

fn comparison(input: &str) -> Res<'_, Condition> {
    map((operand, cmp_op, operand), |(left, op, right)| Condition::Compare { left, op, right }).parse(input)
}

fn primary(input: &str) -> Res<'_, Condition> {
    alt((
        delimited(ws(char('(')), or_expr, ws(char(')'))),
        value(Condition::Const(true), keyword("true")),
        value(Condition::Const(false), keyword("false")),
        call,
        comparison,
    ))
    .parse(input)
}

fn unary(input: &str) -> Res<'_, Condition> {
    alt((map(preceded(keyword("not"), unary), |inner| Condition::Not(Box::new(inner))), primary)).parse(input)
}

fn and_expr(input: &str) -> Res<'_, Condition> {
    map((unary, many0(preceded(keyword("and"), unary))), |(first, rest)| {
        rest.into_iter().fold(first, |l, r| Condition::And(Box::new(l), Box::new(r)))
    })
    .parse(input)
}

fn or_expr(input: &str) -> Res<'_, Condition> {
    map((and_expr, many0(preceded(keyword("or"), and_expr))), |(first, rest)| {
        rest.into_iter().fold(first, |l, r| Condition::Or(Box::new(l), Box::new(r)))
    })
    .parse(input)
}

/// Human-readable reason for a rejected expression.
fn describe(src: &str, err: nom::Err<Error<&str>>) -> String {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) if e.input.is_empty() => "unexpected end of input".to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            format!("unexpected `{}` at offset {}", e.input, src.len() - e.input.len())
        }
        nom::Err::Incomplete(_) => "incomplete input".to_string(),
    }
}

fn str_func(name: &str) -> Option<StrFunc> {
    match name.to_ascii_lowercase().as_str() {
        "contains" => Some(StrFunc::Contains),
        "starts-with" | "startswith" => Some(StrFunc::StartsWith),
        "ends-with" | "endswith" => Some(StrFunc::EndsWith),
        _ => None,
    }
}

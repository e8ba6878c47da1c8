//! Coloring engine — row-rule selection and word-span scanning.

use std::sync::Arc;

use crate::rules::{FontStyle, RowColoringRule, WordColoringRule};
use crate::{LogRecord, SinkError};

/// Combine a rule's style bits with the current style.
///
/// This is a toggle, not an assignment: a bit already set in `current` is
/// cleared when the rule also carries it. Applying the same flags twice
/// returns the original style.
pub fn combine_style(current: FontStyle, rule: FontStyle) -> FontStyle {
    current ^ rule
}

/// First custom rule whose condition holds, then (if enabled) the first
/// matching built-in rule, otherwise the neutral default rule.
pub fn select_row_rule(
    record: &LogRecord,
    custom: &[Arc<RowColoringRule>],
    use_defaults: bool,
) -> Arc<RowColoringRule> {
    if let Some(rule) = custom.iter().find(|r| r.matches(record)) {
        return Arc::clone(rule);
    }
    if use_defaults {
        if let Some(rule) = RowColoringRule::builtin().iter().find(|r| r.matches(record)) {
            return Arc::clone(rule);
        }
    }
    RowColoringRule::default_rule()
}

/// One word-rule match, in byte offsets into the scanned text.
#[derive(Debug, Clone)]
pub struct WordSpan {
    pub start: usize,
    pub len: usize,
    pub rule: Arc<WordColoringRule>,
}

/// Every match of every rule at or after `search_start`, grouped by rule in
/// declaration order. Text before `search_start` is only used as context for
/// anchors such as `\b`; it is never matched.
pub fn find_word_spans(
    text: &str,
    rules: &[Arc<WordColoringRule>],
    search_start: usize,
) -> Result<Vec<WordSpan>, SinkError> {
    let mut spans = Vec::new();
    if search_start > text.len() {
        return Ok(spans);
    }
    for rule in rules {
        let re = rule.compiled()?;
        let mut pos = search_start;
        while pos <= text.len() {
            let Some(m) = re.find_at(text, pos) else { break };
            if m.end() > m.start() {
                spans.push(WordSpan { start: m.start(), len: m.len(), rule: Arc::clone(rule) });
                pos = m.end();
            } else {
                // empty match: step over one char to guarantee progress
                pos = text[m.end()..]
                    .chars()
                    .next()
                    .map_or(text.len() + 1, |c| m.end() + c.len_utf8());
            }
        }
    }
    Ok(spans)
}

/// Everything needed to style a record: custom row rules, the built-in
/// switch, and the word rules.
#[derive(Debug, Clone, Default)]
pub struct ColoringEngine {
    pub row_rules: Vec<Arc<RowColoringRule>>,
    pub word_rules: Vec<Arc<WordColoringRule>>,
    pub use_defaults: bool,
}

impl ColoringEngine {
    pub fn new(
        row_rules: Vec<Arc<RowColoringRule>>,
        word_rules: Vec<Arc<WordColoringRule>>,
        use_defaults: bool,
    ) -> Result<Self, SinkError> {
        for rule in &word_rules {
            rule.validate()?;
        }
        Ok(Self { row_rules, word_rules, use_defaults })
    }

    pub fn row_rule(&self, record: &LogRecord) -> Arc<RowColoringRule> {
        select_row_rule(record, &self.row_rules, self.use_defaults)
    }

    pub fn word_spans(&self, text: &str, search_start: usize) -> Result<Vec<WordSpan>, SinkError> {
        find_word_spans(text, &self.word_rules, search_start)
    }
}

//! Error taxonomy for the sink and the `ReportOrThrow` switch.

use thiserror::Error;

/// Every failure the sink can report.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Missing or contradictory configuration (missing names, retention
    /// without a line cap, …).
    #[error("configuration error: {0}")]
    Config(String),

    /// A row-rule condition that does not parse.
    #[error("invalid condition `{expr}`: {reason}")]
    Condition { expr: String, reason: String },

    /// A word rule whose pattern does not compile.
    #[error("invalid word pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A layout template that does not parse.
    #[error("invalid layout: {0}")]
    Layout(String),

    /// The UI dispatcher is gone; nothing can be marshalled to the UI thread.
    #[error("UI dispatcher is closed")]
    Dispatch,

    /// The display control failed mid-write (usually disposed concurrently).
    #[error("display error: {0}")]
    Display(String),

    /// A clicked link id has no registry entry (evicted or foreign).
    #[error("link #{0} is not registered")]
    UnknownLink(u64),

    /// Clicked text does not carry a link marker.
    #[error("clicked text `{0}` carries no link id")]
    MalformedLink(String),
}

/// Global throw-vs-log switch consulted whenever a non-fatal error is raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub throw_exceptions: bool,
}

impl ErrorPolicy {
    pub fn strict() -> Self {
        Self { throw_exceptions: true }
    }

    pub fn lenient() -> Self {
        Self { throw_exceptions: false }
    }

    /// Raise `err` in strict mode, otherwise log it and carry on.
    pub fn report_or_throw(&self, err: SinkError) -> Result<(), SinkError> {
        if self.throw_exceptions {
            return Err(err);
        }
        tracing::error!(error = %err, "richlog error");
        Ok(())
    }

    /// Same as [`report_or_throw`](Self::report_or_throw) but at warning
    /// level, used for transient display failures.
    pub fn warn_or_throw(&self, err: SinkError) -> Result<(), SinkError> {
        if self.throw_exceptions {
            return Err(err);
        }
        tracing::warn!(error = %err, "richlog warning");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_policy_swallows() {
        let policy = ErrorPolicy::lenient();
        assert!(policy.report_or_throw(SinkError::Config("x".into())).is_ok());
        assert!(policy.warn_or_throw(SinkError::Dispatch).is_ok());
    }

    #[test]
    fn strict_policy_raises() {
        let policy = ErrorPolicy::strict();
        let err = policy
            .report_or_throw(SinkError::Config("no control name".into()))
            .unwrap_err();
        assert_eq!(err.to_string(), "configuration error: no control name");
    }
}

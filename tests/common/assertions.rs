//! Domain-specific assertion macros for richlog harnesses.
//!
//! These wrap `pretty_assertions` so a failing comparison shows a line diff
//! of what the control actually displays.

/// Assert the visible lines of a control.
///
/// ```rust,ignore
/// assert_lines!(control, ["Accessory Form", "Normal Form"]);
/// ```
#[macro_export]
macro_rules! assert_lines {
    ($control:expr, [$($line:expr),* $(,)?]) => {{
        let actual = $crate::common::lines_of(&$control);
        let expected: Vec<String> = vec![$($line.to_string()),*];
        pretty_assertions::assert_eq!(actual, expected, "visible lines of control `{}`", richlog_ui::TextSurface::name(&*$control));
    }};
}

/// Assert that a control shows nothing.
#[macro_export]
macro_rules! assert_empty {
    ($control:expr) => {{
        let text = $control.visible_text();
        assert!(text.is_empty(), "expected control `{}` to be empty, it shows {:?}", richlog_ui::TextSurface::name(&*$control), text);
    }};
}

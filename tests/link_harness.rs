#![allow(unused)]
//! Clickable link integration harness.
//!
//! # What this covers
//!
//! - **Round-trip**: clicking a rendered link yields a `LinkClicked` whose
//!   record is the very `Arc` that was written and whose text is the text
//!   the layout rendered, both as the return value and on the broadcast.
//! - **Several links per line**: each gets its own id and resolves on its own.
//! - **Eviction cleans links**: once the line holding a link is evicted, its
//!   id is gone from the registry and a click on the stale text produces no
//!   notification (lenient) or `UnknownLink` (strict), never a panic.
//! - **Released controls**: links painted into a control that was replaced
//!   or detached stop resolving.
//! - **Malformed clicks**: text without a `#link<id>` marker is reported
//!   through the error policy.
//!
//! # What this does NOT cover
//!
//! - Mouse hit-testing in the terminal (unit tests in `richlog-ui`)
//!
//! # Running
//!
//! ```sh
//! cargo test --test link_harness
//! ```

mod common;
use common::*;

use std::sync::Arc;

use richlog_core::{ErrorPolicy, LogRecord, SinkError};
use richlog_ui::{RichTextBox, TextSurface};

const LINK_LAYOUT: &str = "${message} ${link:property:name=order}";

/// Full link text (hidden marker included) under the first char of `visible`.
fn link_under(control: &RichTextBox, visible: &str) -> String {
    let text = control.text().unwrap();
    let byte = text.find(visible).unwrap_or_else(|| panic!("{visible:?} not in {text:?}"));
    let index = text[..byte].chars().count();
    control.link_text_at(index).unwrap().expect("a link at that position")
}

fn order(message: &str, id: &str) -> Arc<LogRecord> {
    Arc::new(LogRecordBuilder::new(message).property("order", id).build())
}

// ---------------------------------------------------------------------------
// Round-trip
// ---------------------------------------------------------------------------

#[test]
fn click_resolves_to_the_written_record() {
    let mut stage = Stage::new();
    let (_window, control) = stage.open_main();
    let sink = stage.sink(&SinkConfigBuilder::new("links").links().layout(LINK_LAYOUT).build());
    let mut clicks = sink.subscribe_links();

    let written = order("order shipped", "ORD-7");
    sink.write(Arc::clone(&written)).unwrap();
    stage.pump();

    assert_lines!(control, ["order shipped ORD-7"]);
    assert_eq!(sink.links().len(), 1);

    let clicked_text = link_under(&control, "ORD-7");
    let owner = stage.registry.sink_by_control(control.id()).expect("sink owns the control");
    let clicked = owner.handle_link_click(&clicked_text).unwrap().expect("resolved");
    assert_eq!(clicked.link_text, "ORD-7");
    assert_eq!(clicked.sink, "links");
    assert!(Arc::ptr_eq(&clicked.record, &written));

    let broadcast = clicks.try_recv().expect("subscribers are notified");
    assert!(Arc::ptr_eq(&broadcast.record, &written));
}

#[test]
fn every_link_on_a_line_resolves_separately() {
    let mut stage = Stage::new();
    let (_window, control) = stage.open_main();
    let layout = "${link:logger} sent ${link:property:name=order}";
    let sink = stage.sink(&SinkConfigBuilder::new("links").links().layout(layout).build());

    let written = Arc::new(LogRecordBuilder::new("ignored").logger("billing").property("order", "ORD-9").build());
    sink.write(Arc::clone(&written)).unwrap();
    stage.pump();

    assert_lines!(control, ["billing sent ORD-9"]);
    let first = link_under(&control, "billing");
    let second = link_under(&control, "ORD-9");
    assert_ne!(first, second, "each link carries its own id");

    for (text, visible) in [(first, "billing"), (second, "ORD-9")] {
        let clicked = sink.handle_link_click(&text).unwrap().unwrap();
        assert_eq!(clicked.link_text, visible);
        assert!(Arc::ptr_eq(&clicked.record, &written));
    }
}

// ---------------------------------------------------------------------------
// Eviction
// ---------------------------------------------------------------------------

#[test]
fn evicted_links_no_longer_resolve() {
    let mut stage = Stage::new();
    let (_window, control) = stage.open_main();
    let cfg = SinkConfigBuilder::new("links").links().layout(LINK_LAYOUT).max_lines(2).build();
    let sink = stage.sink_with(&cfg, ErrorPolicy::lenient());
    let mut clicks = sink.subscribe_links();

    sink.write(order("first", "ORD-1")).unwrap();
    stage.pump();
    let stale = link_under(&control, "ORD-1");

    sink.write(order("second", "ORD-2")).unwrap();
    sink.write(order("third", "ORD-3")).unwrap();
    stage.pump();

    assert_lines!(control, ["second ORD-2", "third ORD-3"]);
    assert_eq!(sink.links().len(), 2, "only the evicted line's link is dropped");
    assert!(sink.handle_link_click(&stale).unwrap().is_none());
    assert!(clicks.try_recv().is_err(), "no notification for a stale link");
}

#[test]
fn links_of_a_released_control_no_longer_resolve() {
    let mut stage = Stage::new();
    let (window, control) = stage.open_main();
    let cfg = SinkConfigBuilder::new("links").links().layout(LINK_LAYOUT).build();
    let sink = stage.sink_with(&cfg, ErrorPolicy::lenient());

    sink.write(order("first", "ORD-1")).unwrap();
    stage.pump();
    let stale = link_under(&control, "ORD-1");

    control.dispose();
    let replacement = window.add_control(CONTROL);
    assert_eq!(stage.registry.reinitialize_surfaces(&window).unwrap(), 1);
    assert!(sink.links().is_empty(), "the replaced control's links are dropped");
    assert!(sink.handle_link_click(&stale).unwrap().is_none());

    sink.write(order("second", "ORD-2")).unwrap();
    stage.pump();
    let live = link_under(&replacement, "ORD-2");
    assert!(sink.handle_link_click(&live).unwrap().is_some());

    sink.detach();
    assert!(sink.links().is_empty());
    assert!(sink.handle_link_click(&live).unwrap().is_none());
}

#[test]
fn strict_mode_reports_unknown_links() {
    let mut stage = Stage::new();
    let (_window, control) = stage.open_main();
    let cfg = SinkConfigBuilder::new("links").links().layout(LINK_LAYOUT).max_lines(1).build();
    let sink = stage.sink(&cfg);

    sink.write(order("old", "ORD-1")).unwrap();
    stage.pump();
    let stale = link_under(&control, "ORD-1");
    sink.write(record("new")).unwrap();
    stage.pump();

    let err = sink.handle_link_click(&stale).unwrap_err();
    assert!(matches!(err, SinkError::UnknownLink(_)), "{err}");
}

// ---------------------------------------------------------------------------
// Malformed clicks
// ---------------------------------------------------------------------------

#[test]
fn malformed_click_text_is_reported() {
    let stage = Stage::new();
    let strict = stage.sink(&SinkConfigBuilder::new("strict").links().build());
    let lenient = stage.sink_with(&SinkConfigBuilder::new("lenient").links().build(), ErrorPolicy::lenient());

    assert!(matches!(strict.handle_link_click("no marker here"), Err(SinkError::MalformedLink(_))));
    assert!(lenient.handle_link_click("no marker here").unwrap().is_none());
    assert!(lenient.handle_link_click("ORD#linkNaN").unwrap().is_none());
}

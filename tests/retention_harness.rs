#![allow(unused)]
//! Retention and replay integration harness.
//!
//! # What this covers
//!
//! - **OnlyMissed**: a record written before any control exists is replayed
//!   ahead of later writes once a control is attached ("Accessory Form",
//!   then "Normal Form"), and the queue is empty afterwards.
//! - **Ordering under failure and races**: a failed paint is re-queued in
//!   write order, and writes racing an attach are painted exactly once.
//! - **None**: a record written before attach is lost ("A" never shows,
//!   "B" does).
//! - **All**: every record is kept; attaching a new control replays all of
//!   them, re-attaching the same control replays nothing.
//! - **Runtime policy switch**: `set_retention` to `None` discards the queue;
//!   a policy without a line cap is rejected (strict) or degraded (lenient).
//! - **Property: replay completeness**: for any number of missed writes and
//!   any cap, the replayed lines are exactly the newest `min(n, cap)` records
//!   in order. Verified with proptest.
//!
//! # What this does NOT cover
//!
//! - Eviction on the live control (see `sink_harness.rs`)
//!
//! # Running
//!
//! ```sh
//! cargo test --test retention_harness
//! ```

mod common;
use common::*;

use std::sync::Arc;

use proptest::prelude::*;
use richlog_core::retention::RetentionPolicy;
use richlog_core::{ErrorPolicy, SinkError};
use richlog_ui::adapter::SurfaceState;
use richlog_ui::TextSurface;

// ---------------------------------------------------------------------------
// OnlyMissed
// ---------------------------------------------------------------------------

#[test]
fn only_missed_replays_before_new_writes() {
    let mut stage = Stage::new();
    let sink = stage.sink(
        &SinkConfigBuilder::new("missed").retention(RetentionPolicy::OnlyMissed).max_lines(10).build(),
    );
    assert_eq!(sink.state(), SurfaceState::Unattached);

    sink.write(record("Accessory Form")).unwrap();
    assert_eq!(sink.retained(), 1);

    let (window, control) = stage.open_main();
    assert_eq!(stage.registry.reinitialize_surfaces(&window).unwrap(), 1);
    sink.write(record("Normal Form")).unwrap();
    stage.pump();

    assert_lines!(control, ["Accessory Form", "Normal Form"]);
    assert_eq!(sink.retained(), 0, "replay drains the queue");
}

/// A paint that fails on the UI thread goes back ahead of records that were
/// queued after it, so the next control shows them in write order.
#[test]
fn failed_paint_is_replayed_in_write_order() {
    let mut stage = Stage::new();
    let (window, control) = stage.open_main();
    let cfg = SinkConfigBuilder::new("missed").retention(RetentionPolicy::OnlyMissed).max_lines(10).build();
    let sink = stage.sink_with(&cfg, ErrorPolicy::lenient());

    sink.write(record("m1")).unwrap();
    control.dispose();
    sink.write(record("m2")).unwrap();
    stage.pump();
    assert_eq!(sink.retained(), 2);

    let replacement = window.add_control(CONTROL);
    stage.registry.reinitialize_surfaces(&window).unwrap();
    stage.pump();
    assert_lines!(replacement, ["m1", "m2"]);
}

/// Delivered writes are not queued under OnlyMissed.
#[test]
fn only_missed_ignores_delivered_writes() {
    let mut stage = Stage::new();
    let (_window, _control) = stage.open_main();
    let sink = stage.sink(
        &SinkConfigBuilder::new("missed").retention(RetentionPolicy::OnlyMissed).max_lines(10).build(),
    );
    sink.write(record("shown")).unwrap();
    stage.pump();
    assert_eq!(sink.retained(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn replay_is_complete_and_ordered(missed in 0usize..40, cap in 1usize..12) {
        let mut stage = Stage::new();
        let sink = stage.sink(
            &SinkConfigBuilder::new("missed").retention(RetentionPolicy::OnlyMissed).max_lines(cap).build(),
        );
        for i in 0..missed {
            sink.write(record(format!("m{i}"))).unwrap();
        }
        prop_assert_eq!(sink.retained(), missed.min(cap));

        let (window, control) = stage.open_main();
        stage.registry.reinitialize_surfaces(&window).unwrap();
        stage.pump();

        let expected: Vec<String> = (missed.saturating_sub(cap)..missed).map(|i| format!("m{i}")).collect();
        prop_assert_eq!(lines_of(&control), expected);
        prop_assert_eq!(sink.retained(), 0);
    }
}

// ---------------------------------------------------------------------------
// None
// ---------------------------------------------------------------------------

#[test]
fn none_drops_records_written_before_attach() {
    let mut stage = Stage::new();
    let sink = stage.sink(&SinkConfigBuilder::new("plain").build());

    sink.write(record("A")).unwrap();
    assert_eq!(sink.retained(), 0);

    let (window, control) = stage.open_main();
    stage.registry.reinitialize_surfaces(&window).unwrap();
    sink.write(record("B")).unwrap();
    stage.pump();

    assert_lines!(control, ["B"]);
}

// ---------------------------------------------------------------------------
// All
// ---------------------------------------------------------------------------

#[test]
fn all_replays_history_into_each_new_control() {
    let mut stage = Stage::new();
    let (window, first) = stage.open_main();
    let sink = stage.sink(&SinkConfigBuilder::new("all").retention(RetentionPolicy::All).max_lines(10).build());

    sink.write(record("one")).unwrap();
    sink.write(record("two")).unwrap();
    stage.pump();
    assert_lines!(first, ["one", "two"]);
    assert_eq!(sink.retained(), 2, "All keeps delivered records too");

    // a replacement control on the same window gets the full history
    let second = window.add_control(CONTROL);
    assert!(first.is_disposed());
    stage.registry.reinitialize_surfaces(&window).unwrap();
    stage.pump();
    assert_lines!(second, ["one", "two"]);
}

/// Attaching the control that is already bound replays nothing.
#[test]
fn all_replay_is_idempotent_for_the_same_control() {
    let mut stage = Stage::new();
    let (window, control) = stage.open_main();
    let sink = stage.sink(&SinkConfigBuilder::new("all").retention(RetentionPolicy::All).max_lines(10).build());

    sink.write(record("only once")).unwrap();
    stage.pump();

    for _ in 0..3 {
        sink.attach(Arc::clone(&window), Arc::clone(&control) as Arc<dyn richlog_ui::TextSurface>, false).unwrap();
        assert_eq!(stage.registry.reinitialize_surfaces(&window).unwrap(), 0);
        stage.pump();
    }
    assert_lines!(control, ["only once"]);
}

/// Records written from another thread while the control is being attached
/// show up exactly once and in write order.
#[test]
fn writes_racing_an_attach_appear_once_in_order() {
    let mut stage = Stage::new();
    let sink = stage.sink(&SinkConfigBuilder::new("all").retention(RetentionPolicy::All).max_lines(500).build());

    let writer = {
        let sink = sink.clone();
        std::thread::spawn(move || {
            for i in 0..200 {
                sink.write(record(format!("w{i}"))).unwrap();
            }
        })
    };
    let (window, control) = stage.open_main();
    stage.registry.reinitialize_surfaces(&window).unwrap();
    writer.join().unwrap();
    stage.pump();

    let expected: Vec<String> = (0..200).map(|i| format!("w{i}")).collect();
    pretty_assertions::assert_eq!(lines_of(&control), expected);
}

/// Detaching and re-attaching the same control does not duplicate either.
#[test]
fn all_replay_skips_reattach_of_the_same_control() {
    let mut stage = Stage::new();
    let (window, control) = stage.open_main();
    let sink = stage.sink(&SinkConfigBuilder::new("all").retention(RetentionPolicy::All).max_lines(10).build());

    sink.write(record("kept")).unwrap();
    stage.pump();
    sink.detach();
    assert_eq!(sink.state(), SurfaceState::Unattached);
    assert_eq!(stage.registry.reinitialize_surfaces(&window).unwrap(), 1);
    stage.pump();

    assert_lines!(control, ["kept"]);
}

// ---------------------------------------------------------------------------
// Runtime policy switch
// ---------------------------------------------------------------------------

#[test]
fn switching_to_none_discards_the_queue() {
    let stage = Stage::new();
    let sink = stage.sink(&SinkConfigBuilder::new("switch").retention(RetentionPolicy::All).max_lines(5).build());
    sink.write(record("queued")).unwrap();
    assert_eq!(sink.retained(), 1);

    sink.set_retention(RetentionPolicy::None).unwrap();
    assert_eq!(sink.retained(), 0);
    assert_eq!(sink.retention_policy(), RetentionPolicy::None);
}

#[test]
fn retention_without_a_cap_is_a_config_error() {
    let stage = Stage::new();
    let sink = stage.sink(&SinkConfigBuilder::new("uncapped").build());
    let err = sink.set_retention(RetentionPolicy::OnlyMissed).unwrap_err();
    assert!(matches!(err, SinkError::Config(_)), "{err}");
    assert_eq!(sink.retention_policy(), RetentionPolicy::None);

    let lenient = stage.sink_with(&SinkConfigBuilder::new("lenient").build(), ErrorPolicy::lenient());
    lenient.set_retention(RetentionPolicy::All).unwrap();
    assert_eq!(lenient.retention_policy(), RetentionPolicy::None, "degrades instead of failing");
}

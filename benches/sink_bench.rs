#![allow(unused)]
//! Sink write-path benchmarks.
//!
//! Measures what a producer pays per record and what the UI thread pays to
//! paint it, with and without styling rules and links.
//!
//! # Groups
//!
//! | Group | What it measures |
//! |-------|-----------------|
//! | `coloring` | Row rule selection and word span search on a single line |
//! | `layout` | Rendering a record through a plain and a link-bearing layout |
//! | `write` | `write` + pump for 1k/10k records on a 1000-line control |
//! | `batch` | `write_batch` of the same records as one UI dispatch |
//!
//! # Viewing results
//!
//! ```sh
//! cargo bench --bench sink_bench
//! open target/criterion/report/index.html
//! ```

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use richlog_core::coloring::ColoringEngine;
use richlog_core::config::SinkConfig;
use richlog_core::layout::{Layout, Render};
use richlog_core::rules::{FontStyle, Rgb, RowColoringRule, WordColoringRule};
use richlog_core::{ErrorPolicy, LogLevel, LogRecord};
use richlog_ui::dispatch::{self, UiLoop};
use richlog_ui::window::{Desktop, HostWindow};
use richlog_ui::{RichTextBox, RichTextSink};

const LEVELS: [LogLevel; 4] = [LogLevel::Info, LogLevel::Debug, LogLevel::Warn, LogLevel::Error];

fn records(n: usize) -> Vec<Arc<LogRecord>> {
    (0..n)
        .map(|i| {
            let record = LogRecord::new(
                LEVELS[i % LEVELS.len()],
                "bench::orders",
                format!("order {i} settled in {}ms after {} retries", i % 900, i % 4),
            )
            .with_property("order", format!("ORD-{i:05}"));
            Arc::new(record)
        })
        .collect()
}

fn engine() -> ColoringEngine {
    let rows = vec![Arc::new(
        RowColoringRule::parse("level >= Warn and contains(message, 'retries')", "Red", "Empty", FontStyle::BOLD)
            .expect("rule"),
    )];
    let words = vec![
        Arc::new(WordColoringRule::pattern(r"\d+ms").colors(Some(Rgb(128, 0, 128)), None)),
        Arc::new(WordColoringRule::text("order").whole_words(true).ignore_case(true).style(FontStyle::UNDERLINE)),
    ];
    ColoringEngine::new(rows, words, true).expect("engine")
}

/// A sink bound to a fresh control, and the loop that paints it.
fn bound_sink(layout: &str) -> (RichTextSink, Arc<RichTextBox>, UiLoop) {
    let desktop = Arc::new(Desktop::new());
    let window = desktop.show(HostWindow::new("main", "Main"));
    let control = window.add_control("log");
    let (dispatcher, ui) = dispatch::channel();
    let cfg = SinkConfig {
        window_name: Some("main".into()),
        control_name: Some("log".into()),
        allow_auto_create: false,
        use_default_rules: true,
        support_links: true,
        max_lines: 1000,
        layout: layout.into(),
        ..SinkConfig::named("bench")
    };
    let sink = RichTextSink::from_config(&cfg, ErrorPolicy::lenient(), dispatcher).expect("sink");
    sink.initialize(desktop).expect("initialize");
    (sink, control, ui)
}

// ---------------------------------------------------------------------------
// Coloring
// ---------------------------------------------------------------------------

fn coloring_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("coloring");
    let engine = engine();
    let record = LogRecord::new(LogLevel::Warn, "bench", "order 42 settled in 310ms after 3 retries");
    let line = record.message.clone();

    group.bench_function("row_rule", |b| b.iter(|| engine.row_rule(black_box(&record))));
    group.bench_function("word_spans", |b| b.iter(|| engine.word_spans(black_box(&line), 0)));
    group.finish();
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

fn layout_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let plain = Layout::parse("${longdate}|${level:uppercase=true}|${logger}|${message}").expect("layout");
    let linked = Layout::parse("${time} ${message} ${link:property:name=order}").expect("layout");

    group.bench_function("plain", |b| {
        b.iter_batched(|| records(1).remove(0), |r| plain.render(&r), BatchSize::SmallInput)
    });
    // link rendering mutates the record's link info, so each iteration gets a fresh one
    group.bench_function("with_link", |b| {
        b.iter_batched(|| records(1).remove(0), |r| linked.render(&r), BatchSize::SmallInput)
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

fn write_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");

    for count in [1_000usize, 10_000] {
        group.throughput(Throughput::Elements(count as u64));
        for (name, layout) in [("plain", "${level} ${message}"), ("linked", "${message} ${link:property:name=order}")] {
            group.bench_with_input(BenchmarkId::new(name, count), &count, |b, &n| {
                b.iter_batched(
                    || (bound_sink(layout), records(n)),
                    |((sink, control, mut ui), batch)| {
                        for record in batch {
                            sink.write(record).expect("write");
                        }
                        ui.pump();
                        control
                    },
                    BatchSize::LargeInput,
                )
            });
        }
    }
    group.finish();
}

fn batch_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");

    for count in [1_000usize, 10_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("write_batch", count), &count, |b, &n| {
            b.iter_batched(
                || (bound_sink("${level} ${message}"), records(n)),
                |((sink, control, mut ui), batch)| {
                    sink.write_batch(batch).expect("write_batch");
                    ui.pump();
                    control
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(sink_benches, coloring_bench, layout_bench, write_bench, batch_bench);
criterion_main!(sink_benches);

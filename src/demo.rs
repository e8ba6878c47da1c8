//! Demo traffic for the console: a producer thread that emits `tracing`
//! events shaped like a small order service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const CUSTOMERS: [&str; 5] = ["acme", "globex", "initech", "umbrella", "hooli"];

/// Emit the `i`-th demo event. Roughly one in ten is a warning, one in
/// forty an error and one in two hundred fatal-looking.
pub fn emit(i: u64) {
    let order = format!("ORD-{:05}", 10_000 + i * 7 % 90_000);
    let customer = CUSTOMERS[(i as usize) % CUSTOMERS.len()];
    let elapsed = 5 + (i * 37) % 900;

    match i % 200 {
        199 => tracing::error!(target: "demo::payments", link = %order, "payment gateway unreachable, giving up on {order}"),
        s if s % 40 == 39 => {
            tracing::error!(target: "demo::payments", link = %order, customer, "charge declined after {elapsed}ms")
        }
        s if s % 10 == 9 => {
            tracing::warn!(target: "demo::orders", link = %order, customer, "slow checkout for {customer}: {elapsed}ms")
        }
        s if s % 3 == 0 => tracing::debug!(target: "demo::cache", hits = i % 97, "cache lookup took {}ms", elapsed % 20),
        s if s % 7 == 0 => tracing::trace!(target: "demo::http", "GET /healthz 200"),
        _ => tracing::info!(target: "demo::orders", link = %order, customer, "order placed in {elapsed}ms"),
    }
}

/// Spawn a thread emitting one event every `rate`, `limit` events in total
/// (0 = until `stop` is set).
pub fn spawn_producer(rate: Duration, limit: u64, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut i = 0;
        while !stop.load(Ordering::Relaxed) && (limit == 0 || i < limit) {
            emit(i);
            i += 1;
            thread::sleep(rate);
        }
        tracing::debug!(target: "richlog", emitted = i, "demo producer finished");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use richlog_ui::dispatch;
    use richlog_ui::window::{Desktop, HostWindow};
    use richlog_ui::{RichTextLayer, RichTextSink, TextSurface};
    use richlog_core::config::SinkConfig;
    use richlog_core::ErrorPolicy;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn demo_events_carry_links() {
        let desktop = Arc::new(Desktop::new());
        let window = desktop.show(HostWindow::new("main", "Main"));
        let control = window.add_control("log");
        let (dispatcher, mut ui) = dispatch::channel();
        let cfg = SinkConfig {
            window_name: Some("main".into()),
            control_name: Some("log".into()),
            support_links: true,
            layout: "${logger} ${link:property:name=link}".into(),
            ..SinkConfig::named("demo")
        };
        let sink = RichTextSink::from_config(&cfg, ErrorPolicy::strict(), dispatcher).unwrap();
        sink.initialize(desktop).unwrap();

        let subscriber = tracing_subscriber::registry().with(RichTextLayer::new(vec![sink.clone()]));
        tracing::subscriber::with_default(subscriber, || emit(1));
        ui.pump();

        assert_eq!(control.text().unwrap().lines().count(), 1);
        assert!(control.text().unwrap().starts_with("demo::orders ORD-10007#link"));
        assert_eq!(sink.links().len(), 1);
    }
}

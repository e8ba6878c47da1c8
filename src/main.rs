use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use richlog::core::config::Config;
use richlog::ui::app::App;
use richlog::ui::dispatch;
use richlog::ui::theme::Theme;
use richlog::ui::window::{Desktop, HostWindow, UiHost};
use richlog::ui::{RichTextLayer, RichTextSink, SinkRegistry, TextSurface};

#[derive(Parser)]
#[command(name = "richlog", about = "Rich-text log console — styled, bounded, clickable log output")]
struct Cli {
    /// Config file to use instead of ~/.config/richlog/config.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write debug logs to /tmp/richlog-debug.log (tail -f to inspect).
    #[arg(long)]
    debug: bool,

    /// Milliseconds between demo events.
    #[arg(long, default_value_t = 150)]
    rate: u64,

    /// Number of demo events to emit (0 = until quit).
    #[arg(long, default_value_t = 0)]
    lines: u64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::load().unwrap_or_else(|_| Config::defaults()),
    };
    let errors = config.error_policy();

    // Windows the configured sinks look for; each gets the controls its sinks name.
    let desktop = Arc::new(Desktop::new());
    for sink in &config.sinks {
        let Some(window_name) = sink.window_name.as_deref() else { continue };
        let window = desktop
            .open_window(window_name)
            .unwrap_or_else(|| desktop.show(HostWindow::new(window_name, format!("richlog — {window_name}"))));
        if let Some(control) = sink.control_name.as_deref() {
            if window.find_control(control).is_none() {
                window.add_control(control);
            }
        }
    }

    let (dispatcher, ui) = dispatch::channel();
    let registry = Arc::new(SinkRegistry::new());
    for cfg in &config.sinks {
        let sink = RichTextSink::from_config(cfg, errors, dispatcher.clone())?;
        sink.initialize(Arc::clone(&desktop) as Arc<dyn UiHost>)?;
        registry.register(sink);
    }
    drop(dispatcher);

    let shown = registry
        .sinks()
        .into_iter()
        .find_map(|sink| {
            let binding = sink.binding()?;
            let control = binding.window.find_control(binding.control.name())?;
            Some((sink.name().to_string(), control))
        })
        .context("no sink is attached to a control")?;

    let debug_layer = if cli.debug {
        let file = std::fs::OpenOptions::new().create(true).append(true).open("/tmp/richlog-debug.log")?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
                ),
        )
    } else {
        None
    };
    tracing_subscriber::registry().with(debug_layer).with(RichTextLayer::new(registry.sinks())).init();
    tracing::info!(target: "richlog", sinks = registry.sinks().len(), "richlog console started");

    let stop = Arc::new(AtomicBool::new(false));
    let producer = richlog::demo::spawn_producer(Duration::from_millis(cli.rate), cli.lines, Arc::clone(&stop));

    let (title, control) = shown;
    let result = App::new(title, control, Arc::clone(&registry), ui, Theme::load_default()).run();

    stop.store(true, Ordering::Relaxed);
    let _ = producer.join();
    registry.close_all();
    result
}

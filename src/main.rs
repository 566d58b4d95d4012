pub mod config;
pub mod export;
pub mod ingest;
pub mod telemetry;

use std::sync::Arc;

use color_eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::MonitorConfig;
use crate::export::sink::CsvFileSink;
use crate::export::trigger::ExportTrigger;
use crate::ingest::listener::TelemetryListener;
use crate::ingest::notifier::RenderNotifier;
use crate::telemetry::history::History;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    info!("Starting smart band monitor");
    let config = MonitorConfig::load_or_create().await?;

    // Single shared history, constructed once and handed to every component
    // that needs it.
    let history = Arc::new(History::new());
    let notifier = RenderNotifier::new();

    let (listener_handle, status_rx) =
        TelemetryListener::spawn(&config, Arc::clone(&history), notifier.clone());

    let exporter = ExportTrigger::new(
        Arc::clone(&history),
        Box::new(CsvFileSink),
        config.export_destination.clone(),
    );

    // Presentation task: the only consumer of the render signal. It always
    // re-reads the latest snapshot, so coalesced signals lose nothing.
    let render_history = Arc::clone(&history);
    let render_notifier = notifier.clone();
    let presentation = tokio::spawn(async move {
        loop {
            render_notifier.notified().await;
            if let Some(latest) = render_history.snapshot_series().last() {
                info!("{}", latest);
            }
        }
    });

    info!("Commands: save (export table), status, quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match line.trim() {
                "" | "save" => match exporter.trigger_export() {
                    Ok(report) => info!(
                        "Saved {} readings to {}",
                        report.rows_written,
                        report.destination.display()
                    ),
                    Err(e) => error!("Export failed: {}", e),
                },
                "status" => {
                    let status = status_rx.borrow().clone();
                    info!(
                        state = ?status.connection_state,
                        received = status.messages_received,
                        parse_failures = status.parse_failures,
                        last_activity = ?status.last_activity,
                        "Listener status"
                    );
                }
                "quit" | "exit" => break,
                other => warn!("Unknown command: {:?}", other),
            },
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read command input: {}", e);
                break;
            }
        }
    }

    info!("Shutting down");
    listener_handle.stop();
    listener_handle.stopped().await;
    presentation.abort();
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

//! Subscriber setup: console on stderr, plus a rolling file in watch mode.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::args::LogFormat;

const WORKSPACE_CRATES: &[&str] = &["worker", "cli", "tasks", "todoist", "agent", "lifecycle"];
const KEPT_LOG_FILES: usize = 3;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Filter directives: `level` for our crates, `warn` for dependencies.
fn directives(level: &str) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(WORKSPACE_CRATES.iter().map(|c| format!("{c}={level}")));
    directives.join(",")
}

/// Installs the global subscriber. `RUST_LOG` overrides the console level.
///
/// The returned guard flushes the file writer and must live until exit.
pub fn init(verbose: bool, format: LogFormat, file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(if verbose { "debug" } else { "info" })));
    let console: BoxedLayer = match format {
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed(),
    };
    let mut layers = vec![console];

    let mut guard = None;
    if let Some(path) = file {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("log file path has no file name")?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create log directory {}", dir.display()))?;
        let appender = rolling::Builder::new()
            .rotation(Rotation::DAILY)
            .filename_prefix(name)
            .max_log_files(KEPT_LOG_FILES)
            .build(dir)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(directives("debug")))
                .boxed(),
        );
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("a global subscriber is already installed")?;
    Ok(guard)
}

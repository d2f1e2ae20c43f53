/*!
 * Logging and tracing initialization
 */

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::error::{Error, Result};

/// Where and how verbosely to log
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Lower the default level to DEBUG
    pub debug: bool,
    /// Append JSON lines to this file instead of compact stdout output
    pub log_file: Option<PathBuf>,
}

impl LogOptions {
    pub fn level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

/// Default filter when `RUST_LOG` is unset
pub fn default_directive(level: Level) -> String {
    format!("{},sqlx=warn,hyper=info", level)
}

/// Install the global subscriber
///
/// Stdout gets one compact line per event. With a log file, events are
/// appended as JSON and request spans are recorded when they close, which
/// puts handler latency in the file.
pub fn init_logging(options: &LogOptions) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(options.level())))
        .map_err(|e| Error::Logging(format!("Invalid log filter: {}", e)))?;

    let file = options.log_file.as_deref().map(open_log_file).transpose()?;

    let json_layer = file.map(|file| {
        fmt::layer()
            .json()
            .with_writer(file)
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
    });
    let compact_layer = json_layer
        .is_none()
        .then(|| fmt::layer().compact().with_target(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(compact_layer)
        .try_init()
        .map_err(|e| Error::Logging(format!("Logger already installed: {}", e)))
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::Logging(format!("Cannot open {}: {}", path.display(), e)))
}

//! Logging setup. Events go to an append-mode file under the XDG state
//! dir when one can be opened, otherwise to stderr. `RUST_LOG` overrides
//! the default filter either way.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "ninjax.log";
const DEFAULT_FILTER: &str = "info,ninjax=debug,ninjax_core=debug";

/// Destination picked once at startup.
pub enum LogSink {
    File { file: fs::File, path: PathBuf },
    Stderr,
}

impl LogSink {
    /// Open the log file under `dir`, creating the directory if needed.
    /// Any failure along the way degrades to stderr; a server that cannot
    /// log to disk must still start.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(LOG_FILE);
        let opened = fs::create_dir_all(dir).and_then(|()| {
            fs::OpenOptions::new().create(true).append(true).open(&path)
        });
        match opened {
            Ok(file) => LogSink::File { file, path },
            Err(_) => LogSink::Stderr,
        }
    }

    /// Where events end up, for the startup log line.
    pub fn target(&self) -> String {
        match self {
            LogSink::File { path, .. } => path.display().to_string(),
            LogSink::Stderr => "stderr".to_string(),
        }
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = Box<dyn Write + Send>;

    fn make_writer(&'a self) -> Self::Writer {
        match self {
            // Clone per writer so concurrent layers get independent handles.
            // A failed clone degrades that one writer to stderr.
            LogSink::File { file, .. } => match file.try_clone() {
                Ok(f) => Box::new(f),
                Err(_) => Box::new(io::stderr()),
            },
            LogSink::Stderr => Box::new(io::stderr()),
        }
    }
}

/// Install the global subscriber. Infallible: when the XDG state dir is
/// unavailable or unwritable the sink is stderr.
pub fn init() {
    let sink = match xdg::BaseDirectories::with_prefix("ninjax") {
        Ok(dirs) => LogSink::open(&dirs.get_state_home()),
        Err(_) => LogSink::Stderr,
    };
    let target = sink.target();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(sink)
        .with_ansi(false)
        .init();

    tracing::info!("logging to {target}");
}

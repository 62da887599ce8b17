use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_PREFIX: &str = "postfeed.log";

/// Keeps the background log writer alive; drop it last.
pub struct LogHandle {
    pub dir: Option<PathBuf>,
    _guard: Option<WorkerGuard>,
}

fn default_directives(verbose: bool, to_file: bool) -> &'static str {
    match (verbose, to_file) {
        (true, _) => "postfeed=debug,warn",
        (false, true) => "postfeed=info,warn",
        // stderr shares the terminal with the feed output
        (false, false) => "warn",
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default levels.
///
/// With a log directory, output goes to a daily-rotated file in it;
/// otherwise to stderr.
pub fn init(log_dir: Option<&Path>, verbose: bool) -> Result<LogHandle> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose, log_dir.is_some())));

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("Failed to install log subscriber")?;
        return Ok(LogHandle {
            dir: None,
            _guard: None,
        });
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(LogHandle {
        dir: Some(dir.to_path_buf()),
        _guard: Some(guard),
    })
}

impl LogHandle {
    pub fn describe(&self) -> String {
        match &self.dir {
            Some(dir) => format!("{}/{}.<date>", dir.display(), LOG_FILE_PREFIX),
            None => "stderr".to_string(),
        }
    }
}

//! Logging setup
//!
//! The library only emits through the `log` facade. The binary installs the
//! single process-wide sink here, writing `<timestamp> | <LEVEL> | <message>`
//! lines to stderr or appending them to `<logs_dir>/app.log`.

use env_logger::{Builder, Env, Target};
use once_cell::sync::OnceCell;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const LOG_FILE_NAME: &str = "app.log";

/// Where log lines end up once the sink is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    File(PathBuf),
    /// A logger this module did not install owns the `log` facade.
    External,
}

static INSTALLED: OnceCell<LogSink> = OnceCell::new();

/// Install the sink and return where lines go.
///
/// Only the first call installs anything. Later calls leave `log_dir`
/// untouched and return the sink that is actually in place.
pub fn init(log_dir: Option<&Path>) -> io::Result<LogSink> {
    if let Some(installed) = INSTALLED.get() {
        log::debug!("Logger already initialized, keeping {installed:?}");
        return Ok(installed.clone());
    }

    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} | {} | {}",
            buf.timestamp(),
            record.level(),
            record.args()
        )
    });

    let sink = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = dir.join(LOG_FILE_NAME);
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            builder.target(Target::Pipe(Box::new(file)));
            LogSink::File(path)
        }
        None => {
            builder.target(Target::Stderr);
            LogSink::Stderr
        }
    };

    if builder.try_init().is_err() {
        let existing = INSTALLED.get().cloned().unwrap_or(LogSink::External);
        log::debug!("Logger already initialized, keeping {existing:?}");
        return Ok(existing);
    }
    let sink = INSTALLED.get_or_init(|| sink).clone();
    match &sink {
        LogSink::File(path) => log::info!("Logger initialized | path={}", path.display()),
        LogSink::Stderr => log::info!("Logger initialized | stderr"),
        LogSink::External => {}
    }
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reinit_returns_installed_sink() {
        let first_dir = tempfile::tempdir().unwrap();
        let second_dir = tempfile::tempdir().unwrap();
        let second_logs = second_dir.path().join("logs");

        let first = init(Some(first_dir.path())).unwrap();
        assert_eq!(first, LogSink::File(first_dir.path().join(LOG_FILE_NAME)));
        log::info!("written to the first sink");

        let second = init(Some(&second_logs)).unwrap();
        assert_eq!(second, first);
        assert!(!second_logs.exists());
        assert_eq!(init(None).unwrap(), first);
    }
}

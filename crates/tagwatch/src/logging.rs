//! Tracing subscriber setup

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tagwatch_config::{LogConfig, LogFormat, LogLevel, LogTarget};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the global tracing subscriber
///
/// `stdout_reserved` is set by commands whose own output goes to stdout.
pub fn init_logging(level: LogLevel, log: &LogConfig, stdout_reserved: bool) -> Result<()> {
    let filter = EnvFilter::try_new(level.as_str()).context("invalid log filter")?;

    let target = log.target(stdout_reserved);
    let ansi = target.ansi();
    let writer = match &target {
        LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogTarget::AppendFile(path) => BoxMakeWriter::new(Mutex::new(open_log_file(path)?)),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_ansi(ansi).with_writer(writer))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .init(),
    }

    Ok(())
}

/// Open a log file for appending, creating missing parent directories
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_log_file_keeps_previous_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagwatch.log");
        fs::write(&path, "first run\n").unwrap();

        let mut file = open_log_file(&path).unwrap();
        writeln!(file, "second run").unwrap();
        drop(file);

        assert_eq!(fs::read_to_string(&path).unwrap(), "first run\nsecond run\n");
    }

    #[test]
    fn test_log_file_parent_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("nested").join("tagwatch.log");

        open_log_file(&path).unwrap();
        assert!(path.is_file());
    }
}

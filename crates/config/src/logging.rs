//! `[log]` section
//!
//! Tagwatch's own diagnostics. `simulate` and `send` may print beacons and
//! replies on stdout; [`LogConfig::target`] moves logs off stdout for them so
//! that output stays machine-readable.
//!
//! ```toml
//! [log]
//! level = "info"              # off|error|warn|info|debug|trace
//! format = "console"          # console|json
//! output = "stdout"           # stdout|stderr|<file path, appended to>
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// Verbosity, least to most
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive, for `--log-level`
impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(ConfigError::invalid_value(
                "log",
                "level",
                format!("unknown level {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    /// One JSON object per event
    Json,
}

/// Configured destination
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Any other string is a file path; logs are appended
    #[serde(untagged)]
    File(PathBuf),
}

/// Destination once the running command's use of stdout is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    Stderr,
    /// Opened in append mode, parent directories created
    AppendFile(PathBuf),
}

impl LogTarget {
    /// Colour codes are only written to terminal streams
    pub fn ansi(&self) -> bool {
        !matches!(self, Self::AppendFile(_))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl LogConfig {
    /// `--log-level` wins over the file
    pub fn effective_level(&self, cli: Option<LogLevel>) -> LogLevel {
        cli.unwrap_or(self.level)
    }

    /// Resolve the destination
    ///
    /// With `stdout_reserved`, stdout-bound logs go to stderr instead. Files
    /// and an explicit stderr are unaffected.
    pub fn target(&self, stdout_reserved: bool) -> LogTarget {
        match &self.output {
            LogOutput::Stdout if stdout_reserved => LogTarget::Stderr,
            LogOutput::Stdout => LogTarget::Stdout,
            LogOutput::Stderr => LogTarget::Stderr,
            LogOutput::File(path) => LogTarget::AppendFile(path.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> LogConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_defaults_log_info_to_stdout() {
        let log = LogConfig::default();
        assert_eq!(log.level, LogLevel::Info);
        assert_eq!(log.format, LogFormat::Console);
        assert_eq!(log.target(false), LogTarget::Stdout);
    }

    #[test]
    fn test_reserved_stdout_moves_logs_to_stderr() {
        let log = LogConfig::default();
        assert_eq!(log.target(true), LogTarget::Stderr);
        assert!(log.target(true).ansi());
    }

    #[test]
    fn test_file_output_is_appended_regardless_of_stdout() {
        let log = config("output = \"logs/tagwatch.log\"");
        let expected = LogTarget::AppendFile(PathBuf::from("logs/tagwatch.log"));
        assert_eq!(log.target(false), expected);
        assert_eq!(log.target(true), expected);
        assert!(!expected.ansi());
    }

    #[test]
    fn test_explicit_stderr_kept() {
        let log = config("output = \"stderr\"\nformat = \"json\"");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.target(false), LogTarget::Stderr);
    }

    #[test]
    fn test_cli_level_overrides_file() {
        let log = config("level = \"warn\"");
        assert_eq!(log.effective_level(None), LogLevel::Warn);
        assert_eq!(log.effective_level(Some(LogLevel::Trace)), LogLevel::Trace);
    }

    #[test]
    fn test_level_from_cli_string() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("off".parse::<LogLevel>().unwrap().as_str(), "off");
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!(toml::from_str::<LogConfig>("level = \"verbose\"").is_err());
    }

    #[test]
    fn test_levels_ordered_by_verbosity() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }
}

//! Log line model and its text form.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};

/// Message of the first line of every stream.
pub const STARTUP_MESSAGE: &str = "Log streaming started";

/// Severity of a synthetic log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Debug,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Debug,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ParseLineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseLineError::Level(s.to_string()))
    }
}

/// Error returned when text does not look like a rendered `LogLine`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseLineError {
    #[error("line does not match `<timestamp> [<LEVEL>] - <message>`")]
    Shape,
    #[error("invalid timestamp: {0}")]
    Timestamp(String),
    #[error("unknown level: {0}")]
    Level(String),
}

/// One immutable log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    pub fn new(timestamp: DateTime<Utc>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
        }
    }

    /// Line stamped with the current UTC time.
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self::new(Utc::now(), level, message)
    }

    /// The marker every stream opens with.
    pub fn startup() -> Self {
        Self::now(LogLevel::Info, STARTUP_MESSAGE)
    }

    /// Wire form, newline terminated.
    pub fn render(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] - {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.level,
            self.message
        )
    }
}

impl FromStr for LogLine {
    type Err = ParseLineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_suffix('\n').unwrap_or(s);
        let (timestamp, rest) = s.split_once(" [").ok_or(ParseLineError::Shape)?;
        let (level, message) = rest.split_once("] - ").ok_or(ParseLineError::Shape)?;

        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|_| ParseLineError::Timestamp(timestamp.to_string()))?
            .with_timezone(&Utc);

        Ok(Self {
            timestamp,
            level: level.parse()?,
            message: message.to_string(),
        })
    }
}

// libbeep/src/logging.rs

//! Per-component logging handle.
//!
//! Components never touch process-wide logging state. Each one receives a
//! [`Logger`] built from its configuration; the logger applies its own level
//! filter and forwards the record to the `log` facade under its own target.

use std::fmt;
use std::sync::Arc;

use log::{Level, LevelFilter};

use crate::constants::DEFAULT_LOG_TARGET;

/// Log through a component [`Logger`] with the `log` macro syntax:
/// `debug!(self.logger, "state {} -> {}", from, to)`.
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(::log::Level::Error, format_args!($($arg)+))
    };
}

macro_rules! log_warn {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(::log::Level::Warn, format_args!($($arg)+))
    };
}

macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(::log::Level::Info, format_args!($($arg)+))
    };
}

macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(::log::Level::Debug, format_args!($($arg)+))
    };
}

pub(crate) use {debug, error, info};
pub(crate) use log_warn as warn;

/// Logging settings injected through component configuration.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Root target; components log under `<target>::<component>`.
    pub target: String,
    /// Most verbose level passed on to the `log` facade.
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_LOG_TARGET.to_string(),
            level: LevelFilter::Info,
        }
    }
}

impl LogConfig {
    /// Settings with an explicit target and level.
    pub fn new(target: impl Into<String>, level: LevelFilter) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    /// Derive a logger for a sub-component, e.g. `libbeep::session`.
    pub fn logger(&self, component: &str) -> Logger {
        Logger::new(format!("{}::{}", self.target, component), self.level)
    }
}

/// Level-filtered handle writing under one component target.
#[derive(Debug, Clone)]
pub struct Logger {
    target: Arc<str>,
    level: LevelFilter,
}

impl Logger {
    /// Logger writing under `target`, filtered at `level`.
    pub fn new(target: impl Into<String>, level: LevelFilter) -> Self {
        Self {
            target: Arc::from(target.into()),
            level,
        }
    }

    /// Full target string.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether a record at `level` passes this logger's filter.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    /// Forward a record to the `log` facade if the filter allows it.
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if self.enabled(level) {
            log::log!(target: self.target(), level, "{}", args);
        }
    }

    /// Log at [`Level::Error`].
    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args)
    }

    /// Log at [`Level::Warn`].
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args)
    }

    /// Log at [`Level::Info`].
    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args)
    }

    /// Log at [`Level::Debug`].
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args)
    }
}

impl Default for Logger {
    fn default() -> Self {
        LogConfig::default().logger("core")
    }
}

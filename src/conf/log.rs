//! Settings of the structured logger installed by [`logging::init`].
//!
//! [`logging::init`]: crate::logging::init

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Most verbose level of the records written by the logger.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, SmartDefault,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Nothing is logged.
    Off,
    Critical,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Converts this [`LogLevel`] into a [`slog::Level`]. `None` if logging
    /// is disabled.
    pub fn to_slog(self) -> Option<slog::Level> {
        use slog::Level as L;

        Some(match self {
            Self::Off => return None,
            Self::Critical => L::Critical,
            Self::Error => L::Error,
            Self::Warn => L::Warning,
            Self::Info => L::Info,
            Self::Debug => L::Debug,
            Self::Trace => L::Trace,
        })
    }
}

/// Logger settings of the library records, bridged from the [`log`] facade.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, SmartDefault)]
#[serde(default)]
pub struct Log {
    /// Defaults to `INFO`.
    pub level: LogLevel,

    /// Capacity of the queue between the logging call sites and the thread
    /// writing the records. Records are dropped while it is full.
    ///
    /// Defaults to `2048`.
    #[default(2048)]
    pub buffer: usize,
}

impl Log {
    /// Returns configured logging level. `None` if disabled.
    #[inline]
    pub fn level(&self) -> Option<slog::Level> {
        self.level.to_slog()
    }
}

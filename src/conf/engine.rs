//! Process-wide engine initialization settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Verbosity of the engine's own logs.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, SmartDefault,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum EngineLogLevel {
    Trace,
    Debug,
    Info,
    Log,
    Warn,
    #[default]
    Error,
}

/// Engine initialization settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, SmartDefault)]
#[serde(default)]
pub struct Engine {
    /// Interval between audio level reports of the tracks.
    ///
    /// Defaults to `40ms`.
    #[default(Duration::from_millis(40))]
    #[serde(with = "humantime_serde")]
    pub audio_levels_interval: Duration,

    /// Disables audio level reports.
    ///
    /// Defaults to `false`.
    #[default(false)]
    pub disable_audio_levels: bool,

    /// Verbosity of the engine's own logs.
    ///
    /// Defaults to `ERROR`.
    pub log_level: EngineLogLevel,
}

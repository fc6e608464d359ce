//! Teardown timeouts.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Timeouts bounding the teardown of engine objects.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, SmartDefault,
)]
#[serde(default)]
pub struct Timeouts {
    /// Time after which event listeners of a disconnecting connection or a
    /// leaving conference are detached, even if the engine never confirmed
    /// the teardown.
    ///
    /// Defaults to `4s`.
    #[default(Duration::from_secs(4))]
    #[serde(with = "humantime_serde")]
    pub listeners_cleanup: Duration,
}

//! Provides application configuration options.
//!
//! Configuration options can be parsed from config files in TOML format.

pub mod connection;
pub mod engine;
pub mod log;
pub mod timeouts;

use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[doc(inline)]
pub use self::{
    connection::Connection, engine::Engine, log::Log, timeouts::Timeouts,
};

/// CLI argument that is responsible for holding application configuration
/// file path.
static APP_CONF_PATH_CMD_ARG_NAME: &str = "--conf";

/// Environment variable that is responsible for holding application
/// configuration file path.
static APP_CONF_PATH_ENV_VAR_NAME: &str = "CONCLAVE_CONF";

/// Holds application config.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Conf {
    /// Logging settings.
    pub log: Log,

    /// Process-wide engine initialization settings.
    pub engine: Engine,

    /// Default settings of a signaling connection.
    pub connection: Connection,

    /// Teardown timeouts.
    pub timeouts: Timeouts,
}

impl Conf {
    /// Creates new [`Conf`] and applies values from the following sources
    /// (in the following order):
    /// - default values;
    /// - configuration file, the name of which is given as a command line
    ///   parameter or environment variable;
    /// - environment variables.
    ///
    /// # Errors
    ///
    /// Errors if parsing fails.
    pub fn parse() -> Result<Self, ConfigError> {
        let mut cfg = Config::new();

        cfg.merge(Config::try_from(&Self::default())?)?;

        if let Some(path) = get_conf_file_name(env::args()) {
            cfg.merge(File::with_name(&path))?;
        }

        cfg.merge(Environment::with_prefix("CONCLAVE").separator("__"))?;

        cfg.try_into()
    }
}

/// Returns the path to the configuration file, if it's set via CLI `args`
/// or environment variable.
///
/// The environment variable takes precedence over the CLI argument.
fn get_conf_file_name<T>(args: T) -> Option<String>
where
    T: IntoIterator<Item = String>,
{
    if let Ok(path) = env::var(APP_CONF_PATH_ENV_VAR_NAME) {
        if !path.is_empty() {
            return Some(path);
        }
    }
    let mut args = args
        .into_iter()
        .skip_while(|x| x != APP_CONF_PATH_CMD_ARG_NAME);
    args.next()?;
    args.next().filter(|path| !path.is_empty())
}

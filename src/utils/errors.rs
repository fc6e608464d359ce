//! Errors shared by the whole crate.

use std::fmt;

use derive_more::Display;
use tracerr::{Trace, Traced};

/// Error which can be reported at a callback boundary.
pub trait NamedError: fmt::Display {
    /// Returns the name of this error.
    fn name(&self) -> &'static str;
}

/// Printable representation of a traced error.
///
/// Failures inside engine event callbacks and background watchers are
/// converted into [`ConclaveError`] and logged, never propagated to the
/// engine.
#[derive(Clone, Debug, Display)]
#[display(fmt = "{}: {}\n{}", name, message, trace)]
pub struct ConclaveError {
    name: &'static str,
    message: String,
    trace: Trace,
}

impl ConclaveError {
    /// Logs this error with the `ERROR` level.
    pub fn print(&self) {
        log::error!("{}", self);
    }

    /// Returns the name of this error.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the message of this error.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the trace of this error.
    #[inline]
    pub fn trace(&self) -> &Trace {
        &self.trace
    }
}

impl<E: NamedError> From<(E, Trace)> for ConclaveError {
    fn from((err, trace): (E, Trace)) -> Self {
        Self {
            name: err.name(),
            message: err.to_string(),
            trace,
        }
    }
}

impl<E: NamedError> From<Traced<E>> for ConclaveError {
    #[inline]
    fn from(traced: Traced<E>) -> Self {
        Self::from(traced.into_parts())
    }
}

/// Connection was requested without a configuration.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display(fmt = "Connection configuration is required")]
pub struct ConfigRequiredError;

impl NamedError for ConfigRequiredError {
    fn name(&self) -> &'static str {
        "ConfigRequired"
    }
}

/// Unknown event wiring direction.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display(fmt = "Invalid wiring direction: {}", _0)]
pub struct InvalidDirectionError(pub String);

impl NamedError for InvalidDirectionError {
    fn name(&self) -> &'static str {
        "InvalidArgument"
    }
}

/// Referenced state was dropped while its callback was still registered.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display(fmt = "Handler is in detached state")]
pub struct HandlerDetachedError;

impl NamedError for HandlerDetachedError {
    fn name(&self) -> &'static str {
        "HandlerDetached"
    }
}

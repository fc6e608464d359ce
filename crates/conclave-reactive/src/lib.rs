//! Observable containers used to expose state of single-threaded reactive
//! components.
//!
//! Every container emits its modifications to subscribers as a
//! [`Stream`] and lets callers await a specific value with a [`Future`].
//!
//! ```
//! use conclave_reactive::ObservableCell;
//! # use futures::{executor, StreamExt as _};
//!
//! # executor::block_on(async {
//! let state = ObservableCell::new(0u8);
//! let mut changes = state.subscribe();
//!
//! // Current value is emitted first.
//! assert_eq!(changes.next().await, Some(0));
//!
//! state.set(1);
//! // Setting the same value again emits nothing.
//! state.set(1);
//! state.set(2);
//! assert_eq!(changes.next().await, Some(1));
//! assert_eq!(changes.next().await, Some(2));
//! # });
//! ```
//!
//! [`Future`]: std::future::Future
//! [`Stream`]: futures::Stream

#![allow(clippy::module_name_repetitions)]

mod cell;
pub mod collections;

use std::fmt;

use futures::channel::oneshot;

#[doc(inline)]
pub use self::{cell::ObservableCell, collections::ObservableHashMap};

/// Error returned to pending [`ObservableCell::when`] futures when the
/// observed container is dropped before the awaited value appears.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DroppedError;

impl fmt::Display for DroppedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Observable value has been dropped")
    }
}

impl From<oneshot::Canceled> for DroppedError {
    #[inline]
    fn from(_: oneshot::Canceled) -> Self {
        Self
    }
}

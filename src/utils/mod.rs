//! Miscellaneous utility structs and functions.

mod errors;
pub mod events;

use derive_more::From;
use futures::{future, future::AbortHandle, Future};

use crate::platform;

#[doc(inline)]
pub use self::{
    errors::{
        ConclaveError, ConfigRequiredError, HandlerDetachedError,
        InvalidDirectionError, NamedError,
    },
    events::{wire, Direction, EventSpec, TrackDirection, Wiring},
};

/// Upgrades the provided [`Weak`] reference, mapping it to a [`Result`] with
/// a traced [`HandlerDetachedError`].
///
/// [`Weak`]: std::rc::Weak
macro_rules! upgrade_or_detached {
    ($v:expr) => {{
        $v.upgrade().ok_or_else(|| {
            tracerr::new!($crate::utils::HandlerDetachedError)
        })
    }};
}

/// Wrapper around [`AbortHandle`] which aborts [`Future`] on [`Drop`].
#[derive(Debug, From)]
pub struct TaskHandle(AbortHandle);

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Spawns the provided [`Future`] as an abortable task, returning the
/// [`TaskHandle`] which aborts it on [`Drop`].
pub fn spawn_abortable<F>(task: F) -> TaskHandle
where
    F: Future<Output = ()> + 'static,
{
    let (task, handle) = future::abortable(task);
    platform::spawn(async move {
        let _ = task.await;
    });
    TaskHandle(handle)
}

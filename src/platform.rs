//! Single-threaded executor primitives.
//!
//! Every component of this crate is `!Send` and spawns its background tasks
//! onto the current [`LocalSet`].
//!
//! [`LocalSet`]: tokio::task::LocalSet

use std::time::Duration;

use futures::Future;

/// Spawns the provided [`Future`] onto the current [`LocalSet`].
///
/// # Panics
///
/// If called outside of a [`LocalSet`] context.
///
/// [`LocalSet`]: tokio::task::LocalSet
#[inline]
pub fn spawn<F>(task: F)
where
    F: Future<Output = ()> + 'static,
{
    drop(tokio::task::spawn_local(task));
}

/// [`Future`] which resolves after the provided [`Duration`].
#[inline]
pub async fn delay_for(delay: Duration) {
    tokio::time::sleep(delay).await;
}

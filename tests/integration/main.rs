#![forbid(non_ascii_idents, unsafe_code)]

mod client;
mod connection;
mod engine;
mod local_tracks;

use std::{future::Future, time::Duration};

use tokio::{task::LocalSet, time};

/// Runs the provided `test` on a [`LocalSet`], so it may spawn local tasks.
pub async fn local<F: Future>(test: F) -> F::Output {
    LocalSet::new().run_until(test).await
}

/// Lets all the spawned tasks run until they are idle.
pub async fn settle() {
    time::sleep(Duration::from_millis(1)).await;
}

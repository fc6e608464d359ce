//! Observable analogue of a [`Cell`].
//!
//! [`Cell`]: std::cell::Cell

use std::{
    cell::{Ref, RefCell},
    fmt, mem,
};

use futures::{
    channel::{mpsc, oneshot},
    future::{self, LocalBoxFuture},
    stream::{self, LocalBoxStream, StreamExt as _},
};

use crate::DroppedError;

/// Subscriber of an [`ObservableCell`].
enum Subscriber<D> {
    /// Waits for the first value satisfying `assert_fn`.
    When {
        sender: oneshot::Sender<()>,
        assert_fn: Box<dyn Fn(&D) -> bool>,
    },

    /// Receives every modification.
    Stream(mpsc::UnboundedSender<D>),
}

/// Interior-mutable container notifying its subscribers about every real
/// modification of the underlying data.
///
/// A modification is considered real only if the new value is not equal to
/// the previous one (checked with [`PartialEq`]).
///
/// Subscribers are notified synchronously (their channels are fed) after the
/// data borrow is released, so subscribers may freely read the cell.
pub struct ObservableCell<D> {
    /// Underlying data.
    data: RefCell<D>,

    /// Subscribers to the modifications of `data`.
    subs: RefCell<Vec<Subscriber<D>>>,
}

impl<D: fmt::Debug> fmt::Debug for ObservableCell<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableCell")
            .field("data", &self.data)
            .finish()
    }
}

impl<D: Default + 'static> Default for ObservableCell<D> {
    #[inline]
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<D: 'static> ObservableCell<D> {
    /// Creates a new [`ObservableCell`] holding the provided `data`.
    #[inline]
    #[must_use]
    pub fn new(data: D) -> Self {
        Self {
            data: RefCell::new(data),
            subs: RefCell::new(Vec::new()),
        }
    }

    /// Returns an immutable reference to the underlying data.
    ///
    /// # Panics
    ///
    /// If the data is being mutated at the moment.
    #[inline]
    pub fn borrow(&self) -> Ref<'_, D> {
        self.data.borrow()
    }

    /// Returns a [`Future`] resolving once the underlying data satisfies the
    /// provided `assert_fn`.
    ///
    /// Resolves immediately if the current data satisfies it already.
    ///
    /// [`Future`]: std::future::Future
    pub fn when<F>(
        &self,
        assert_fn: F,
    ) -> LocalBoxFuture<'static, Result<(), DroppedError>>
    where
        F: Fn(&D) -> bool + 'static,
    {
        if (assert_fn)(&self.data.borrow()) {
            return Box::pin(future::ok(()));
        }
        let (sender, rx) = oneshot::channel();
        self.subs.borrow_mut().push(Subscriber::When {
            sender,
            assert_fn: Box::new(assert_fn),
        });
        Box::pin(async move { Ok(rx.await?) })
    }
}

impl<D: PartialEq + 'static> ObservableCell<D> {
    /// Returns a [`Future`] resolving once the underlying data becomes equal
    /// to the provided `should_be` value.
    ///
    /// [`Future`]: std::future::Future
    #[inline]
    pub fn when_eq(
        &self,
        should_be: D,
    ) -> LocalBoxFuture<'static, Result<(), DroppedError>> {
        self.when(move |data| data == &should_be)
    }
}

impl<D: Clone + 'static> ObservableCell<D> {
    /// Returns a copy of the underlying data.
    #[inline]
    #[must_use]
    pub fn get(&self) -> D {
        self.data.borrow().clone()
    }

    /// Returns a [`Stream`] emitting the current data first and then every
    /// modification of it.
    ///
    /// The [`Stream`] ends when this [`ObservableCell`] is dropped.
    ///
    /// [`Stream`]: futures::Stream
    pub fn subscribe(&self) -> LocalBoxStream<'static, D> {
        let current = self.get();
        let (tx, rx) = mpsc::unbounded();
        self.subs.borrow_mut().push(Subscriber::Stream(tx));

        Box::pin(stream::once(future::ready(current)).chain(rx))
    }
}

impl<D: Clone + PartialEq + 'static> ObservableCell<D> {
    /// Sets the provided `new_data` as the underlying data.
    #[inline]
    pub fn set(&self, new_data: D) {
        drop(self.replace(new_data));
    }

    /// Replaces the underlying data with the provided `new_data`, returning
    /// the previous one.
    pub fn replace(&self, mut new_data: D) -> D {
        mem::swap(&mut *self.data.borrow_mut(), &mut new_data);
        if *self.data.borrow() != new_data {
            self.notify();
        }
        new_data
    }

    /// Mutates the underlying data with the provided function.
    ///
    /// Subscribers are notified once, after `f` returns, and only if the data
    /// has really changed.
    pub fn mutate<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut D) -> R,
    {
        let before = self.get();
        let out = (f)(&mut *self.data.borrow_mut());
        if *self.data.borrow() != before {
            self.notify();
        }
        out
    }

    /// Feeds the current data to all the subscribers, dropping the ones that
    /// are gone or satisfied.
    fn notify(&self) {
        let data = self.get();
        let subs = mem::take(&mut *self.subs.borrow_mut());
        let mut alive = Vec::with_capacity(subs.len());
        for sub in subs {
            match sub {
                Subscriber::When { sender, assert_fn } => {
                    if (assert_fn)(&data) {
                        let _ = sender.send(());
                    } else {
                        alive.push(Subscriber::When { sender, assert_fn });
                    }
                }
                Subscriber::Stream(tx) => {
                    if tx.unbounded_send(data.clone()).is_ok() {
                        alive.push(Subscriber::Stream(tx));
                    }
                }
            }
        }
        // New subscribers may have been registered while notifying.
        let mut subs = self.subs.borrow_mut();
        alive.append(&mut subs);
        *subs = alive;
    }
}

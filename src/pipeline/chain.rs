//! Chain - FIFO serialization of asynchronous operations.
//!
//! Every operation enqueued on a chain starts only after the previous one has
//! finished, whether it succeeded or failed. The chain itself never fails; each
//! operation's own output is delivered through the shared handle returned by
//! [`Chain::enqueue`].
//!
//! Futures are lazy: an enqueued operation runs when someone awaits it, a later
//! operation on the same chain, or [`Chain::settled`].
//!
//! # Pattern: never await your own chain
//!
//! An operation must not await a later operation on the same chain - it would
//! wait on itself. Enqueue follow-up work and return instead.

use std::cell::{Cell, RefCell};
use std::future::Future;

use futures::future::{self, LocalBoxFuture, Shared};
use futures::FutureExt;

type Tail = Shared<LocalBoxFuture<'static, ()>>;

/// A single-threaded FIFO operation queue.
pub struct Chain {
    tail: RefCell<Tail>,
    enqueued: Cell<usize>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    pub fn new() -> Self {
        Self {
            tail: RefCell::new(future::ready(()).boxed_local().shared()),
            enqueued: Cell::new(0),
        }
    }

    /// Append `operation`; it runs after everything enqueued before it.
    pub fn enqueue<F, T>(&self, operation: F) -> Shared<LocalBoxFuture<'static, T>>
    where
        F: Future<Output = T> + 'static,
        T: Clone + 'static,
    {
        let previous = self.tail.borrow().clone();
        let step = async move {
            previous.await;
            operation.await
        }
        .boxed_local()
        .shared();

        let next_tail = step.clone().map(|_| ()).boxed_local().shared();
        *self.tail.borrow_mut() = next_tail;
        self.enqueued.set(self.enqueued.get() + 1);
        step
    }

    /// Resolves once everything enqueued so far has finished.
    pub fn settled(&self) -> Shared<LocalBoxFuture<'static, ()>> {
        self.tail.borrow().clone()
    }

    /// Total number of operations ever enqueued.
    pub fn enqueued(&self) -> usize {
        self.enqueued.get()
    }
}

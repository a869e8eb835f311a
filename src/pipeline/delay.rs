//! Delay - batching handle for one lifecycle pass.
//!
//! A render, update or destroy pass walks the node tree synchronously. Any node
//! that starts asynchronous work (creating a nested component, mounting it,
//! pushing bound data into it) adds that work to the pass's `Delay` instead of
//! awaiting it. The caller that started the pass then awaits [`Delay::end`], which
//! resolves once every added operation has resolved, in any order.
//!
//! `end` consumes the delay, so a delay cannot be reused across passes.
//!
//! ```ignore
//! let mut delay = Delay::new();
//! for node in nodes.iter_mut() {
//!     node.render(mount, &context, &mut delay)?;
//! }
//! delay.end().await?;
//! ```

use std::future::Future;

use futures::future::{try_join_all, LocalBoxFuture};
use futures::FutureExt;

use crate::error::Result;

/// A pending operation registered with a [`Delay`].
pub type Pending = LocalBoxFuture<'static, Result<()>>;

/// Join-all completion barrier over the async work of one pass.
#[derive(Default)]
pub struct Delay {
    pending: Vec<Pending>,
}

impl Delay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation. Nothing runs until [`Delay::end`] is awaited.
    pub fn add<F>(&mut self, operation: F)
    where
        F: Future<Output = Result<()>> + 'static,
    {
        self.pending.push(operation.boxed_local());
    }

    /// Number of operations registered so far.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Resolve once every registered operation resolved; fail with the first error.
    pub fn end(self) -> LocalBoxFuture<'static, Result<()>> {
        let pending = self.pending;
        async move {
            if pending.is_empty() {
                return Ok(());
            }
            try_join_all(pending).await.map(|_| ())
        }
        .boxed_local()
    }

    /// Run `pass` against a fresh delay and return its completion.
    ///
    /// A synchronous error from `pass` is returned without awaiting the
    /// operations registered before it.
    pub fn also<F>(pass: F) -> LocalBoxFuture<'static, Result<()>>
    where
        F: FnOnce(&mut Delay) -> Result<()>,
    {
        let mut delay = Delay::new();
        match pass(&mut delay) {
            Ok(()) => delay.end(),
            Err(err) => futures::future::ready(Err(err)).boxed_local(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use futures::channel::oneshot;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;

    use crate::error::WeaveError;

    #[test]
    fn test_empty_delay_resolves() {
        assert!(block_on(Delay::new().end()).is_ok());
    }

    #[test]
    fn test_end_waits_for_all_in_any_order() {
        let mut pool = LocalPool::new();
        let done = Rc::new(RefCell::new(false));

        let (tx_a, rx_a) = oneshot::channel::<()>();
        let (tx_b, rx_b) = oneshot::channel::<()>();

        let mut delay = Delay::new();
        delay.add(async move {
            let _ = rx_a.await;
            Ok(())
        });
        delay.add(async move {
            let _ = rx_b.await;
            Ok(())
        });
        assert_eq!(delay.len(), 2);

        let done_flag = done.clone();
        pool.spawner()
            .spawn_local(async move {
                delay.end().await.unwrap();
                *done_flag.borrow_mut() = true;
            })
            .unwrap();

        pool.run_until_stalled();
        assert!(!*done.borrow());

        // Resolve the second one first
        tx_b.send(()).unwrap();
        pool.run_until_stalled();
        assert!(!*done.borrow());

        tx_a.send(()).unwrap();
        pool.run_until_stalled();
        assert!(*done.borrow());
    }

    #[test]
    fn test_end_surfaces_failure() {
        let mut delay = Delay::new();
        delay.add(async { Ok(()) });
        delay.add(async { Err(WeaveError::UnknownAction("boom".into())) });

        assert_eq!(
            block_on(delay.end()),
            Err(WeaveError::UnknownAction("boom".into()))
        );
    }

    #[test]
    fn test_also() {
        let ran = Rc::new(RefCell::new(0));
        let counter = ran.clone();
        let result = block_on(Delay::also(|delay| {
            delay.add(async move {
                *counter.borrow_mut() += 1;
                Ok(())
            });
            Ok(())
        }));
        assert!(result.is_ok());
        assert_eq!(*ran.borrow(), 1);

        let failed = block_on(Delay::also(|_| Err(WeaveError::Uninitialized)));
        assert_eq!(failed, Err(WeaveError::Uninitialized));
    }
}

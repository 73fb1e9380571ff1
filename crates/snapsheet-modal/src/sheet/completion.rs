#![forbid(unsafe_code)]

//! One-shot completion signal for a sheet transition.
//!
//! A [`Completion`] is a cheap-clone handle that resolves exactly once.
//! Callers can poll it ([`is_resolved`](Completion::is_resolved)), attach a
//! callback ([`on_resolve`](Completion::on_resolve)), or `.await` it.
//!
//! # Invariants
//!
//! 1. Resolution happens at most once; later `resolve` calls are ignored.
//! 2. Callbacks attached after resolution run immediately.
//! 3. Callbacks and wakers run after the interior borrow is released, so a
//!    callback may attach further callbacks or query the handle.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

type Callback = Box<dyn FnOnce()>;

#[derive(Default)]
struct CompletionInner {
    resolved: bool,
    callbacks: Vec<Callback>,
    wakers: Vec<Waker>,
}

/// Resolves when a sheet transition has fully settled.
#[derive(Clone, Default)]
pub struct Completion {
    inner: Rc<RefCell<CompletionInner>>,
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Completion")
            .field("resolved", &inner.resolved)
            .field("callbacks", &inner.callbacks.len())
            .finish()
    }
}

impl Completion {
    /// An unresolved completion.
    #[must_use]
    pub(crate) fn pending() -> Self {
        Self::default()
    }

    /// A completion that is already resolved.
    #[must_use]
    pub fn resolved() -> Self {
        let completion = Self::default();
        completion.inner.borrow_mut().resolved = true;
        completion
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.inner.borrow().resolved
    }

    /// Run `callback` once this completion resolves (immediately if it has).
    pub fn on_resolve(&self, callback: impl FnOnce() + 'static) {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.resolved {
                inner.callbacks.push(Box::new(callback));
                return;
            }
        }
        callback();
    }

    /// Whether two handles refer to the same signal.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn resolve(&self) {
        let (callbacks, wakers) = {
            let mut inner = self.inner.borrow_mut();
            if inner.resolved {
                return;
            }
            inner.resolved = true;
            (
                std::mem::take(&mut inner.callbacks),
                std::mem::take(&mut inner.wakers),
            )
        };
        for callback in callbacks {
            callback();
        }
        for waker in wakers {
            waker.wake();
        }
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.resolved {
            return Poll::Ready(());
        }
        if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            inner.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn resolves_once() {
        let done = Completion::pending();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        done.on_resolve(move || c.set(c.get() + 1));
        assert!(!done.is_resolved());

        done.resolve();
        done.resolve();
        assert!(done.is_resolved());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn late_callback_runs_immediately() {
        let done = Completion::resolved();
        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        done.on_resolve(move || r.set(true));
        assert!(ran.get());
    }

    #[test]
    fn callback_may_reenter() {
        let done = Completion::pending();
        let handle = done.clone();
        let nested = Rc::new(Cell::new(false));
        let n = Rc::clone(&nested);
        done.on_resolve(move || {
            assert!(handle.is_resolved());
            handle.on_resolve(move || n.set(true));
        });
        done.resolve();
        assert!(nested.get());
    }

    #[test]
    fn future_polls_ready_after_resolve() {
        let mut done = Completion::pending();
        let mut cx = Context::from_waker(Waker::noop());
        assert_eq!(Pin::new(&mut done).poll(&mut cx), Poll::Pending);
        // Polling twice with the same waker does not duplicate it.
        assert_eq!(Pin::new(&mut done).poll(&mut cx), Poll::Pending);
        assert_eq!(done.inner.borrow().wakers.len(), 1);

        done.resolve();
        assert_eq!(Pin::new(&mut done).poll(&mut cx), Poll::Ready(()));
    }

    #[test]
    fn clones_share_signal() {
        let a = Completion::pending();
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        a.resolve();
        assert!(b.is_resolved());
        assert!(!a.ptr_eq(&Completion::resolved()));
    }
}

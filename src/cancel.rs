use atomic_waker::AtomicWaker;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

struct CancellationTokenInner {
    waker: AtomicWaker,
    cancelled: AtomicBool,
}

/// Cancellation token
///
/// Call cancel() to stop the read loop of a port. Only one task may wait on
/// [`CancellationToken::cancelled`] at a time.
#[derive(Clone)]
pub(crate) struct CancellationToken(Arc<CancellationTokenInner>);

impl CancellationToken {
    pub(crate) fn new() -> Self {
        Self(Arc::new(CancellationTokenInner {
            waker: AtomicWaker::new(),
            cancelled: AtomicBool::new(false),
        }))
    }

    pub(crate) fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::Relaxed);
        self.0.waker.wake();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::Relaxed)
    }

    /// Future that completes once [`cancel`][Self::cancel] has been called.
    pub(crate) fn cancelled(&self) -> Cancelled<'_> {
        Cancelled { token: self }
    }
}

pub(crate) struct Cancelled<'a> {
    token: &'a CancellationToken,
}

impl Future for Cancelled<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.token.0.waker.register(cx.waker());
        if self.token.is_cancelled() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

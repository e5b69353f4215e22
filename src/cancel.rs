//! Per-request cancellation plumbing.
//!
//! A [`CancelToken`] is held by the caller; the matching [`CancelSignal`]
//! travels with a request into the service, which races adapter calls
//! against it. Cancellation is cooperative: in-flight LLM and reasoner
//! futures are dropped, and no session mutation happens afterwards.

use futures::future::{self, Either};
use std::future::Future;
use tokio::sync::watch;

use crate::error::{Error, Result};

/// Caller-side handle that triggers cancellation.
#[derive(Debug)]
pub struct CancelToken {
    tx: watch::Sender<bool>,
}

/// Request-side handle observed by the service at suspension points.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Create a token/signal pair.
    pub fn new() -> (CancelToken, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelToken { tx }, CancelSignal { rx })
    }

    /// Cancel the associated request.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancelSignal {
    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested.
    ///
    /// If the token is dropped without cancelling, this future never
    /// resolves, so racing against it degrades to plain execution.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        loop {
            if rx.changed().await.is_err() {
                future::pending::<()>().await;
            }
            if *rx.borrow() {
                return;
            }
        }
    }
}

/// Run a fallible future, aborting with [`Error::Cancelled`] if the signal
/// fires first.
pub async fn run_cancellable<T, F>(cancel: Option<&CancelSignal>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match cancel {
        None => fut.await,
        Some(signal) => {
            if signal.is_cancelled() {
                return Err(Error::Cancelled);
            }
            futures::pin_mut!(fut);
            let cancelled = signal.cancelled();
            futures::pin_mut!(cancelled);
            match future::select(fut, cancelled).await {
                Either::Left((out, _)) => out,
                Either::Right(((), _)) => Err(Error::Cancelled),
            }
        }
    }
}

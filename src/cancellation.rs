// src/cancellation.rs
// Cooperative cancellation, checked at the top of every iteration, before
// the LLM call, and inside the retry policy's backoff wait.

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

#[derive(Debug, Clone)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
}

pub fn cancellation_pair() -> (CancellationHandle, CancellationToken) {
    let (tx, rx) = watch::channel(false);
    (CancellationHandle { tx }, CancellationToken { rx })
}

impl CancellationHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancellationToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled; intended to race against a
    /// timed delay so backoff waits can be pre-empted.
    pub async fn cancelled(&mut self) {
        if self.is_cancelled() {
            return;
        }
        while self.rx.changed().await.is_ok() {
            if *self.rx.borrow() {
                return;
            }
        }
    }
}

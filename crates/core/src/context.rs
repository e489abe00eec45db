//! Per-operation cancellation and deadlines
//!
//! Every facade operation takes an [`OpContext`]. Each store call made on the
//! caller's behalf is raced against the context's cancellation token and its
//! deadline, so a caller can abandon slow network calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Cancellation and deadline carried through one operation
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// Use an existing token, e.g. a child of a server-wide shutdown token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Fail calls that are still running `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Fail calls that are still running at `deadline`.
    /// An earlier deadline already set on the context is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel every operation using this context (and its clones)
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the context is already cancelled or past its deadline
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled(operation.to_string()));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::DeadlineExceeded {
                    operation: operation.to_string(),
                    elapsed: Duration::ZERO,
                });
            }
        }
        Ok(())
    }

    /// Start `call` and drive it unless the context is cancelled or its
    /// deadline passes first. Nothing is started when the context is already
    /// done.
    pub async fn run<T, F, Fut>(&self, operation: &str, call: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.check(operation)?;
        let fut = call();

        let started = Instant::now();
        let guarded = async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(Error::Cancelled(operation.to_string())),
                result = fut => result,
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .map_err(|_| Error::DeadlineExceeded {
                    operation: operation.to_string(),
                    elapsed: started.elapsed(),
                })?,
            None => guarded.await,
        }
    }
}

//! Retry policies for full/empty queue states.
//!
//! The queue API never blocks. Producers that must not drop items, and the
//! coordinator waiting on the trigger queue, loop through these helpers
//! until they succeed or the cancellation token is set.

use std::fmt;
use std::time::Duration;

use contracts::{CancellationToken, RetryConfig};
use thiserror::Error;

use crate::{QueueConsumer, QueueProducer};

/// How a blocked caller waits between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Retry immediately with a CPU spin hint
    #[default]
    Spin,
    /// Sleep between attempts, doubling from `initial` up to `max`
    Backoff { initial: Duration, max: Duration },
}

impl RetryPolicy {
    /// Fresh waiter for one blocked operation
    pub fn backoff(self) -> Backoff {
        let current = match self {
            Self::Spin => Duration::ZERO,
            Self::Backoff { initial, .. } => initial,
        };
        Backoff {
            policy: self,
            current,
            attempts: 0,
        }
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        match config {
            RetryConfig::Spin => Self::Spin,
            RetryConfig::Backoff { initial_us, max_us } => Self::Backoff {
                initial: Duration::from_micros(initial_us),
                max: Duration::from_micros(max_us),
            },
        }
    }
}

/// Per-operation wait state.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    current: Duration,
    attempts: u64,
}

impl Backoff {
    /// Wait once according to the policy
    pub fn wait(&mut self) {
        self.attempts += 1;
        match self.policy {
            RetryPolicy::Spin => std::hint::spin_loop(),
            RetryPolicy::Backoff { max, .. } => {
                std::thread::sleep(self.current);
                self.current = (self.current * 2).min(max);
            }
        }
    }

    /// Next sleep duration (zero for spin)
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Number of waits so far
    pub fn attempts(&self) -> u64 {
        self.attempts
    }
}

/// Cancellation observed before the item could be written.
///
/// Carries the item back to the caller.
#[derive(Error)]
#[error("cancelled while waiting for queue space")]
pub struct Cancelled<T>(pub T);

impl<T> Cancelled<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Cancelled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cancelled(..)")
    }
}

/// Write `item`, retrying while the queue is full.
///
/// # Errors
/// `Cancelled` with the item when `token` is set before space frees up.
pub fn write_with_retry<T>(
    producer: &mut QueueProducer<T>,
    item: T,
    token: &CancellationToken,
    policy: RetryPolicy,
) -> Result<(), Cancelled<T>> {
    let mut item = item;
    let mut backoff = policy.backoff();
    loop {
        match producer.try_write(item) {
            Ok(()) => return Ok(()),
            Err(back) => item = back,
        }
        if token.is_cancelled() {
            return Err(Cancelled(item));
        }
        backoff.wait();
    }
}

/// Result of a blocking read
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome<T> {
    Item(T),
    /// Cancellation observed with nothing pending
    Cancelled,
    /// Producer dropped and queue drained
    Closed,
}

/// Read the next item, retrying while the queue is empty.
///
/// Pending items always win over cancellation and end of stream.
pub fn read_with_retry<T>(
    consumer: &mut QueueConsumer<T>,
    token: &CancellationToken,
    policy: RetryPolicy,
) -> ReadOutcome<T> {
    let mut backoff = policy.backoff();
    loop {
        if let Some(item) = consumer.try_read() {
            return ReadOutcome::Item(item);
        }
        if consumer.is_producer_closed() {
            // the producer may have pushed right before closing
            return match consumer.try_read() {
                Some(item) => ReadOutcome::Item(item),
                None => ReadOutcome::Closed,
            };
        }
        if token.is_cancelled() {
            return ReadOutcome::Cancelled;
        }
        backoff.wait();
    }
}

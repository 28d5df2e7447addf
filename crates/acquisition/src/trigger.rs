//! Trigger generator - periodic token source
//!
//! Emits tokens 0, 1, 2, ... into the trigger queue, one per interval, until
//! the token limit is reached or cancellation is observed. Dropping the
//! queue producer on exit tells the coordinator the stream is over.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{CancellationToken, TriggerToken};
use observability::{record_queue_depth, record_trigger_emitted};
use spsc_queue::{write_with_retry, QueueProducer, RetryPolicy};
use tracing::{debug, info, trace};

/// Outcome of a generator run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerReport {
    /// Tokens written to the trigger queue
    pub tokens_emitted: u64,
    /// Stopped by cancellation rather than the token limit
    pub cancelled: bool,
}

/// Periodic token source
pub struct TriggerGenerator {
    interval: Duration,
    max_tokens: Option<u64>,
    producer: QueueProducer<TriggerToken>,
    cancel: CancellationToken,
    retry: RetryPolicy,
}

impl TriggerGenerator {
    pub fn new(
        interval: Duration,
        max_tokens: Option<u64>,
        producer: QueueProducer<TriggerToken>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            interval,
            max_tokens,
            producer,
            cancel,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run on the current thread until the limit or cancellation
    pub fn run(mut self) -> TriggerReport {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            max_tokens = ?self.max_tokens,
            "trigger generator started"
        );

        let mut report = TriggerReport::default();
        let mut next = TriggerToken::FIRST;

        loop {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if self.limit_reached(report.tokens_emitted) {
                break;
            }

            if write_with_retry(&mut self.producer, next, &self.cancel, self.retry).is_err() {
                debug!(token = next.index(), "cancelled while trigger queue was full");
                report.cancelled = true;
                break;
            }

            report.tokens_emitted += 1;
            let depth = self.producer.approx_size();
            record_trigger_emitted(next.index());
            record_queue_depth("trigger", depth);
            trace!(token = next.index(), depth, "token emitted");

            next = next.next();
            if self.limit_reached(report.tokens_emitted) {
                break;
            }
            thread::sleep(self.interval);
        }

        info!(
            tokens_emitted = report.tokens_emitted,
            cancelled = report.cancelled,
            "trigger generator stopped"
        );
        report
    }

    /// Run on a dedicated named thread
    pub fn spawn(self) -> io::Result<JoinHandle<TriggerReport>> {
        thread::Builder::new()
            .name("trigger".to_string())
            .spawn(move || self.run())
    }

    fn limit_reached(&self, emitted: u64) -> bool {
        self.max_tokens.is_some_and(|max| emitted >= max)
    }
}

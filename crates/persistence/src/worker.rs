//! PersistenceWorker - drains one device queue into a sink

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::{CancellationToken, DeviceId, Frame, FrameSink};
use observability::{record_frame_committed, record_queue_depth};
use spsc_queue::QueueConsumer;
use tracing::{debug, error, info, instrument, trace};

use crate::metrics::SinkMetrics;

/// Default sleep when the queue is empty
pub const DEFAULT_IDLE_QUANTUM: Duration = Duration::from_millis(1);

/// Outcome of a worker run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub device_id: DeviceId,
    pub committed: u64,
    pub failed: u64,
}

/// Consumer side of one device's output queue
pub struct PersistenceWorker<S> {
    device_id: DeviceId,
    consumer: QueueConsumer<Frame>,
    sink: S,
    cancel: CancellationToken,
    idle_quantum: Duration,
    metrics: Arc<SinkMetrics>,
}

impl<S: FrameSink> PersistenceWorker<S> {
    pub fn new(
        device_id: DeviceId,
        consumer: QueueConsumer<Frame>,
        sink: S,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            device_id,
            consumer,
            sink,
            cancel,
            idle_quantum: DEFAULT_IDLE_QUANTUM,
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    pub fn with_idle_quantum(mut self, idle_quantum: Duration) -> Self {
        self.idle_quantum = idle_quantum;
        self
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Counters shared with the spawning handle
    pub fn metrics(&self) -> Arc<SinkMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run on the current thread.
    ///
    /// Exits only once the producer has gone away and the queue is empty.
    /// Cancellation alone does not stop the worker: the coordinator may
    /// still be writing the frame of its in-flight token, and it drops its
    /// producer as soon as it stops.
    #[instrument(
        name = "persistence_worker",
        skip(self),
        fields(device_id = %self.device_id, sink = %self.sink.name())
    )]
    pub fn run(mut self) -> WorkerReport {
        info!("persistence worker started");
        let mut draining = false;

        loop {
            if let Some(frame) = self.consumer.try_read() {
                self.commit(&frame);
                continue;
            }

            if self.consumer.is_producer_closed() {
                // a final write may have landed between the read and the check
                match self.consumer.try_read() {
                    Some(frame) => self.commit(&frame),
                    None => break,
                }
                continue;
            }

            if !draining && self.cancel.is_cancelled() {
                draining = true;
                debug!(
                    depth = self.consumer.approx_size(),
                    "cancellation observed, draining until producer closes"
                );
            }

            thread::sleep(self.idle_quantum);
        }

        if let Err(e) = self.sink.flush() {
            error!(error = %e, "flush failed on shutdown");
        }
        if let Err(e) = self.sink.close() {
            error!(error = %e, "close failed on shutdown");
        }

        let report = WorkerReport {
            device_id: self.device_id.clone(),
            committed: self.metrics.committed(),
            failed: self.metrics.failed(),
        };
        info!(
            committed = report.committed,
            failed = report.failed,
            cancelled = self.cancel.is_cancelled(),
            "persistence worker stopped"
        );
        report
    }

    fn commit(&mut self, frame: &Frame) {
        let depth = self.consumer.approx_size();
        self.metrics.set_queue_len(depth);
        record_queue_depth(&self.device_id, depth);
        trace!(sequence = frame.sequence, depth, "frame dequeued");

        match self.sink.commit(frame) {
            Ok(()) => {
                self.metrics.inc_committed();
                record_frame_committed(&self.device_id, true);
            }
            Err(e) => {
                self.metrics.inc_failed();
                record_frame_committed(&self.device_id, false);
                error!(sequence = frame.sequence, error = %e, "commit failed, frame lost");
            }
        }

        let committed = self.metrics.committed();
        if committed > 0 && committed.is_multiple_of(100) {
            debug!(committed, "persistence progress");
        }
    }
}

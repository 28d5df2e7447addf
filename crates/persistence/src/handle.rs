//! WorkerHandle - a persistence worker running on its own thread

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use contracts::{DeviceId, FrameSink};
use tracing::{debug, error, instrument};

use crate::error::{PersistenceError, Result};
use crate::metrics::SinkMetrics;
use crate::worker::{PersistenceWorker, WorkerReport};

/// Handle to a running persistence worker
pub struct WorkerHandle {
    device_id: DeviceId,
    metrics: Arc<SinkMetrics>,
    join: JoinHandle<WorkerReport>,
}

impl WorkerHandle {
    /// Start `worker` on a thread named after its device
    pub fn spawn<S: FrameSink + 'static>(worker: PersistenceWorker<S>) -> Result<Self> {
        let device_id = worker.device_id().clone();
        let metrics = worker.metrics();

        let join = thread::Builder::new()
            .name(format!("persist-{device_id}"))
            .spawn(move || worker.run())
            .map_err(|source| PersistenceError::Spawn {
                device_id: device_id.to_string(),
                source,
            })?;

        Ok(Self {
            device_id,
            metrics,
            join,
        })
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Live counters
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Wait for the worker to drain and exit.
    ///
    /// A panicked worker is reported from its last counters.
    #[instrument(name = "worker_handle_join", skip(self), fields(device_id = %self.device_id))]
    pub fn join(self) -> WorkerReport {
        match self.join.join() {
            Ok(report) => {
                debug!("worker joined");
                report
            }
            Err(e) => {
                error!(error = ?e, "persistence worker panicked");
                let snapshot = self.metrics.snapshot();
                WorkerReport {
                    device_id: self.device_id,
                    committed: snapshot.committed,
                    failed: snapshot.failed,
                }
            }
        }
    }
}

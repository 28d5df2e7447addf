//! # Persistence
//!
//! Frame persistence.
//!
//! Responsibilities:
//! - Drain each device's output queue on a dedicated thread
//! - Commit frames through a `FrameSink` (image files or log lines)
//! - Never exit while frames remain queued

pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;
pub mod worker;

pub use contracts::FrameSink;
pub use error::{PersistenceError, Result};
pub use handle::WorkerHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{create_sink, FileSink, FileSinkConfig, LogSink};
pub use worker::{PersistenceWorker, WorkerReport, DEFAULT_IDLE_QUANTUM};

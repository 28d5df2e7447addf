//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::CaptureSummary;
use persistence::WorkerReport;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Tokens written by the trigger generator
    pub tokens_emitted: u64,

    /// Tokens for which every device delivered a frame
    pub tokens_processed: u64,

    /// Frames dropped because cancellation interrupted a full-queue retry
    pub frames_dropped: u64,

    /// Run stopped by cancellation (interrupt or fault)
    pub cancelled: bool,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Per-device frame counts, rate and skew
    pub capture: CaptureSummary,

    /// One report per persistence worker, in device order
    pub workers: Vec<WorkerReport>,
}

impl PipelineStats {
    /// Frames committed across all devices
    pub fn committed(&self) -> u64 {
        self.workers.iter().map(|w| w.committed).sum()
    }

    /// Commit failures across all devices
    pub fn failed(&self) -> u64 {
        self.workers.iter().map(|w| w.failed).sum()
    }

    /// Processed tokens per second over the whole run
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.tokens_processed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("  Duration:          {:.2}s", self.duration.as_secs_f64());
        println!("  Tokens emitted:    {}", self.tokens_emitted);
        println!("  Tokens captured:   {}", self.tokens_processed);
        println!("  Throughput:        {:.2} tokens/s", self.fps());
        println!("  Frames dropped:    {}", self.frames_dropped);
        println!("  Cancelled:         {}", self.cancelled);

        println!("\nPersistence");
        for worker in &self.workers {
            println!(
                "  {}: {} committed, {} failed",
                worker.device_id, worker.committed, worker.failed
            );
        }
        println!(
            "  Total: {} committed, {} failed",
            self.committed(),
            self.failed()
        );

        println!("\n{}", self.capture);
    }
}

//! Capture pipeline metrics
//!
//! Thin recorders over the `metrics` facade plus an in-memory aggregator
//! used for the end-of-run summary.

use std::collections::BTreeMap;

use metrics::{counter, gauge, histogram};

/// Record one emitted trigger token
pub fn record_trigger_emitted(token: u64) {
    counter!("synccam_trigger_tokens_total").increment(1);
    gauge!("synccam_last_trigger_token").set(token as f64);
}

/// Record the occupancy of a named queue
pub fn record_queue_depth(queue: &str, depth: usize) {
    gauge!("synccam_queue_depth", "queue" => queue.to_string()).set(depth as f64);
}

/// Record one frame retrieved from a device
pub fn record_frame_captured(device_id: &str) {
    counter!(
        "synccam_frames_captured_total",
        "device_id" => device_id.to_string()
    )
    .increment(1);
}

/// Record a commit attempt by a persistence worker
pub fn record_frame_committed(device_id: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "synccam_frames_committed_total",
        "device_id" => device_id.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record the effective capture rate between two consecutive tokens
pub fn record_capture_fps(fps: f64) {
    gauge!("synccam_capture_fps").set(fps);
    histogram!("synccam_capture_fps_hist").record(fps);
}

/// Record the host-timestamp spread across devices for one token
pub fn record_capture_skew_us(skew_us: f64) {
    histogram!("synccam_capture_skew_us").record(skew_us);
}

/// Record a fatal device fault
pub fn record_device_fault(device_id: &str) {
    counter!(
        "synccam_device_faults_total",
        "device_id" => device_id.to_string()
    )
    .increment(1);
}

/// In-memory capture statistics
#[derive(Debug, Clone, Default)]
pub struct CaptureStatsAggregator {
    /// Tokens fully captured on every device
    pub tokens: u64,

    /// Frames retrieved per device
    pub frames: BTreeMap<String, u64>,

    /// Effective rate between consecutive tokens (Hz)
    pub fps: RunningStats,

    /// Cross-device host timestamp spread per token (µs)
    pub skew_us: RunningStats,
}

impl CaptureStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self, device_id: &str) {
        *self.frames.entry(device_id.to_string()).or_insert(0) += 1;
    }

    /// Close out one token: its rate sample (if any) and skew
    pub fn record_token(&mut self, fps: Option<f64>, skew_us: f64) {
        self.tokens += 1;
        if let Some(fps) = fps {
            self.fps.push(fps);
        }
        self.skew_us.push(skew_us);
    }

    pub fn summary(&self) -> CaptureSummary {
        CaptureSummary {
            tokens: self.tokens,
            frames: self.frames.clone(),
            fps: StatsSummary::from(&self.fps),
            skew_us: StatsSummary::from(&self.skew_us),
        }
    }
}

/// Capture statistics summary
#[derive(Debug, Clone, Default)]
pub struct CaptureSummary {
    pub tokens: u64,
    pub frames: BTreeMap<String, u64>,
    pub fps: StatsSummary,
    pub skew_us: StatsSummary,
}

impl std::fmt::Display for CaptureSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Capture Summary ===")?;
        writeln!(f, "Tokens captured: {}", self.tokens)?;
        for (device, count) in &self.frames {
            writeln!(f, "  {device}: {count} frames")?;
        }
        writeln!(f, "Capture rate (Hz): {}", self.fps)?;
        writeln!(f, "Device skew (us): {}", self.skew_us)?;
        Ok(())
    }
}

/// Summary of one RunningStats
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts_frames_and_tokens() {
        let mut agg = CaptureStatsAggregator::new();
        for _ in 0..3 {
            agg.record_frame("cam1");
            agg.record_frame("cam2");
        }
        agg.record_token(None, 120.0);
        agg.record_token(Some(40.0), 80.0);
        agg.record_token(Some(38.0), 100.0);

        let summary = agg.summary();
        assert_eq!(summary.tokens, 3);
        assert_eq!(summary.frames.get("cam1"), Some(&3));
        assert_eq!(summary.fps.count, 2);
        assert!((summary.fps.mean - 39.0).abs() < 1e-10);
        assert!((summary.skew_us.max - 120.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let empty = CaptureStatsAggregator::new().summary();
        let text = empty.to_string();
        assert!(text.contains("Tokens captured: 0"));
        assert!(text.contains("N/A"));
    }

    #[test]
    fn test_recorders_without_exporter() {
        // no recorder installed: calls are no-ops
        record_trigger_emitted(0);
        record_queue_depth("trigger", 3);
        record_frame_captured("cam1");
        record_frame_committed("cam1", false);
        record_capture_fps(40.0);
        record_capture_skew_us(12.5);
        record_device_fault("cam1");
    }
}

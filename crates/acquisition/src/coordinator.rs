//! Acquisition coordinator
//!
//! Consumes trigger tokens and drives every registered camera in lock-step:
//! fire all, retrieve all, then push one frame per device into that
//! device's output queue. A device fault stops the loop; all devices are
//! then told to stop triggering and end acquisition.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use chrono::Utc;
use contracts::{
    AcquisitionConfig, CancellationToken, DeviceId, Frame, PixelFormat, TriggerToken,
};
use device_registry::DeviceRegistry;
use observability::{
    record_capture_fps, record_capture_skew_us, record_device_fault, record_frame_captured,
    record_queue_depth, CaptureStatsAggregator, CaptureSummary,
};
use spsc_queue::{read_with_retry, write_with_retry, QueueConsumer, QueueProducer, ReadOutcome, RetryPolicy};
use tracing::{debug, error, info, instrument, warn};

use crate::downsample::downsample;
use crate::error::{AcquisitionError, Result};

/// Coordinator tuning
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    pub pixel_format: PixelFormat,
    /// Integer downsampling divisor (1 = none)
    pub downsample: u32,
    pub retry: RetryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from(&AcquisitionConfig::default())
    }
}

impl From<&AcquisitionConfig> for CoordinatorConfig {
    fn from(config: &AcquisitionConfig) -> Self {
        Self {
            pixel_format: config.pixel_format,
            downsample: config.downsample,
            retry: config.retry.into(),
        }
    }
}

/// Output side of one device: where its frames go
pub struct DeviceOutput {
    pub storage_prefix: PathBuf,
    pub producer: QueueProducer<Frame>,
}

struct OutputSlot {
    prefix: Arc<Path>,
    label: String,
    producer: QueueProducer<Frame>,
}

/// How the coordinator loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorExit {
    /// Trigger producer finished and its queue drained
    TriggerStreamEnded,
    /// Cancellation observed
    Cancelled,
}

/// Outcome of a clean coordinator run
#[derive(Debug, Clone)]
pub struct AcquisitionReport {
    pub exit: CoordinatorExit,
    /// Tokens for which every device delivered a frame
    pub tokens_processed: u64,
    /// Frames dropped because cancellation interrupted a full-queue retry
    pub frames_dropped: u64,
    /// Devices that failed to shut down cleanly
    pub shutdown_failures: usize,
    pub capture: CaptureSummary,
}

/// Lock-step driver for all registered cameras
pub struct AcquisitionCoordinator {
    registry: DeviceRegistry,
    triggers: QueueConsumer<TriggerToken>,
    outputs: Vec<OutputSlot>,
    config: CoordinatorConfig,
    cancel: CancellationToken,
}

impl AcquisitionCoordinator {
    /// Wire the coordinator.
    ///
    /// `outputs` must hold one entry per registered device, in registry
    /// order.
    pub fn new(
        registry: DeviceRegistry,
        triggers: QueueConsumer<TriggerToken>,
        outputs: Vec<DeviceOutput>,
        config: CoordinatorConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        if registry.is_empty() {
            return Err(AcquisitionError::Wiring {
                message: "no devices registered".to_string(),
            });
        }
        if outputs.len() != registry.len() {
            return Err(AcquisitionError::Wiring {
                message: format!(
                    "{} devices but {} output queues",
                    registry.len(),
                    outputs.len()
                ),
            });
        }

        let outputs = registry
            .ids()
            .into_iter()
            .zip(outputs)
            .map(|(id, output)| OutputSlot {
                prefix: Arc::from(output.storage_prefix),
                label: id.to_string(),
                producer: output.producer,
            })
            .collect();

        Ok(Self {
            registry,
            triggers,
            outputs,
            config,
            cancel,
        })
    }

    /// Run on the current thread until end of stream, cancellation or a
    /// device fault. Any error also sets the cancellation token.
    ///
    /// # Errors
    /// - `Setup` when acquisition could not be started
    /// - `DeviceFault` when a device failed on a token
    #[instrument(
        name = "acquisition_coordinator",
        skip(self),
        fields(devices = self.registry.len(), pixel_format = %self.config.pixel_format)
    )]
    pub fn run(self) -> Result<AcquisitionReport> {
        let cancel = self.cancel.clone();
        let result = self.drive();
        if result.is_err() {
            // the trigger generator may be blocked on a full queue nobody reads
            cancel.cancel();
        }
        result
    }

    fn drive(mut self) -> Result<AcquisitionReport> {
        self.registry.begin_all()?;
        info!(downsample = self.config.downsample, "acquisition started");

        let mut stats = CaptureStatsAggregator::new();
        let mut frames_dropped = 0u64;
        let mut last_token_at: Option<Instant> = None;

        let exit = loop {
            if self.cancel.is_cancelled() {
                break CoordinatorExit::Cancelled;
            }

            let token = match read_with_retry(&mut self.triggers, &self.cancel, self.config.retry)
            {
                ReadOutcome::Item(token) => token,
                ReadOutcome::Cancelled => break CoordinatorExit::Cancelled,
                ReadOutcome::Closed => break CoordinatorExit::TriggerStreamEnded,
            };
            record_queue_depth("trigger", self.triggers.approx_size());

            let frames = match self.capture(token, &mut stats) {
                Ok(frames) => frames,
                Err(fault) => {
                    if let Some((device_id, _)) = fault.fault_location() {
                        record_device_fault(device_id);
                    }
                    error!(error = %fault, "device fault, stopping acquisition");
                    self.registry.end_all();
                    return Err(fault);
                }
            };

            let now = Instant::now();
            let fps = last_token_at
                .map(|last| now.duration_since(last).as_secs_f64())
                .filter(|elapsed| *elapsed > 0.0)
                .map(|elapsed| 1.0 / elapsed);
            last_token_at = Some(now);
            let skew_us = host_skew_us(&frames);

            frames_dropped += self.dispatch(frames);

            stats.record_token(fps, skew_us as f64);
            if let Some(fps) = fps {
                record_capture_fps(fps);
            }
            record_capture_skew_us(skew_us as f64);
            debug!(token = token.index(), fps = ?fps, skew_us, "token captured");
        };

        let shutdown_failures = self.registry.end_all();
        let report = AcquisitionReport {
            exit,
            tokens_processed: stats.tokens,
            frames_dropped,
            shutdown_failures,
            capture: stats.summary(),
        };
        info!(
            exit = ?report.exit,
            tokens = report.tokens_processed,
            frames_dropped = report.frames_dropped,
            "acquisition stopped"
        );
        Ok(report)
    }

    /// Run on a dedicated named thread
    pub fn spawn(self) -> io::Result<JoinHandle<Result<AcquisitionReport>>> {
        thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || self.run())
    }

    /// Fire every triggered device, then retrieve one frame from each device,
    /// in registry order. Free-running devices hand over their next frame.
    fn capture(
        &mut self,
        token: TriggerToken,
        stats: &mut CaptureStatsAggregator,
    ) -> Result<Vec<Frame>> {
        for device in self.registry.triggered_mut() {
            device
                .fire_trigger()
                .map_err(|source| AcquisitionError::device_fault(device.device_id(), token, source))?;
        }

        let devices = self.registry.devices_mut();
        let mut frames = Vec::with_capacity(devices.len());
        for (device, output) in devices.iter_mut().zip(&self.outputs) {
            let device_id: DeviceId = device.device_id().clone();
            let raw = device
                .retrieve_frame(self.config.pixel_format)
                .map_err(|source| AcquisitionError::device_fault(&device_id, token, source))?;
            let host_timestamp_us = Utc::now().timestamp_micros();

            let image = downsample(raw.image, self.config.downsample)
                .map_err(|source| AcquisitionError::device_fault(&device_id, token, source))?;

            record_frame_captured(&device_id);
            stats.record_frame(&device_id);

            frames.push(Frame {
                device_id,
                sequence: token.index(),
                host_timestamp_us,
                device_timestamp: raw.device_timestamp,
                storage_prefix: Arc::clone(&output.prefix),
                image,
            });
        }

        Ok(frames)
    }

    /// Push each frame into its device queue; returns frames dropped on cancel
    fn dispatch(&mut self, frames: Vec<Frame>) -> u64 {
        let mut dropped = 0;
        for (frame, output) in frames.into_iter().zip(self.outputs.iter_mut()) {
            let sequence = frame.sequence;
            match write_with_retry(&mut output.producer, frame, &self.cancel, self.config.retry) {
                Ok(()) => record_queue_depth(&output.label, output.producer.approx_size()),
                Err(_) => {
                    warn!(
                        device_id = %output.label,
                        sequence,
                        "cancelled while output queue was full, frame dropped"
                    );
                    dropped += 1;
                }
            }
        }
        dropped
    }
}

/// Spread of host timestamps across the frames of one token
fn host_skew_us(frames: &[Frame]) -> i64 {
    let min = frames.iter().map(|f| f.host_timestamp_us).min();
    let max = frames.iter().map(|f| f.host_timestamp_us).max();
    match (min, max) {
        (Some(min), Some(max)) => max - min,
        _ => 0,
    }
}

//! RigBlueprint - Config Loader output
//!
//! Describes a complete capture rig: trigger cadence, acquisition policy,
//! storage layout and the ordered list of camera devices.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::{AutoMode, CameraSetting, DeviceId, FrameRateMode, PixelFormat, TriggerMode, TriggerSource};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Full rig configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Trigger generator settings
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Coordinator settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Persistence worker settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Cameras, in the order they are fired and read
    pub devices: Vec<DeviceConfig>,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl RigBlueprint {
    pub fn device(&self, id: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.devices.iter().map(|d| &d.id)
    }
}

/// Trigger generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Period between tokens (ms)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Stop after this many tokens (unbounded when unset)
    #[serde(default)]
    pub max_tokens: Option<u64>,

    /// Trigger queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl TriggerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_tokens: None,
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_interval_ms() -> u64 {
    25
}

fn default_queue_capacity() -> usize {
    100
}

/// Coordinator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Format requested from every device
    #[serde(default)]
    pub pixel_format: PixelFormat,

    /// Integer downsampling divisor applied to each side (1 = none)
    #[serde(default = "default_downsample")]
    pub downsample: u32,

    /// Retry policy for full/empty queues
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::default(),
            downsample: default_downsample(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_downsample() -> u32 {
    2
}

/// Queue retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RetryConfig {
    /// Retry immediately
    #[default]
    Spin,
    /// Sleep between attempts, doubling from `initial_us` up to `max_us`
    Backoff { initial_us: u64, max_us: u64 },
}

/// Persistence worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub sink_type: SinkType,

    /// Root directory for device storage prefixes
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    #[serde(default)]
    pub image_format: ImageFileFormat,

    /// Group files into per-minute directories
    #[serde(default = "default_true")]
    pub minute_buckets: bool,

    /// Worker sleep when its queue is empty (ms)
    #[serde(default = "default_idle_quantum_ms")]
    pub idle_quantum_ms: u64,
}

impl PersistenceConfig {
    pub fn idle_quantum(&self) -> Duration {
        Duration::from_millis(self.idle_quantum_ms)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            sink_type: SinkType::default(),
            base_path: default_base_path(),
            image_format: ImageFileFormat::default(),
            minute_buckets: true,
            idle_quantum_ms: default_idle_quantum_ms(),
        }
    }
}

fn default_base_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

fn default_idle_quantum_ms() -> u64 {
    1
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Encoded image files
    #[default]
    File,
    /// Log frame summaries only
    Log,
}

/// Image file encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFileFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
}

impl ImageFileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Bmp => "bmp",
        }
    }
}

/// One camera in the rig
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique identifier
    pub id: DeviceId,

    /// Hardware serial used to open the device
    pub serial: String,

    /// Directory under `persistence.base_path` for this device's frames
    pub storage_prefix: PathBuf,

    /// Output queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub settings: DeviceSettings,

    /// Knobs for the simulated backend
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Optional camera settings, applied in a fixed order on open
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub trigger_mode: Option<TriggerMode>,
    pub trigger_source: Option<TriggerSource>,
    pub exposure_mode: Option<AutoMode>,
    pub exposure_time_us: Option<f64>,
    pub frame_rate_mode: Option<FrameRateMode>,
    pub frame_rate_hz: Option<f64>,
    pub gain_mode: Option<AutoMode>,
    pub gain_db: Option<f64>,
    pub white_balance_mode: Option<AutoMode>,
}

impl DeviceSettings {
    /// Settings in application order.
    ///
    /// The trigger source is set before the trigger mode; each auto mode is
    /// set before its manual value; white balance comes last. Triggering
    /// defaults to software source with mode on.
    pub fn to_settings(&self) -> Vec<CameraSetting> {
        let mut settings = vec![
            CameraSetting::TriggerSource(self.trigger_source.unwrap_or(TriggerSource::Software)),
            CameraSetting::TriggerMode(self.trigger_mode.unwrap_or(TriggerMode::On)),
        ];

        settings.extend(self.exposure_mode.map(CameraSetting::ExposureMode));
        settings.extend(self.exposure_time_us.map(CameraSetting::ExposureTime));
        settings.extend(self.frame_rate_mode.map(CameraSetting::FrameRateMode));
        settings.extend(self.frame_rate_hz.map(CameraSetting::FrameRate));
        settings.extend(self.gain_mode.map(CameraSetting::GainMode));
        settings.extend(self.gain_db.map(CameraSetting::Gain));
        settings.extend(self.white_balance_mode.map(CameraSetting::WhiteBalanceMode));

        settings
    }

    pub fn is_triggered(&self) -> bool {
        self.trigger_mode.unwrap_or(TriggerMode::On) == TriggerMode::On
    }
}

/// Simulated camera behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_sim_width")]
    pub width: u32,

    #[serde(default = "default_sim_height")]
    pub height: u32,

    /// Added delay per retrieval (ms)
    #[serde(default)]
    pub retrieval_latency_ms: u64,

    /// Report an incomplete frame once this many frames were delivered
    #[serde(default)]
    pub fail_after: Option<u64>,

    /// Report disconnection once this many frames were delivered
    #[serde(default)]
    pub disconnect_after: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: default_sim_width(),
            height: default_sim_height(),
            retrieval_latency_ms: 0,
            fail_after: None,
            disconnect_after: None,
        }
    }
}

fn default_sim_width() -> u32 {
    320
}

fn default_sim_height() -> u32 {
    240
}

/// Metrics exporter settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Prometheus listener port (disabled when unset)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

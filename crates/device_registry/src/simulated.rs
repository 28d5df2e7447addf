//! Simulated camera backend
//!
//! `SimulatedCamera` implements `CameraDevice` without hardware: each
//! retrieval produces a deterministic gradient image stamped with a
//! nanosecond device clock. Triggering follows the hardware rules (software
//! source, trigger mode on, one frame per trigger); with triggering off the
//! camera free-runs. Faults can be injected after a fixed number of frames.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    CameraDevice, CameraSetting, DeviceConfig, DeviceError, DeviceId, ImageData, PixelFormat,
    RawCapture, SimulationConfig, TriggerMode, TriggerSource,
};
use tracing::{debug, trace};

use crate::error::{RegistryError, Result};
use crate::provider::DeviceProvider;

/// Externally observable state of a simulated camera.
///
/// Shared with the provider so tests can inspect a device after it has been
/// moved into the coordinator.
#[derive(Debug, Default)]
pub struct DeviceProbe {
    acquiring: AtomicBool,
    trigger_enabled: AtomicBool,
    triggers: AtomicU64,
    delivered: AtomicU64,
}

impl DeviceProbe {
    pub fn is_acquiring(&self) -> bool {
        self.acquiring.load(Ordering::Acquire)
    }

    pub fn trigger_enabled(&self) -> bool {
        self.trigger_enabled.load(Ordering::Acquire)
    }

    /// Software triggers accepted so far
    pub fn triggers(&self) -> u64 {
        self.triggers.load(Ordering::Acquire)
    }

    /// Frames handed out so far
    pub fn frames_delivered(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }
}

/// In-process camera that behaves like a triggered industrial camera.
pub struct SimulatedCamera {
    device_id: DeviceId,
    serial: String,
    config: SimulationConfig,
    trigger_mode: TriggerMode,
    trigger_source: TriggerSource,
    applied: Vec<CameraSetting>,
    acquiring: bool,
    pending_triggers: u32,
    delivered: u64,
    clock_origin: Instant,
    last_device_ts: u64,
    probe: Arc<DeviceProbe>,
}

impl SimulatedCamera {
    pub fn new(device_id: DeviceId, serial: impl Into<String>, config: SimulationConfig) -> Self {
        Self {
            device_id,
            serial: serial.into(),
            config,
            trigger_mode: TriggerMode::Off,
            trigger_source: TriggerSource::Software,
            applied: Vec::new(),
            acquiring: false,
            pending_triggers: 0,
            delivered: 0,
            clock_origin: Instant::now(),
            last_device_ts: 0,
            probe: Arc::new(DeviceProbe::default()),
        }
    }

    pub fn probe(&self) -> Arc<DeviceProbe> {
        Arc::clone(&self.probe)
    }

    /// Settings accepted so far, in order
    pub fn applied_settings(&self) -> &[CameraSetting] {
        &self.applied
    }

    pub fn is_acquiring(&self) -> bool {
        self.acquiring
    }

    fn check_injected_faults(&self) -> std::result::Result<(), DeviceError> {
        if self
            .config
            .disconnect_after
            .is_some_and(|k| self.delivered >= k)
        {
            return Err(DeviceError::Disconnected);
        }
        if self.config.fail_after.is_some_and(|k| self.delivered >= k) {
            return Err(DeviceError::incomplete(format!(
                "injected fault after {} frames",
                self.delivered
            )));
        }
        Ok(())
    }

    /// Strictly increasing nanosecond clock
    fn next_device_timestamp(&mut self) -> u64 {
        let elapsed = u64::try_from(self.clock_origin.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.last_device_ts = elapsed.max(self.last_device_ts + 1);
        self.last_device_ts
    }

    fn render(&self, format: PixelFormat) -> ImageData {
        let (width, height) = (self.config.width, self.config.height);
        let channels = format.bytes_per_pixel();
        let phase = self.delivered as usize;
        let mut data = Vec::with_capacity(width as usize * height as usize * channels);

        for y in 0..height as usize {
            for x in 0..width as usize {
                let base = x + y + phase;
                match format {
                    PixelFormat::Mono8 => data.push(base as u8),
                    PixelFormat::Rgb8 => {
                        data.extend_from_slice(&[base as u8, (base + 85) as u8, (base + 170) as u8])
                    }
                    PixelFormat::Bgr8 => {
                        data.extend_from_slice(&[(base + 170) as u8, (base + 85) as u8, base as u8])
                    }
                }
            }
        }

        ImageData {
            width,
            height,
            format,
            data: Bytes::from(data),
        }
    }
}

impl CameraDevice for SimulatedCamera {
    fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    fn serial(&self) -> &str {
        &self.serial
    }

    fn configure(&mut self, setting: CameraSetting) -> std::result::Result<(), DeviceError> {
        setting
            .validate()
            .map_err(|e| DeviceError::SettingRejected {
                setting: setting.name().to_string(),
                reason: e.to_string(),
            })?;

        match setting {
            CameraSetting::TriggerSource(source) => {
                if self.trigger_mode == TriggerMode::On {
                    return Err(DeviceError::SettingRejected {
                        setting: setting.name().to_string(),
                        reason: "trigger source must be selected before trigger mode is enabled"
                            .to_string(),
                    });
                }
                self.trigger_source = source;
            }
            CameraSetting::TriggerMode(mode) => {
                self.trigger_mode = mode;
                self.probe
                    .trigger_enabled
                    .store(mode == TriggerMode::On, Ordering::Release);
            }
            _ => {}
        }

        debug!(device_id = %self.device_id, %setting, "setting applied");
        self.applied.push(setting);
        Ok(())
    }

    fn begin_acquisition(&mut self) -> std::result::Result<(), DeviceError> {
        if !self.acquiring {
            self.acquiring = true;
            self.probe.acquiring.store(true, Ordering::Release);
            debug!(device_id = %self.device_id, "acquisition started");
        }
        Ok(())
    }

    fn end_acquisition(&mut self) -> std::result::Result<(), DeviceError> {
        if self.acquiring {
            self.acquiring = false;
            self.pending_triggers = 0;
            self.probe.acquiring.store(false, Ordering::Release);
            debug!(device_id = %self.device_id, delivered = self.delivered, "acquisition ended");
        }
        Ok(())
    }

    fn fire_trigger(&mut self) -> std::result::Result<(), DeviceError> {
        if !self.acquiring {
            return Err(DeviceError::NotAcquiring);
        }
        if self.trigger_mode != TriggerMode::On {
            return Err(DeviceError::trigger_rejected("trigger mode is off"));
        }
        if self.trigger_source != TriggerSource::Software {
            return Err(DeviceError::trigger_rejected(format!(
                "trigger source is {}, not software",
                self.trigger_source
            )));
        }
        if self
            .config
            .disconnect_after
            .is_some_and(|k| self.delivered >= k)
        {
            return Err(DeviceError::Disconnected);
        }

        self.pending_triggers += 1;
        self.probe.triggers.fetch_add(1, Ordering::AcqRel);
        trace!(device_id = %self.device_id, "software trigger");
        Ok(())
    }

    fn retrieve_frame(&mut self, format: PixelFormat) -> std::result::Result<RawCapture, DeviceError> {
        if !self.acquiring {
            return Err(DeviceError::NotAcquiring);
        }
        self.check_injected_faults()?;

        if self.trigger_mode == TriggerMode::On {
            if self.pending_triggers == 0 {
                return Err(DeviceError::Backend(
                    "timed out waiting for a triggered frame".to_string(),
                ));
            }
            self.pending_triggers -= 1;
        }

        if self.config.retrieval_latency_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.retrieval_latency_ms));
        }

        let device_timestamp = self.next_device_timestamp();
        let image = self.render(format);
        self.delivered += 1;
        self.probe.delivered.store(self.delivered, Ordering::Release);

        Ok(RawCapture {
            image,
            device_timestamp,
        })
    }
}

/// Provider that opens a `SimulatedCamera` for every configured device.
#[derive(Debug, Default)]
pub struct SimulatedProvider {
    unavailable: Vec<String>,
    probes: Mutex<HashMap<DeviceId, Arc<DeviceProbe>>>,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make opening the given serial fail
    pub fn with_unavailable(mut self, serial: impl Into<String>) -> Self {
        self.unavailable.push(serial.into());
        self
    }

    /// Probe of the camera opened for `device_id`, if any
    pub fn probe(&self, device_id: &str) -> Option<Arc<DeviceProbe>> {
        self.probes
            .lock()
            .ok()
            .and_then(|probes| probes.get(device_id).cloned())
    }
}

impl DeviceProvider for SimulatedProvider {
    fn name(&self) -> &str {
        "simulated"
    }

    fn open(&self, config: &DeviceConfig) -> Result<Box<dyn CameraDevice>> {
        if self.unavailable.iter().any(|s| *s == config.serial) {
            return Err(RegistryError::open_failed(
                config.id.as_str(),
                &config.serial,
                "no device with this serial",
            ));
        }

        let camera =
            SimulatedCamera::new(config.id.clone(), &config.serial, config.simulation.clone());
        if let Ok(mut probes) = self.probes.lock() {
            probes.insert(config.id.clone(), camera.probe());
        }
        Ok(Box::new(camera))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            width: 4,
            height: 2,
            ..SimulationConfig::default()
        }
    }

    fn triggered_camera(config: SimulationConfig) -> SimulatedCamera {
        let mut cam = SimulatedCamera::new("cam1".into(), "20010001", config);
        cam.configure(CameraSetting::TriggerSource(TriggerSource::Software))
            .unwrap();
        cam.configure(CameraSetting::TriggerMode(TriggerMode::On))
            .unwrap();
        cam.begin_acquisition().unwrap();
        cam
    }

    #[test]
    fn test_trigger_then_retrieve() {
        let mut cam = triggered_camera(small_config());

        cam.fire_trigger().unwrap();
        let first = cam.retrieve_frame(PixelFormat::Mono8).unwrap();
        assert_eq!(first.image.width, 4);
        assert_eq!(first.image.height, 2);
        assert!(first.image.is_complete());
        assert_eq!(&first.image.data[..4], &[0, 1, 2, 3]);

        cam.fire_trigger().unwrap();
        let second = cam.retrieve_frame(PixelFormat::Bgr8).unwrap();
        assert_eq!(second.image.data.len(), 4 * 2 * 3);
        assert!(second.device_timestamp > first.device_timestamp);
    }

    #[test]
    fn test_retrieve_without_trigger_fails() {
        let mut cam = triggered_camera(small_config());
        let err = cam.retrieve_frame(PixelFormat::Mono8).unwrap_err();
        assert!(matches!(err, DeviceError::Backend(_)));
    }

    #[test]
    fn test_free_running_without_trigger_mode() {
        let mut cam = SimulatedCamera::new("cam1".into(), "1", small_config());
        cam.begin_acquisition().unwrap();
        assert!(cam.retrieve_frame(PixelFormat::Rgb8).is_ok());
        assert!(matches!(
            cam.fire_trigger(),
            Err(DeviceError::TriggerRejected { .. })
        ));
    }

    #[test]
    fn test_not_acquiring() {
        let mut cam = SimulatedCamera::new("cam1".into(), "1", small_config());
        assert_eq!(cam.fire_trigger(), Err(DeviceError::NotAcquiring));
        assert!(matches!(
            cam.retrieve_frame(PixelFormat::Mono8),
            Err(DeviceError::NotAcquiring)
        ));
    }

    #[test]
    fn test_source_after_mode_rejected() {
        let mut cam = SimulatedCamera::new("cam1".into(), "1", small_config());
        cam.configure(CameraSetting::TriggerMode(TriggerMode::On))
            .unwrap();
        let err = cam
            .configure(CameraSetting::TriggerSource(TriggerSource::Line0))
            .unwrap_err();
        assert!(matches!(err, DeviceError::SettingRejected { .. }));
    }

    #[test]
    fn test_invalid_numeric_setting_rejected() {
        let mut cam = SimulatedCamera::new("cam1".into(), "1", small_config());
        assert!(cam.configure(CameraSetting::ExposureTime(0.0)).is_err());
        assert!(cam.configure(CameraSetting::ExposureTime(5000.0)).is_ok());
        assert_eq!(cam.applied_settings(), &[CameraSetting::ExposureTime(5000.0)]);
    }

    #[test]
    fn test_fail_after_injects_incomplete_frame() {
        let mut cam = triggered_camera(SimulationConfig {
            fail_after: Some(2),
            ..small_config()
        });
        for _ in 0..2 {
            cam.fire_trigger().unwrap();
            cam.retrieve_frame(PixelFormat::Mono8).unwrap();
        }
        cam.fire_trigger().unwrap();
        let err = cam.retrieve_frame(PixelFormat::Mono8).unwrap_err();
        assert!(matches!(err, DeviceError::IncompleteFrame { .. }));
    }

    #[test]
    fn test_disconnect_after() {
        let mut cam = triggered_camera(SimulationConfig {
            disconnect_after: Some(1),
            ..small_config()
        });
        cam.fire_trigger().unwrap();
        cam.retrieve_frame(PixelFormat::Mono8).unwrap();
        assert_eq!(cam.fire_trigger(), Err(DeviceError::Disconnected));
    }

    #[test]
    fn test_end_clears_pending_triggers() {
        let mut cam = triggered_camera(small_config());
        cam.fire_trigger().unwrap();
        cam.end_acquisition().unwrap();
        cam.begin_acquisition().unwrap();
        assert!(cam.retrieve_frame(PixelFormat::Mono8).is_err());
    }

    #[test]
    fn test_provider_probe_and_unavailable() {
        let provider = SimulatedProvider::new().with_unavailable("missing");
        let config = DeviceConfig {
            id: "cam1".into(),
            serial: "20010001".into(),
            storage_prefix: "imgs/cam1".into(),
            queue_capacity: 10,
            settings: Default::default(),
            simulation: small_config(),
        };

        let mut device = provider.open(&config).unwrap();
        device.begin_acquisition().unwrap();
        let probe = provider.probe("cam1").unwrap();
        assert!(probe.is_acquiring());

        let missing = DeviceConfig {
            serial: "missing".into(),
            ..config
        };
        assert!(matches!(
            provider.open(&missing),
            Err(RegistryError::OpenFailed { .. })
        ));
    }
}

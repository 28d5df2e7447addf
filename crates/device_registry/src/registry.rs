//! DeviceRegistry - owns the open cameras of one rig
//!
//! Built once from the rig config, then moved into the acquisition
//! coordinator. Devices keep config order, which is the order they are
//! triggered and read.

use std::collections::HashSet;

use contracts::{CameraDevice, CameraSetting, DeviceConfig, DeviceId, TriggerMode};
use tracing::{error, info, instrument, warn};

use crate::error::{RegistryError, Result};
use crate::provider::DeviceProvider;

/// Ordered set of open camera devices
pub struct DeviceRegistry {
    devices: Vec<Box<dyn CameraDevice>>,
    /// Parallel to `devices`; false for free-running cameras
    triggered: Vec<bool>,
}

impl DeviceRegistry {
    /// Open and configure every device, in config order.
    ///
    /// Settings are applied in `DeviceSettings::to_settings` order. If any
    /// device fails to open or configure, the devices opened so far are
    /// closed again and the error is returned.
    #[instrument(
        name = "device_registry_open",
        skip(provider, configs),
        fields(provider = provider.name(), device_count = configs.len())
    )]
    pub fn open<P>(provider: &P, configs: &[DeviceConfig]) -> Result<Self>
    where
        P: DeviceProvider + ?Sized,
    {
        let mut registry = Self {
            devices: Vec::with_capacity(configs.len()),
            triggered: Vec::with_capacity(configs.len()),
        };
        let mut seen = HashSet::new();

        for config in configs {
            if !seen.insert(config.id.clone()) {
                registry.rollback();
                return Err(RegistryError::DuplicateDevice {
                    device_id: config.id.to_string(),
                });
            }

            match Self::open_one(provider, config) {
                Ok(device) => {
                    info!(device_id = %config.id, serial = %config.serial, "device opened");
                    registry.devices.push(device);
                    registry.triggered.push(config.settings.is_triggered());
                }
                Err(e) => {
                    warn!(
                        device_id = %config.id,
                        error = %e,
                        "device open failed, closing devices opened so far"
                    );
                    registry.rollback();
                    return Err(e);
                }
            }
        }

        Ok(registry)
    }

    /// Build a registry from devices that are already open and configured.
    ///
    /// Every device is treated as software triggered.
    pub fn from_devices(devices: Vec<Box<dyn CameraDevice>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for device in &devices {
            if !seen.insert(device.device_id().clone()) {
                return Err(RegistryError::DuplicateDevice {
                    device_id: device.device_id().to_string(),
                });
            }
        }
        let triggered = vec![true; devices.len()];
        Ok(Self { devices, triggered })
    }

    fn open_one<P>(provider: &P, config: &DeviceConfig) -> Result<Box<dyn CameraDevice>>
    where
        P: DeviceProvider + ?Sized,
    {
        let mut device = provider.open(config)?;
        for setting in config.settings.to_settings() {
            device
                .configure(setting)
                .map_err(|source| RegistryError::configure_failed(config.id.as_str(), source))?;
        }
        Ok(device)
    }

    /// Start streaming on every device.
    ///
    /// On failure the devices already started are stopped again.
    #[instrument(name = "device_registry_begin_all", skip(self), fields(device_count = self.devices.len()))]
    pub fn begin_all(&mut self) -> Result<()> {
        for index in 0..self.devices.len() {
            if let Err(source) = self.devices[index].begin_acquisition() {
                let device_id = self.devices[index].device_id().to_string();
                error!(device_id = %device_id, error = %source, "begin acquisition failed");
                for started in &mut self.devices[..index] {
                    if let Err(e) = started.end_acquisition() {
                        warn!(device_id = %started.device_id(), error = %e, "end acquisition failed");
                    }
                }
                return Err(RegistryError::BeginFailed { device_id, source });
            }
        }
        info!("acquisition started on all devices");
        Ok(())
    }

    /// Disable triggering and stop streaming on every device.
    ///
    /// Best effort: failures are logged and counted, never returned.
    #[instrument(name = "device_registry_end_all", skip(self), fields(device_count = self.devices.len()))]
    pub fn end_all(&mut self) -> usize {
        let mut failures = 0;
        for device in &mut self.devices {
            if let Err(e) = device.configure(CameraSetting::TriggerMode(TriggerMode::Off)) {
                warn!(device_id = %device.device_id(), error = %e, "disable trigger failed");
                failures += 1;
            }
            if let Err(e) = device.end_acquisition() {
                warn!(device_id = %device.device_id(), error = %e, "end acquisition failed");
                failures += 1;
            }
        }
        info!(failures, "acquisition ended on all devices");
        failures
    }

    fn rollback(&mut self) {
        self.triggered.clear();
        for device in self.devices.drain(..) {
            info!(device_id = %device.device_id(), "closing device");
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Device ids in registry order
    pub fn ids(&self) -> Vec<DeviceId> {
        self.devices.iter().map(|d| d.device_id().clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn CameraDevice> {
        self.devices.iter().map(|d| &**d)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn CameraDevice>> {
        self.devices.iter_mut()
    }

    /// Whether the device at `index` expects a trigger per frame
    pub fn is_triggered(&self, index: usize) -> bool {
        self.triggered.get(index).copied().unwrap_or(false)
    }

    /// Devices that take a software trigger per frame, in registry order.
    /// Free-running devices are skipped.
    pub fn triggered_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn CameraDevice>> {
        self.devices
            .iter_mut()
            .zip(&self.triggered)
            .filter(|(_, triggered)| **triggered)
            .map(|(device, _)| device)
    }

    /// Devices as a slice, in registry order
    pub fn devices_mut(&mut self) -> &mut [Box<dyn CameraDevice>] {
        &mut self.devices
    }
}

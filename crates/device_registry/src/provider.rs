//! Device provider abstraction
//!
//! A provider turns a device entry from the rig config into an open camera.
//! The simulated provider ships with this crate; vendor backends implement
//! the same trait.

use contracts::{CameraDevice, DeviceConfig};

use crate::error::Result;

/// Opens camera devices by serial.
pub trait DeviceProvider: Send + Sync {
    /// Backend name (used for logging)
    fn name(&self) -> &str;

    /// Open the device described by `config`.
    ///
    /// The returned device is opened but not configured and not acquiring.
    fn open(&self, config: &DeviceConfig) -> Result<Box<dyn CameraDevice>>;
}

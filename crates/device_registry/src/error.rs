//! Device registry error types

use contracts::{ContractError, DeviceError};
use thiserror::Error;

/// Device registry specific error
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Provider could not open the device
    #[error("failed to open device '{device_id}' (serial {serial}): {message}")]
    OpenFailed {
        device_id: String,
        serial: String,
        message: String,
    },

    /// Same id registered twice
    #[error("device '{device_id}' is already registered")]
    DuplicateDevice { device_id: String },

    /// Device refused a setting
    #[error("failed to configure device '{device_id}': {source}")]
    ConfigureFailed {
        device_id: String,
        #[source]
        source: DeviceError,
    },

    /// Device could not start streaming
    #[error("failed to begin acquisition on device '{device_id}': {source}")]
    BeginFailed {
        device_id: String,
        #[source]
        source: DeviceError,
    },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl RegistryError {
    pub fn open_failed(
        device_id: impl Into<String>,
        serial: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::OpenFailed {
            device_id: device_id.into(),
            serial: serial.into(),
            message: message.into(),
        }
    }

    pub fn configure_failed(device_id: impl Into<String>, source: DeviceError) -> Self {
        Self::ConfigureFailed {
            device_id: device_id.into(),
            source,
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, RegistryError>;

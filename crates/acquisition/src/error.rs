//! Acquisition error types

use contracts::{DeviceError, DeviceId, TriggerToken};
use device_registry::RegistryError;
use thiserror::Error;

/// Acquisition error
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// A device failed while handling a token; the coordinator stopped
    #[error("device '{device_id}' faulted on token {token}: {source}")]
    DeviceFault {
        device_id: DeviceId,
        token: TriggerToken,
        #[source]
        source: DeviceError,
    },

    /// Devices could not be started
    #[error(transparent)]
    Setup(#[from] RegistryError),

    /// Queues and devices do not line up
    #[error("coordinator wiring error: {message}")]
    Wiring { message: String },
}

impl AcquisitionError {
    pub fn device_fault(device_id: &DeviceId, token: TriggerToken, source: DeviceError) -> Self {
        Self::DeviceFault {
            device_id: device_id.clone(),
            token,
            source,
        }
    }

    /// Faulting device and token, if this is a device fault
    pub fn fault_location(&self) -> Option<(&DeviceId, TriggerToken)> {
        match self {
            Self::DeviceFault {
                device_id, token, ..
            } => Some((device_id, *token)),
            _ => None,
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, AcquisitionError>;

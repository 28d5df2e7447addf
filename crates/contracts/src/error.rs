//! Layered error definitions
//!
//! Categorized by source: config / argument / device / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Unsupported value for a closed option domain
    #[error("invalid argument: {name} = '{value}', expected one of: {expected}")]
    InvalidArgument {
        name: String,
        value: String,
        expected: String,
    },

    // ===== Device Errors =====
    /// Device fault surfaced through the contract layer
    #[error("device '{device_id}' fault: {source}")]
    Device {
        device_id: String,
        #[source]
        source: DeviceError,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid argument error for a closed option domain
    pub fn invalid_argument(
        name: impl Into<String>,
        value: impl Into<String>,
        expected: &[&str],
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            expected: expected.join(", "),
        }
    }

    /// Wrap a device fault with the id of the device that raised it
    pub fn device(device_id: impl Into<String>, source: DeviceError) -> Self {
        Self::Device {
            device_id: device_id.into(),
            source,
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

/// Fault reported by a camera device.
///
/// Every variant is fatal to the acquisition loop that observes it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Device is no longer reachable
    #[error("device disconnected")]
    Disconnected,

    /// Retrieved image was incomplete or corrupt
    #[error("incomplete frame: {reason}")]
    IncompleteFrame { reason: String },

    /// Device refused the capture command
    #[error("trigger rejected: {reason}")]
    TriggerRejected { reason: String },

    /// Operation requires a running acquisition
    #[error("acquisition not started")]
    NotAcquiring,

    /// Setting not accepted by the device
    #[error("setting rejected: {setting}: {reason}")]
    SettingRejected { setting: String, reason: String },

    /// Backend-specific failure
    #[error("backend error: {0}")]
    Backend(String),
}

impl DeviceError {
    /// Create an incomplete frame fault
    pub fn incomplete(reason: impl Into<String>) -> Self {
        Self::IncompleteFrame {
            reason: reason.into(),
        }
    }

    /// Create a trigger rejection fault
    pub fn trigger_rejected(reason: impl Into<String>) -> Self {
        Self::TriggerRejected {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_lists_domain() {
        let err = ContractError::invalid_argument("pixel_format", "yuv", &["bgr", "rgb", "gray"]);
        let msg = err.to_string();
        assert!(msg.contains("pixel_format = 'yuv'"), "got: {msg}");
        assert!(msg.contains("bgr, rgb, gray"), "got: {msg}");
    }

    #[test]
    fn test_device_error_wrapping() {
        let err = ContractError::device("cam1", DeviceError::Disconnected);
        assert_eq!(err.to_string(), "device 'cam1' fault: device disconnected");
    }
}

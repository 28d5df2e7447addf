//! CameraDevice trait - narrow capability contract for one camera
//!
//! Configuration goes through a single `configure(CameraSetting)` entry
//! point over closed option domains. Each domain parses from its snake_case
//! name and rejects anything else with [`ContractError::InvalidArgument`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ContractError, DeviceError, DeviceId, PixelFormat, RawCapture};

/// Declare a closed option domain: the enum, its name table, `FromStr` and
/// `Display`.
macro_rules! closed_domain {
    (
        $(#[$meta:meta])*
        $name:ident, $arg:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            pub const NAMES: &'static [&'static str] = &[$($text),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ContractError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    other => Err(ContractError::invalid_argument($arg, other, Self::NAMES)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_domain! {
    /// Whether the camera waits for a trigger before each exposure.
    TriggerMode, "trigger_mode" {
        Off => "off",
        On => "on",
    }
}

closed_domain! {
    /// Where the trigger signal comes from.
    TriggerSource, "trigger_source" {
        Software => "software",
        Line0 => "line0",
        Line1 => "line1",
        Line2 => "line2",
        Line3 => "line3",
    }
}

closed_domain! {
    /// Automatic control mode shared by exposure, gain and white balance.
    AutoMode, "auto_mode" {
        Off => "off",
        Once => "once",
        Continuous => "continuous",
    }
}

closed_domain! {
    /// Acquisition frame-rate control.
    FrameRateMode, "frame_rate_mode" {
        Auto => "auto",
        Manual => "manual",
    }
}

/// One configurable camera option.
///
/// Numeric values are checked by [`CameraSetting::validate`] before they
/// reach a device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraSetting {
    TriggerMode(TriggerMode),
    TriggerSource(TriggerSource),
    ExposureMode(AutoMode),
    /// Exposure time in microseconds
    ExposureTime(f64),
    FrameRateMode(FrameRateMode),
    /// Acquisition frame rate in Hz
    FrameRate(f64),
    GainMode(AutoMode),
    /// Gain in dB
    Gain(f64),
    WhiteBalanceMode(AutoMode),
}

impl CameraSetting {
    /// Option name as it appears in configuration files
    pub fn name(&self) -> &'static str {
        match self {
            Self::TriggerMode(_) => "trigger_mode",
            Self::TriggerSource(_) => "trigger_source",
            Self::ExposureMode(_) => "exposure_mode",
            Self::ExposureTime(_) => "exposure_time_us",
            Self::FrameRateMode(_) => "frame_rate_mode",
            Self::FrameRate(_) => "frame_rate_hz",
            Self::GainMode(_) => "gain_mode",
            Self::Gain(_) => "gain_db",
            Self::WhiteBalanceMode(_) => "white_balance_mode",
        }
    }

    /// Reject out-of-range numeric values.
    ///
    /// Exposure time and frame rate must be finite and positive; gain must be
    /// finite and non-negative.
    pub fn validate(&self) -> Result<(), ContractError> {
        let ok = match *self {
            Self::ExposureTime(v) | Self::FrameRate(v) => v.is_finite() && v > 0.0,
            Self::Gain(v) => v.is_finite() && v >= 0.0,
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(ContractError::config_validation(
                self.name(),
                format!("out of range: {self}"),
            ))
        }
    }
}

impl fmt::Display for CameraSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TriggerMode(v) => write!(f, "trigger_mode={v}"),
            Self::TriggerSource(v) => write!(f, "trigger_source={v}"),
            Self::ExposureMode(v) => write!(f, "exposure_mode={v}"),
            Self::ExposureTime(v) => write!(f, "exposure_time_us={v}"),
            Self::FrameRateMode(v) => write!(f, "frame_rate_mode={v}"),
            Self::FrameRate(v) => write!(f, "frame_rate_hz={v}"),
            Self::GainMode(v) => write!(f, "gain_mode={v}"),
            Self::Gain(v) => write!(f, "gain_db={v}"),
            Self::WhiteBalanceMode(v) => write!(f, "white_balance_mode={v}"),
        }
    }
}

/// A single physical (or simulated) camera.
///
/// The acquisition coordinator is the only caller; it drives every device
/// from one thread, so implementations need `Send` but not `Sync`.
pub trait CameraDevice: Send {
    /// Registry-assigned identifier
    fn device_id(&self) -> &DeviceId;

    /// Hardware serial number
    fn serial(&self) -> &str;

    /// Apply one setting.
    ///
    /// # Errors
    /// `DeviceError::SettingRejected` when the device refuses the value
    fn configure(&mut self, setting: CameraSetting) -> Result<(), DeviceError>;

    /// Start streaming. Idempotent.
    fn begin_acquisition(&mut self) -> Result<(), DeviceError>;

    /// Stop streaming. Idempotent.
    fn end_acquisition(&mut self) -> Result<(), DeviceError>;

    /// Issue a software trigger.
    fn fire_trigger(&mut self) -> Result<(), DeviceError>;

    /// Block until the next frame is available and return it in `format`.
    fn retrieve_frame(&mut self, format: PixelFormat) -> Result<RawCapture, DeviceError>;
}

impl CameraDevice for Box<dyn CameraDevice> {
    fn device_id(&self) -> &DeviceId {
        (**self).device_id()
    }

    fn serial(&self) -> &str {
        (**self).serial()
    }

    fn configure(&mut self, setting: CameraSetting) -> Result<(), DeviceError> {
        (**self).configure(setting)
    }

    fn begin_acquisition(&mut self) -> Result<(), DeviceError> {
        (**self).begin_acquisition()
    }

    fn end_acquisition(&mut self) -> Result<(), DeviceError> {
        (**self).end_acquisition()
    }

    fn fire_trigger(&mut self) -> Result<(), DeviceError> {
        (**self).fire_trigger()
    }

    fn retrieve_frame(&mut self, format: PixelFormat) -> Result<RawCapture, DeviceError> {
        (**self).retrieve_frame(format)
    }
}

//! Frame - acquisition output, persistence input
//!
//! Captured image payloads, the tokens that trigger them, and the
//! timestamped frame handed from the coordinator to a persistence worker.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::{ContractError, DeviceId};

/// Capture event index emitted by the trigger generator.
///
/// Tokens start at 0 and increase by one. The frames captured for a token
/// carry the token value as their sequence index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TriggerToken(u64);

impl TriggerToken {
    pub const FIRST: TriggerToken = TriggerToken(0);

    pub fn new(index: u64) -> Self {
        Self(index)
    }

    pub fn index(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TriggerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pixel formats a device can deliver.
///
/// Closed set: text outside `bgr`, `rgb`, `gray` is rejected with
/// [`ContractError::InvalidArgument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    #[serde(rename = "bgr")]
    Bgr8,
    #[serde(rename = "rgb")]
    Rgb8,
    #[default]
    #[serde(rename = "gray")]
    Mono8,
}

impl PixelFormat {
    pub const NAMES: [&'static str; 3] = ["bgr", "rgb", "gray"];

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgr8 | Self::Rgb8 => 3,
            Self::Mono8 => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bgr8 => "bgr",
            Self::Rgb8 => "rgb",
            Self::Mono8 => "gray",
        }
    }
}

impl FromStr for PixelFormat {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bgr" => Ok(Self::Bgr8),
            "rgb" => Ok(Self::Rgb8),
            "gray" => Ok(Self::Mono8),
            other => Err(ContractError::invalid_argument(
                "pixel_format",
                other,
                &Self::NAMES,
            )),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Packed image buffer, rows without padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Bytes,
}

impl ImageData {
    /// Byte length implied by dimensions and format
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// True when the buffer length matches the dimensions
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.expected_len()
    }
}

/// What a device hands back from one retrieval.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub image: ImageData,
    /// Hardware clock at exposure, in device ticks
    pub device_timestamp: u64,
}

/// One captured, timestamped image.
///
/// Owned by exactly one queue slot at a time; moved into the persistence
/// worker on read and dropped after commit.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Source device
    pub device_id: DeviceId,

    /// Sequence index, equal to the trigger token that caused the capture
    pub sequence: u64,

    /// Wall clock at retrieval completion (µs since Unix epoch)
    pub host_timestamp_us: i64,

    /// Hardware clock at exposure
    pub device_timestamp: u64,

    /// Storage path prefix of the source device
    pub storage_prefix: Arc<Path>,

    /// Image payload
    pub image: ImageData,
}

impl Frame {
    /// Microseconds per minute-bucket directory
    pub const MINUTE_US: i64 = 60_000_000;

    /// Minute bucket the frame falls into (`floor(host_ts / 60_000_000)`)
    pub fn minute_bucket(&self) -> i64 {
        self.host_timestamp_us.div_euclid(Self::MINUTE_US)
    }
}

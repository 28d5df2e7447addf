//! # Acquisition
//!
//! Trigger generation and lock-step multi-camera capture.
//!
//! Responsibilities:
//! - Emit trigger tokens at a fixed interval into the trigger queue
//! - Fire and retrieve every camera once per token
//! - Downsample frames and hand them to per-device output queues
//! - Stop all devices on the first device fault

pub mod coordinator;
pub mod downsample;
pub mod error;
pub mod trigger;

pub use coordinator::{
    AcquisitionCoordinator, AcquisitionReport, CoordinatorConfig, CoordinatorExit, DeviceOutput,
};
pub use downsample::{downsample, target_size};
pub use error::{AcquisitionError, Result};
pub use trigger::{TriggerGenerator, TriggerReport};

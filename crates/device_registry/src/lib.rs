//! # Device Registry
//!
//! Camera device management.
//!
//! Responsibilities:
//! - Open every camera listed in a `RigBlueprint` through a `DeviceProvider`
//! - Apply device settings in a fixed order
//! - Start and stop acquisition across the rig
//! - Provide a simulated camera backend with fault injection

pub mod error;
pub mod provider;
pub mod registry;
pub mod simulated;

pub use error::{RegistryError, Result};
pub use provider::DeviceProvider;
pub use registry::DeviceRegistry;
pub use simulated::{DeviceProbe, SimulatedCamera, SimulatedProvider};

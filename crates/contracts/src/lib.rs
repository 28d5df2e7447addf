//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the capture pipeline:
//! frame and token types, the camera capability, the storage sink, the
//! cancellation token and the rig configuration model.
//! Business crates depend on this crate only, never the other way round.
//!
//! ## Time Model
//! - Host timestamps are wall-clock microseconds since the Unix epoch,
//!   sampled when frame retrieval completes
//! - Device timestamps are opaque hardware clock ticks reported by the camera
//! - A frame's `sequence` equals the trigger token that caused it

mod blueprint;
mod camera;
mod cancellation;
mod device_id;
mod error;
mod frame;
mod sink;

pub use blueprint::*;
pub use camera::*;
pub use cancellation::CancellationToken;
pub use device_id::DeviceId;
pub use error::*;
pub use frame::*;
pub use sink::FrameSink;

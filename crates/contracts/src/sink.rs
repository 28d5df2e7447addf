//! FrameSink trait - persistence output interface

use crate::{ContractError, Frame};

/// Storage backend for committed frames.
///
/// Each persistence worker owns one sink and calls it from its own thread.
pub trait FrameSink: Send {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Encode and store one frame
    ///
    /// # Errors
    /// `ContractError::SinkWrite` with the failing path or reason
    fn commit(&mut self, frame: &Frame) -> Result<(), ContractError>;

    /// Flush buffered output (if any)
    fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    fn close(&mut self) -> Result<(), ContractError>;
}

impl FrameSink for Box<dyn FrameSink> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn commit(&mut self, frame: &Frame) -> Result<(), ContractError> {
        (**self).commit(frame)
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<(), ContractError> {
        (**self).close()
    }
}

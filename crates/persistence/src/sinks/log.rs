//! LogSink - logs frame summaries via tracing

use contracts::{ContractError, Frame, FrameSink};
use tracing::{info, instrument};

/// Sink that only logs frame summaries (dry runs, debugging)
pub struct LogSink {
    name: String,
    frames: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: 0,
        }
    }

    /// Frames seen so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn commit(&mut self, frame: &Frame) -> Result<(), ContractError> {
        self.frames += 1;
        info!(
            sink = %self.name,
            device_id = %frame.device_id,
            sequence = frame.sequence,
            host_timestamp_us = frame.host_timestamp_us,
            device_timestamp = frame.device_timestamp,
            width = frame.image.width,
            height = frame.image.height,
            "frame received"
        );
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, frames = self.frames, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{ImageData, PixelFormat};
    use std::path::Path;
    use std::sync::Arc;

    #[test]
    fn test_log_sink_counts_frames() {
        let mut sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");

        let frame = Frame {
            device_id: "cam1".into(),
            sequence: 4,
            host_timestamp_us: 1,
            device_timestamp: 2,
            storage_prefix: Arc::from(Path::new("cam1")),
            image: ImageData {
                width: 1,
                height: 1,
                format: PixelFormat::Mono8,
                data: Bytes::from_static(&[9]),
            },
        };

        sink.commit(&frame).unwrap();
        sink.commit(&frame).unwrap();
        sink.close().unwrap();
        assert_eq!(sink.frames(), 2);
    }
}

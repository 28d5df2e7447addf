//! Sink implementations
//!
//! Contains FileSink and LogSink.

mod file;
mod log;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;

use contracts::{FrameSink, PersistenceConfig, SinkType};
use tracing::instrument;

use crate::error::{PersistenceError, Result};

/// Build the sink selected by `config.sink_type`
#[instrument(
    name = "persistence_create_sink",
    skip(config),
    fields(sink_type = ?config.sink_type)
)]
pub fn create_sink(name: &str, config: &PersistenceConfig) -> Result<Box<dyn FrameSink>> {
    match config.sink_type {
        SinkType::Log => Ok(Box::new(LogSink::new(name))),
        SinkType::File => {
            let sink = FileSink::new(name, FileSinkConfig::from(config))
                .map_err(|e| PersistenceError::sink_creation(name, e.to_string()))?;
            Ok(Box::new(sink))
        }
    }
}

//! Error types for pipeline orchestration.

use acquisition::AcquisitionError;
use contracts::ContractError;
use device_registry::RegistryError;
use persistence::PersistenceError;
use thiserror::Error;

use crate::pipeline::PipelineStats;

/// Pipeline-level error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration rejected
    #[error("invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// Devices could not be opened
    #[error("device setup failed: {0}")]
    Devices(#[from] RegistryError),

    /// Sinks or workers could not be created
    #[error("persistence setup failed: {0}")]
    Persistence(#[from] PersistenceError),

    /// Acquisition ended with an error; all threads have joined
    #[error("acquisition failed: {source}")]
    Acquisition {
        source: AcquisitionError,
        /// Totals gathered up to the failure
        stats: Box<PipelineStats>,
    },

    /// A pipeline thread could not be started
    #[error("failed to spawn {component} thread: {source}")]
    Spawn {
        component: &'static str,
        source: std::io::Error,
    },

    /// A pipeline thread panicked
    #[error("{component} thread panicked")]
    ThreadPanicked { component: &'static str },
}

impl CliError {
    pub fn spawn(component: &'static str, source: std::io::Error) -> Self {
        Self::Spawn { component, source }
    }

    /// Partial statistics of a run that ended on an acquisition error
    pub fn stats(&self) -> Option<&PipelineStats> {
        match self {
            Self::Acquisition { stats, .. } => Some(stats),
            _ => None,
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CliError>;

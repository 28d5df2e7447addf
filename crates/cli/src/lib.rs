//! # synccam
//!
//! Pipeline orchestration for the `synccam` binary, exposed as a library so
//! the pipeline can be driven from tests.

pub mod error;
pub mod pipeline;

pub use error::{CliError, Result};
pub use pipeline::{Pipeline, PipelineStats};

//! Conversion orchestration.
//!
//! This module turns a batch of uploads into one downloadable result:
//!
//! - [`ConversionJob`] / [`ConversionBatch`] -- per-file scratch artifacts in
//!   upload order
//! - [`ConversionOrchestrator`] -- sequential engine calls with fail-fast
//!   abort, then single-file or zip packaging
//! - [`OutputDescriptor`] / [`OutputStream`] -- the streamed result, which
//!   deletes every scratch file of the batch when it terminates

mod job;
mod orchestrator;
mod output;

pub use job::{ConversionBatch, ConversionJob};
pub use orchestrator::ConversionOrchestrator;
pub use output::{OutputDescriptor, OutputStream};

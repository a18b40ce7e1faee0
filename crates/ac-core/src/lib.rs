//! ac-core: shared types, errors, and format resolution.
//!
//! This crate is the foundational dependency of the alwaysconvert crates,
//! providing the unified error type, the uploaded-file model, typed request
//! identifiers, and the target-format / MIME rules.

pub mod error;
pub mod format;
pub mod ids;
pub mod upload;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use format::{FormatMode, FormatPolicy, TargetFormat};
pub use ids::RequestId;
pub use upload::UploadedFile;

//! # ac-av
//!
//! Temporary storage, external engine invocation, and packaging for the
//! alwaysconvert orchestrator.
//!
//! This crate provides:
//!
//! - **Scratch storage** ([`ScratchDir`], [`TempArtifact`]) -- collision-free
//!   temp paths under an injected root, exclusive writes, and best-effort
//!   deletion tied to ownership.
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache the ffmpeg path.
//! - **Command execution** ([`ToolCommand`]) -- async builder with optional
//!   timeout for running external processes.
//! - **Conversion** ([`Converter`], [`FfmpegConverter`]) -- the engine seam.
//! - **Archiving** ([`archive`]) -- stream converted files into one zip.

pub mod archive;
pub mod command;
pub mod convert;
pub mod scratch;
pub mod tools;

// ---- Re-exports for convenience ----

pub use archive::{build_archive, build_archive_async};
pub use command::{ToolCommand, ToolOutput};
pub use convert::{Converter, FfmpegConverter};
pub use scratch::{discard, ScratchDir, TempArtifact};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry, ToolsConfig};

//! alwaysconvert - batch file conversion over HTTP
//!
//! This library crate exposes the server and orchestration layers for
//! integration testing.

pub mod config;
pub mod conversion;
pub mod server;

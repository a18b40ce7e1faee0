//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which wires a [`ConversionOrchestrator`] to a
//! private scratch directory and a [`StubConverter`] that copies input to
//! output instead of running ffmpeg. The [`TestHarness::with_server`]
//! constructor starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ac_av::{Converter, ScratchDir};
use ac_core::{Error, FormatMode, TargetFormat};
use alwaysconvert::config::Config;
use alwaysconvert::conversion::ConversionOrchestrator;
use alwaysconvert::server::{create_router, AppContext};
use async_trait::async_trait;
use tempfile::TempDir;

/// Converter that copies bytes through unchanged.
///
/// Fails any input whose file name ends with `fail_on`.
#[derive(Debug, Default)]
pub struct StubConverter {
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl StubConverter {
    pub fn failing_on(name: &str) -> Self {
        Self {
            fail_on: Some(name.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Converter for StubConverter {
    async fn convert(&self, input: &Path, output: &Path, _format: &TargetFormat) -> ac_core::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if let Some(fail_on) = &self.fail_on {
            if name.ends_with(fail_on.as_str()) {
                return Err(Error::engine("stub", format!("refusing to convert {name}")));
            }
        }

        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

/// Test harness wrapping an orchestrator backed by a temporary scratch root.
pub struct TestHarness {
    pub orchestrator: ConversionOrchestrator,
    pub converter: Arc<StubConverter>,
    pub config: Config,
    scratch: TempDir,
}

impl TestHarness {
    /// Harness in explicit format mode with a converter that never fails.
    pub fn new() -> Self {
        Self::with_converter(Config::default(), StubConverter::default())
    }

    /// Harness in inferred format mode.
    pub fn inferred() -> Self {
        let mut config = Config::default();
        config.conversion.format_mode = FormatMode::Inferred;
        Self::with_converter(config, StubConverter::default())
    }

    pub fn with_converter(mut config: Config, converter: StubConverter) -> Self {
        let scratch = tempfile::tempdir().expect("failed to create scratch dir");
        config.scratch.dir = Some(scratch.path().to_path_buf());

        let converter = Arc::new(converter);
        let orchestrator =
            ConversionOrchestrator::new(ScratchDir::new(scratch.path()), converter.clone());

        Self {
            orchestrator,
            converter,
            config,
            scratch,
        }
    }

    pub fn scratch_root(&self) -> &Path {
        self.scratch.path()
    }

    /// Names of every file currently under the scratch root.
    pub fn scratch_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.scratch.path())
            .expect("failed to list scratch dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server(self) -> (Self, SocketAddr) {
        let ctx = AppContext {
            config: Arc::new(self.config.clone()),
            orchestrator: self.orchestrator.clone(),
        };
        let app = create_router(ctx);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }
}

/// Poll `check` until it holds or a second has passed.
///
/// Response bodies are released by the server task after the client has
/// finished reading, so scratch cleanup trails the last byte slightly.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    check()
}

//! The conversion engine seam.
//!
//! [`Converter`] is what the orchestrator calls once per job. The production
//! implementation, [`FfmpegConverter`], runs one ffmpeg process per call and
//! lets ffmpeg pick the muxer and codecs from the output extension.

use std::path::Path;
use std::sync::Arc;

use ac_core::TargetFormat;
use async_trait::async_trait;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Converts one input file into `output` in the given format.
///
/// Implementations resolve once the engine signals success and reject with
/// [`ac_core::Error::ConversionEngine`] otherwise. They never retry.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        format: &TargetFormat,
    ) -> ac_core::Result<()>;
}

/// [`Converter`] backed by the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    tools: Arc<ToolRegistry>,
}

impl FfmpegConverter {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        format: &TargetFormat,
    ) -> ac_core::Result<()> {
        let ffmpeg = self.tools.require("ffmpeg")?;

        tracing::info!(
            "convert {} -> {} ({format})",
            input.display(),
            output.display()
        );

        let mut cmd = ToolCommand::new(ffmpeg.path.clone());
        cmd.timeout(ffmpeg.timeout);
        cmd.args(["-hide_banner", "-nostdin", "-y", "-i"]);
        cmd.arg(input.to_string_lossy());
        cmd.arg(output.to_string_lossy());
        cmd.execute().await?;

        Ok(())
    }
}

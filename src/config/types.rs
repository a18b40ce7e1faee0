use ac_av::{ScratchDir, ToolsConfig};
use ac_core::FormatMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub scratch: ScratchConfig,

    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body, in MiB
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_max_upload_mb() -> usize {
    512
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScratchConfig {
    /// Directory for temporary artifacts (default: platform temp dir)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl ScratchConfig {
    pub fn scratch_dir(&self) -> ScratchDir {
        match &self.dir {
            Some(dir) => ScratchDir::new(dir),
            None => ScratchDir::system(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConversionConfig {
    /// `explicit`: the request names the target format.
    /// `inferred`: the format follows each file's content type.
    #[serde(default)]
    pub format_mode: FormatMode,
}

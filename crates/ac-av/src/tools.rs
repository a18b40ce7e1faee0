//! External tool detection.
//!
//! The [`ToolRegistry`] discovers and caches the location of the conversion
//! engine (ffmpeg) and provides lookup methods for the rest of the crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &["ffmpeg"];

/// User-facing tool settings, embedded in the application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Explicit ffmpeg location; `PATH` is searched when unset or missing.
    pub ffmpeg_path: Option<PathBuf>,
    /// Upper bound on a single conversion. Unset means no limit.
    pub ffmpeg_timeout_secs: Option<u64>,
}

/// Configuration for a single discovered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Human-readable tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
    /// Maximum execution time before the tool is killed, if any.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_duration_secs")]
    pub timeout: Option<Duration>,
}

/// Serde helpers to (de)serialize `Option<Duration>` as whole seconds.
mod opt_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// A configured path is used when it exists; otherwise [`which::which`]
    /// locates the tool. Tools that are not found are omitted from the
    /// registry and surface as errors from [`ToolRegistry::require`].
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                "ffmpeg" => tools_config.ffmpeg_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!(
                        "configured {name} path {} does not exist; searching PATH",
                        p.display()
                    );
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                tracing::debug!("found {name} at {}", path.display());
                tools.insert(
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                        timeout: tools_config.ffmpeg_timeout_secs.map(Duration::from_secs),
                    },
                );
            }
        }

        Self { tools }
    }

    /// Build a registry around an explicit executable, skipping discovery.
    pub fn with_tool(name: &str, path: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        let mut tools = HashMap::new();
        tools.insert(
            name.to_string(),
            ToolConfig {
                name: name.to_string(),
                path: path.into(),
                timeout,
            },
        );
        Self { tools }
    }

    /// Return the [`ToolConfig`] for the given tool, or an engine error if the
    /// tool was not found during discovery.
    pub fn require(&self, name: &str) -> ac_core::Result<&ToolConfig> {
        self.tools.get(name).ok_or_else(|| {
            ac_core::Error::engine(name, format!("{name} not found; is it installed and in PATH?"))
        })
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(cfg) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(name, &cfg.path),
                    path: Some(cfg.path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(name: &str, path: &Path) -> Option<String> {
    let version_arg = match name {
        "ffmpeg" => "-version",
        _ => "--version",
    };

    let output = std::process::Command::new(path)
        .arg(version_arg)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_with_default_config() {
        let registry = ToolRegistry::discover(&ToolsConfig::default());
        // ffmpeg may be absent in CI; the call itself must not panic.
        let _ = registry.check_all();
    }

    #[test]
    fn require_missing_tool_returns_engine_error() {
        let registry = ToolRegistry::default();
        let err = registry.require("ffmpeg").unwrap_err();
        assert!(matches!(err, ac_core::Error::ConversionEngine { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn check_all_reports_missing_tool() {
        let infos = ToolRegistry::default().check_all();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "ffmpeg");
        assert!(!infos[0].available);
        assert!(infos[0].path.is_none());
    }

    #[test]
    fn configured_timeout_is_carried() {
        let registry =
            ToolRegistry::with_tool("ffmpeg", "/usr/bin/ffmpeg", Some(Duration::from_secs(30)));
        let cfg = registry.require("ffmpeg").unwrap();
        assert_eq!(cfg.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn tool_config_serialization() {
        let cfg = ToolConfig {
            name: "ffmpeg".to_string(),
            path: PathBuf::from("/usr/bin/ffmpeg"),
            timeout: None,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("timeout"));
        let back: ToolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "ffmpeg");
        assert_eq!(back.timeout, None);
    }
}

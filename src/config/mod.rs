mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./alwaysconvert.toml",
        "~/.config/alwaysconvert/config.toml",
        "/etc/alwaysconvert/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

/// `PORT` from the environment wins over the file.
fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(port) = std::env::var("PORT") {
        config.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("Invalid PORT value: {port:?}"))?;
    }
    Ok(())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.server.max_upload_mb == 0 {
        anyhow::bail!("server.max_upload_mb must be greater than 0");
    }

    if let Some(dir) = &config.scratch.dir {
        if dir.exists() && !dir.is_dir() {
            anyhow::bail!("Scratch path is not a directory: {:?}", dir);
        }
    }

    if let Some(path) = &config.tools.ffmpeg_path {
        if !path.exists() {
            tracing::warn!("Configured ffmpeg path does not exist: {:?}", path);
        }
    }

    if config.tools.ffmpeg_timeout_secs == Some(0) {
        anyhow::bail!("tools.ffmpeg_timeout_secs must be greater than 0 when set");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_core::FormatMode;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.max_upload_bytes(), 512 * 1024 * 1024);
        assert_eq!(config.conversion.format_mode, FormatMode::Explicit);
        assert!(config.scratch.dir.is_none());
        assert!(config.tools.ffmpeg_timeout_secs.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000
            max_upload_mb = 64

            [scratch]
            dir = "/var/tmp/alwaysconvert"

            [conversion]
            format_mode = "inferred"

            [tools]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            ffmpeg_timeout_secs = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.max_upload_mb, 64);
        assert_eq!(
            config.scratch.scratch_dir().root(),
            Path::new("/var/tmp/alwaysconvert")
        );
        assert_eq!(config.conversion.format_mode, FormatMode::Inferred);
        assert_eq!(config.tools.ffmpeg_timeout_secs, Some(600));
    }

    #[test]
    fn empty_file_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.scratch.scratch_dir().root(), std::env::temp_dir());
    }

    #[test]
    fn rejects_unknown_format_mode() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[conversion]\nformat_mode = \"guess\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn validation_rejects_zero_limits() {
        let mut config = Config::default();
        config.server.max_upload_mb = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.tools.ffmpeg_timeout_secs = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn load_config_reports_parse_errors() {
        let file = write_config("[server\nport = 1");
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/alwaysconvert.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}

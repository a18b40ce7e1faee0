//! Target format resolution and MIME lookup.
//!
//! A batch resolves its per-file target format through a [`FormatPolicy`]:
//! either one caller-supplied format for every file, or a format inferred
//! from each upload's declared content type. The MIME table maps output
//! extensions back to the `Content-Type` the boundary sends.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Longest accepted target format string.
const MAX_FORMAT_LEN: usize = 16;

/// Extension used when a path carries none, and the passthrough target for
/// content types with no inference rule.
pub const FALLBACK_EXTENSION: &str = "bin";

/// MIME type for anything missing from [`MIME_TABLE`].
pub const OCTET_STREAM: &str = "application/octet-stream";

/// MIME type of the batch archive.
pub const ZIP_MIME: &str = "application/zip";

const MIME_TABLE: &[(&str, &str)] = &[
    ("webp", "image/webp"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("webm", "video/webm"),
    ("zip", ZIP_MIME),
];

/// Upload-only extensions missing from [`MIME_TABLE`], used to guess the
/// content type of local files.
const UPLOAD_MIME_TABLE: &[(&str, &str)] = &[
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("heic", "image/heic"),
    ("avif", "image/avif"),
    ("flac", "audio/flac"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("opus", "audio/opus"),
    ("aiff", "audio/aiff"),
    ("wma", "audio/x-ms-wma"),
    ("mkv", "video/x-matroska"),
    ("m4v", "video/x-m4v"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("3gp", "video/3gpp"),
];

/// How a deployment selects target formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    /// The caller names one format for the whole batch.
    #[default]
    Explicit,
    /// Each file's format follows from its content type.
    Inferred,
}

impl fmt::Display for FormatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatMode::Explicit => f.write_str("explicit"),
            FormatMode::Inferred => f.write_str("inferred"),
        }
    }
}

/// A validated output format, used both as file extension and as the
/// engine's target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TargetFormat(String);

impl TargetFormat {
    /// Parse a caller-supplied format string.
    ///
    /// Leading dots and surrounding whitespace are stripped and the result is
    /// lowercased. Only ASCII alphanumerics are accepted since the value ends
    /// up in a file name and on the engine's command line.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return Err(Error::Validation("target format is empty".into()));
        }
        if trimmed.len() > MAX_FORMAT_LEN {
            return Err(Error::Validation(format!(
                "target format '{trimmed}' is longer than {MAX_FORMAT_LEN} characters"
            )));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::Validation(format!(
                "target format '{trimmed}' must be alphanumeric"
            )));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    fn known(ext: &'static str) -> Self {
        Self(ext.to_string())
    }

    /// The format as a bare extension (no leading dot).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// MIME type of files in this format.
    pub fn mime(&self) -> &'static str {
        mime_for_extension(&self.0)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TargetFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Per-batch format selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatPolicy {
    /// Use this format for every file in the batch.
    Explicit(TargetFormat),
    /// Infer each file's format from its declared content type.
    Inferred,
}

impl FormatPolicy {
    /// Build the policy for a request under the configured mode.
    ///
    /// Explicit mode requires the caller to name a format. Inferred mode
    /// ignores whatever the caller sent.
    pub fn for_request(mode: FormatMode, requested: Option<&str>) -> Result<Self> {
        match mode {
            FormatMode::Explicit => {
                let raw = requested.ok_or_else(|| {
                    Error::Validation("a target format is required".into())
                })?;
                Ok(FormatPolicy::Explicit(TargetFormat::parse(raw)?))
            }
            FormatMode::Inferred => Ok(FormatPolicy::Inferred),
        }
    }

    /// Resolve the target format for one file.
    pub fn resolve(&self, content_type: &str) -> TargetFormat {
        match self {
            FormatPolicy::Explicit(format) => format.clone(),
            FormatPolicy::Inferred => infer_format(content_type),
        }
    }
}

/// Derive a target format from a declared content type.
///
/// `image/*` becomes webp, `audio/*` mp3, `video/*` mp4; everything else
/// falls back to the opaque `bin` target.
pub fn infer_format(content_type: &str) -> TargetFormat {
    let top_level = content_type
        .split('/')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match top_level.as_str() {
        "image" if content_type.contains('/') => TargetFormat::known("webp"),
        "audio" if content_type.contains('/') => TargetFormat::known("mp3"),
        "video" if content_type.contains('/') => TargetFormat::known("mp4"),
        _ => TargetFormat::known(FALLBACK_EXTENSION),
    }
}

/// Extension of a path: the text after the final `.` of its last segment.
///
/// Returns [`FALLBACK_EXTENSION`] when the segment has no dot or ends in one.
pub fn extension_of(path: &str) -> &str {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => FALLBACK_EXTENSION,
    }
}

/// Look up the MIME type for an extension (case-insensitive).
pub fn mime_for_extension(ext: &str) -> &'static str {
    MIME_TABLE
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
        .unwrap_or(OCTET_STREAM)
}

/// Guess the content type of a local file from its name.
///
/// Checks the output table first, then common input-only extensions.
pub fn guess_content_type(path: &str) -> &'static str {
    let ext = extension_of(path);
    let mime = mime_for_extension(ext);
    if mime != OCTET_STREAM {
        return mime;
    }
    UPLOAD_MIME_TABLE
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
        .unwrap_or(OCTET_STREAM)
}

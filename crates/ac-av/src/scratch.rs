//! Scratch storage for conversion artifacts.
//!
//! A [`ScratchDir`] hands out collision-free paths under one root directory.
//! Every path embeds a fresh v4 UUID, so concurrent requests and same-named
//! uploads never share a file. Ownership of a path is expressed by a
//! [`TempArtifact`]: dropping it deletes the file, which makes cleanup happen
//! exactly once no matter how a batch ends.
//!
//! Deletion is best-effort. It returns nothing, treats a missing file as
//! already done, and only logs other failures.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Byte budget for the original-name part of a scratch file name.
///
/// File names are limited to 255 bytes on common filesystems. The budget
/// leaves room for the 37-byte `<uuid>-` prefix and for a
/// `.converted.<format>` suffix (format up to 16 bytes) on derived outputs.
const MAX_NAME_BYTES: usize = 180;

/// Name used when an upload carries no usable file name.
const DEFAULT_NAME: &str = "upload";

/// Root directory for temporary artifacts.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Use `root` as the scratch directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use the platform temporary directory.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure(&self) -> ac_core::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Allocate a fresh path `<root>/<uuid>-<name>` for an upload.
    ///
    /// Only the final segment of `original_name` is kept and characters that
    /// are unsafe in file names are replaced, so the result always lies
    /// directly inside the root.
    pub fn allocate(&self, original_name: &str) -> PathBuf {
        self.root
            .join(format!("{}-{}", Uuid::new_v4(), sanitize_name(original_name)))
    }

    /// Persist `data` at `path`.
    ///
    /// The file must not exist yet; this is the single writer for the path.
    /// A partially written file is removed before the error is returned.
    pub async fn write(&self, path: &Path, data: &[u8]) -> ac_core::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| ac_core::Error::upload_write(path, e))?;

        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            TempArtifact::new(path.to_path_buf()).remove().await;
            return Err(ac_core::Error::upload_write(path, e));
        }

        tracing::debug!("wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    /// Delete `path`, ignoring a missing file and swallowing other errors.
    pub fn delete(&self, path: &Path) {
        remove_quietly(path);
    }

    /// Take ownership of `path`; the file is deleted when the guard drops.
    pub fn track(&self, path: PathBuf) -> TempArtifact {
        TempArtifact::new(path)
    }
}

impl Default for ScratchDir {
    fn default() -> Self {
        Self::system()
    }
}

/// Owned temporary file. Dropping it deletes the file (best-effort).
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    removed: bool,
}

impl TempArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    /// Delete the file now without tying up an async worker thread.
    ///
    /// Completes once the file is gone (or could not be removed, which is
    /// only logged).
    pub async fn remove(mut self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!("removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to remove {}: {e}", self.path.display()),
        }
        self.removed = true;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path segment, used as the archive member name.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_NAME.to_string())
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if !self.removed {
            remove_quietly(&self.path);
        }
    }
}

/// Delete `artifacts` without holding up the caller.
///
/// Inside a tokio runtime the removals run on the blocking pool and this
/// returns at once; outside one they run inline. Either way failures are
/// only logged.
pub fn discard(artifacts: Vec<TempArtifact>) {
    if artifacts.is_empty() {
        return;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(move || drop(artifacts));
        }
        Err(_) => drop(artifacts),
    }
}

/// Best-effort removal of a scratch file.
pub fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("failed to remove {}: {e}", path.display()),
    }
}

/// Reduce an untrusted upload name to a safe single path segment.
fn sanitize_name(original_name: &str) -> String {
    let segment = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            c if c.is_control() => '_',
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return DEFAULT_NAME.to_string();
    }

    truncate_name(&cleaned)
}

/// Cut `name` to [`MAX_NAME_BYTES`] on a char boundary, keeping a short
/// extension intact.
fn truncate_name(name: &str) -> String {
    if name.len() <= MAX_NAME_BYTES {
        return name.to_string();
    }

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < MAX_NAME_BYTES / 2 => {
            let keep = MAX_NAME_BYTES - ext.len() - 1;
            format!("{}.{ext}", floor_prefix(stem, keep))
        }
        _ => floor_prefix(name, MAX_NAME_BYTES).to_string(),
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn floor_prefix(s: &str, max: usize) -> &str {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

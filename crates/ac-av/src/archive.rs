//! Zip packaging of converted outputs.
//!
//! Members are streamed from disk into the archive one at a time, so memory
//! use stays flat regardless of member size. Each member is named by the
//! final segment of its source path.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::scratch::remove_quietly;

/// Members at or above this size need zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Write every file in `files` into a new zip archive at `output`.
///
/// The archive is finished and flushed only after the last member has been
/// written. On any error the partial archive is removed and the whole
/// operation fails; a half-built archive is never reported as success.
pub fn build_archive(files: &[PathBuf], output: &Path) -> ac_core::Result<()> {
    match write_archive(files, output) {
        Ok(()) => Ok(()),
        Err(e) => {
            remove_quietly(output);
            Err(e)
        }
    }
}

/// [`build_archive`] on the blocking thread pool.
pub async fn build_archive_async(files: Vec<PathBuf>, output: PathBuf) -> ac_core::Result<()> {
    tokio::task::spawn_blocking(move || build_archive(&files, &output))
        .await
        .map_err(|e| ac_core::Error::Internal(format!("archive task failed: {e}")))?
}

fn write_archive(files: &[PathBuf], output: &Path) -> ac_core::Result<()> {
    let file = File::create(output).map_err(|e| {
        ac_core::Error::archive(format!("failed to create {}: {e}", output.display()))
    })?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    for path in files {
        let name = member_name(path);
        let source = File::open(path).map_err(|e| {
            ac_core::Error::archive(format!("failed to open {}: {e}", path.display()))
        })?;
        let len = source.metadata().map(|m| m.len()).unwrap_or(0);

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(len >= ZIP64_THRESHOLD);

        zip.start_file(name.as_str(), options)
            .map_err(|e| ac_core::Error::archive(format!("failed to add {name}: {e}")))?;
        std::io::copy(&mut BufReader::new(source), &mut zip)
            .map_err(|e| ac_core::Error::archive(format!("failed to write {name}: {e}")))?;

        tracing::debug!("archived {name} ({len} bytes)");
    }

    let mut writer = zip
        .finish()
        .map_err(|e| ac_core::Error::archive(format!("failed to finalize archive: {e}")))?;
    writer
        .flush()
        .map_err(|e| ac_core::Error::archive(format!("failed to flush archive: {e}")))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| ac_core::Error::archive(format!("failed to sync archive: {e}")))?;

    Ok(())
}

/// Final path segment of `path`.
fn member_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_members(archive: &Path) -> Vec<(String, Vec<u8>)> {
        let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
        (0..zip.len())
            .map(|i| {
                let mut entry = zip.by_index(i).unwrap();
                let mut data = Vec::new();
                entry.read_to_end(&mut data).unwrap();
                (entry.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn members_named_by_basename_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.webp");
        let b = dir.path().join("b.mp3");
        std::fs::write(&a, b"webp-bytes").unwrap();
        std::fs::write(&b, vec![7u8; 64 * 1024]).unwrap();

        let out = dir.path().join("bundle.zip");
        build_archive(&[a, b], &out).unwrap();

        let members = read_members(&out);
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].0, "a.webp");
        assert_eq!(members[0].1, b"webp-bytes");
        assert_eq!(members[1].0, "b.mp3");
        assert_eq!(members[1].1, vec![7u8; 64 * 1024]);
    }

    #[test]
    fn missing_member_fails_and_removes_partial_archive() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.webp");
        std::fs::write(&a, b"x").unwrap();
        let missing = dir.path().join("missing.mp3");

        let out = dir.path().join("bundle.zip");
        let err = build_archive(&[a, missing], &out).unwrap_err();
        assert!(matches!(err, ac_core::Error::Archive(_)));
        assert!(err.to_string().contains("missing.mp3"));
        assert!(!out.exists());
    }

    #[test]
    fn unwritable_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.webp");
        std::fs::write(&a, b"x").unwrap();

        let out = dir.path().join("no-such-dir").join("bundle.zip");
        let err = build_archive(&[a], &out).unwrap_err();
        assert!(matches!(err, ac_core::Error::Archive(_)));
    }

    #[tokio::test]
    async fn async_variant_builds_archive() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("one.mp4");
        std::fs::write(&a, b"mp4").unwrap();

        let out = dir.path().join("bundle.zip");
        build_archive_async(vec![a], out.clone()).await.unwrap();
        assert_eq!(read_members(&out).len(), 1);
    }
}

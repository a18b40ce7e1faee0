//! Batch orchestration: upload -> scratch -> engine -> single file or zip.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ac_av::{build_archive_async, discard, Converter, ScratchDir, TempArtifact};
use ac_core::format::ZIP_MIME;
use ac_core::{Error, FormatPolicy, RequestId, Result, TargetFormat, UploadedFile};

use super::job::{ConversionBatch, ConversionJob};
use super::output::{OutputDescriptor, OutputStream};

/// Drives one request's files through the conversion engine.
///
/// Jobs run strictly one after another. The first failure aborts the batch;
/// every artifact allocated up to that point is owned by a job or by the
/// batch and is deleted as the error unwinds.
#[derive(Clone)]
pub struct ConversionOrchestrator {
    scratch: ScratchDir,
    converter: Arc<dyn Converter>,
}

impl ConversionOrchestrator {
    pub fn new(scratch: ScratchDir, converter: Arc<dyn Converter>) -> Self {
        Self { scratch, converter }
    }

    /// Convert every file and package the result.
    ///
    /// Returns a single converted file when one file was uploaded, otherwise
    /// a zip of all outputs. The returned stream deletes every scratch file
    /// of the batch when it terminates or is dropped.
    pub async fn convert_batch(
        &self,
        files: &[UploadedFile],
        policy: &FormatPolicy,
    ) -> Result<OutputDescriptor> {
        if files.is_empty() {
            return Err(Error::Validation("no files uploaded".into()));
        }

        let mut batch = ConversionBatch::new(RequestId::new(), files.len());
        tracing::info!(
            request = %batch.request_id().short(),
            "converting batch of {} file(s)",
            files.len()
        );

        for (index, file) in files.iter().enumerate() {
            match self.run_job(index, file, policy).await {
                Ok(job) => batch.push(job),
                Err(e) => {
                    tracing::error!(
                        request = %batch.request_id().short(),
                        "job {index} ({}) failed, aborting batch after {} converted: {e}",
                        file.original_name(),
                        batch.len()
                    );
                    batch.abandon();
                    return Err(e);
                }
            }
        }

        self.package(batch).await
    }

    async fn run_job(
        &self,
        index: usize,
        file: &UploadedFile,
        policy: &FormatPolicy,
    ) -> Result<ConversionJob> {
        let input_path = self.scratch.allocate(file.original_name());
        let format = policy.resolve(file.content_type());
        let output_path = derive_output_path(&input_path, &format);

        self.scratch.write(&input_path, file.data()).await?;

        let mut job = ConversionJob::new(
            index,
            file.original_name(),
            format,
            self.scratch.track(input_path),
            self.scratch.track(output_path),
        );

        let converted = match job.input_path() {
            Some(input) => {
                self.converter
                    .convert(input, job.output_path(), job.format())
                    .await
            }
            None => Err(Error::Internal("job input already released".into())),
        };

        if let Err(e) = converted {
            job.abandon();
            return Err(e);
        }

        if tokio::fs::metadata(job.output_path()).await.is_err() {
            let err = Error::engine(
                "converter",
                format!("no output produced for {}", job.original_name()),
            );
            job.abandon();
            return Err(err);
        }

        job.release_input().await;
        tracing::info!(
            "converted {} -> {} ({})",
            job.original_name(),
            job.output_path().display(),
            job.format()
        );
        Ok(job)
    }

    async fn package(&self, batch: ConversionBatch) -> Result<OutputDescriptor> {
        let timestamp = batch.timestamp_millis();
        let request = batch.request_id().short();

        if batch.len() == 1 {
            let format = batch
                .jobs()
                .first()
                .map(|job| job.format().clone())
                .ok_or_else(|| Error::Internal("batch lost its only output".into()))?;
            let output = batch
                .into_outputs()
                .pop()
                .ok_or_else(|| Error::Internal("batch lost its only output".into()))?;
            let path = output.path().to_path_buf();
            let filename = format!("converted-{timestamp}.{format}");
            let mime = format.mime().to_string();
            let (stream, content_length) = OutputStream::open(&path, vec![output]).await?;

            tracing::info!(request = %request, "streaming {filename} ({content_length} bytes)");
            return Ok(OutputDescriptor {
                stream,
                mime,
                filename,
                content_length,
            });
        }

        let filename = format!("converted-{timestamp}.zip");
        let archive = self.scratch.track(self.scratch.allocate(&filename));
        let members = batch.output_paths();
        let outputs = batch.into_outputs();

        if let Err(e) = build_archive_async(members, archive.path().to_path_buf()).await {
            let mut artifacts = outputs;
            artifacts.push(archive);
            discard(artifacts);
            return Err(e);
        }

        let archive_path = archive.path().to_path_buf();
        let member_count = outputs.len();
        let mut artifacts: Vec<TempArtifact> = Vec::with_capacity(member_count + 1);
        artifacts.push(archive);
        artifacts.extend(outputs);

        let (stream, content_length) = OutputStream::open(&archive_path, artifacts).await?;

        tracing::info!(
            request = %request,
            "streaming {filename} with {member_count} member(s) ({content_length} bytes)"
        );
        Ok(OutputDescriptor {
            stream,
            mime: ZIP_MIME.to_string(),
            filename,
            content_length,
        })
    }
}

/// Replace the trailing extension of `input` with `format`.
///
/// When the upload already carries the target extension the output gets a
/// `.converted` infix so it never overwrites its own input.
fn derive_output_path(input: &Path, format: &TargetFormat) -> PathBuf {
    let candidate = input.with_extension(format.as_str());
    let same = candidate
        .to_string_lossy()
        .eq_ignore_ascii_case(&input.to_string_lossy());
    if !same {
        return candidate;
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}.converted.{format}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(s: &str) -> TargetFormat {
        TargetFormat::parse(s).unwrap()
    }

    #[test]
    fn output_path_replaces_extension() {
        let p = derive_output_path(Path::new("/tmp/abc-photo.png"), &fmt("webp"));
        assert_eq!(p, Path::new("/tmp/abc-photo.webp"));
    }

    #[test]
    fn output_path_replaces_only_last_extension() {
        let p = derive_output_path(Path::new("/tmp/abc-song.live.wav"), &fmt("mp3"));
        assert_eq!(p, Path::new("/tmp/abc-song.live.mp3"));
    }

    #[test]
    fn output_path_appends_when_no_extension() {
        let p = derive_output_path(Path::new("/tmp/abc-upload"), &fmt("bin"));
        assert_eq!(p, Path::new("/tmp/abc-upload.bin"));
    }

    #[test]
    fn output_path_never_equals_input() {
        let p = derive_output_path(Path::new("/tmp/abc-clip.mp4"), &fmt("mp4"));
        assert_eq!(p, Path::new("/tmp/abc-clip.converted.mp4"));

        let p = derive_output_path(Path::new("/tmp/abc-pic.WEBP"), &fmt("webp"));
        assert_eq!(p, Path::new("/tmp/abc-pic.converted.webp"));
    }
}

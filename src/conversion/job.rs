//! Per-file jobs and the batch that orders them.

use std::path::{Path, PathBuf};

use ac_av::{discard, TempArtifact};
use ac_core::{RequestId, TargetFormat};
use chrono::{DateTime, Utc};

/// One uploaded file's unit of work.
///
/// The job owns its scratch artifacts. The input is released as soon as the
/// conversion succeeds; the output lives until it has been packaged and
/// streamed, or until the job is abandoned.
#[derive(Debug)]
pub struct ConversionJob {
    index: usize,
    original_name: String,
    format: TargetFormat,
    input: Option<TempArtifact>,
    output: TempArtifact,
}

impl ConversionJob {
    pub fn new(
        index: usize,
        original_name: impl Into<String>,
        format: TargetFormat,
        input: TempArtifact,
        output: TempArtifact,
    ) -> Self {
        Self {
            index,
            original_name: original_name.into(),
            format,
            input: Some(input),
            output,
        }
    }

    /// Position of the file in the upload order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn format(&self) -> &TargetFormat {
        &self.format
    }

    /// Scratch path of the persisted upload, until it has been released.
    pub fn input_path(&self) -> Option<&Path> {
        self.input.as_ref().map(TempArtifact::path)
    }

    pub fn output_path(&self) -> &Path {
        self.output.path()
    }

    /// Delete the input once the engine is done with it.
    pub async fn release_input(&mut self) {
        if let Some(input) = self.input.take() {
            input.remove().await;
        }
    }

    /// Give up on the job, deleting whatever it still owns.
    pub fn abandon(self) {
        let mut artifacts = Vec::with_capacity(2);
        artifacts.extend(self.input);
        artifacts.push(self.output);
        discard(artifacts);
    }

    /// Hand the output artifact to whoever streams it.
    pub fn into_output(self) -> TempArtifact {
        self.output
    }
}

/// Ordered jobs of one request.
#[derive(Debug)]
pub struct ConversionBatch {
    request_id: RequestId,
    started_at: DateTime<Utc>,
    jobs: Vec<ConversionJob>,
}

impl ConversionBatch {
    pub fn new(request_id: RequestId, capacity: usize) -> Self {
        Self {
            request_id,
            started_at: Utc::now(),
            jobs: Vec::with_capacity(capacity),
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Request timestamp in Unix milliseconds, used in output names.
    pub fn timestamp_millis(&self) -> i64 {
        self.started_at.timestamp_millis()
    }

    pub fn push(&mut self, job: ConversionJob) {
        self.jobs.push(job);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn jobs(&self) -> &[ConversionJob] {
        &self.jobs
    }

    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.jobs
            .iter()
            .map(|job| job.output_path().to_path_buf())
            .collect()
    }

    /// Take every job's output artifact, in upload order.
    pub fn into_outputs(self) -> Vec<TempArtifact> {
        self.jobs.into_iter().map(ConversionJob::into_output).collect()
    }

    /// Give up on the batch, deleting every job's artifacts.
    pub fn abandon(self) {
        for job in self.jobs {
            job.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_in(dir: &Path, index: usize) -> ConversionJob {
        let input = dir.join(format!("{index}-in.png"));
        let output = dir.join(format!("{index}-in.webp"));
        std::fs::write(&input, b"in").unwrap();
        std::fs::write(&output, b"out").unwrap();
        ConversionJob::new(
            index,
            "in.png",
            TargetFormat::parse("webp").unwrap(),
            TempArtifact::new(input),
            TempArtifact::new(output),
        )
    }

    #[tokio::test]
    async fn release_input_keeps_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job_in(dir.path(), 0);
        let input = job.input_path().unwrap().to_path_buf();

        job.release_input().await;
        assert!(job.input_path().is_none());
        assert!(!input.exists());
        assert!(job.output_path().exists());

        // A second release is a no-op.
        job.release_input().await;
        assert!(job.output_path().exists());
    }

    #[test]
    fn abandoned_job_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path(), 0);
        let input = job.input_path().unwrap().to_path_buf();
        let output = job.output_path().to_path_buf();

        job.abandon();
        assert!(!input.exists());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn abandoned_batch_removes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = ConversionBatch::new(RequestId::new(), 2);
        for i in 0..2 {
            let mut job = job_in(dir.path(), i);
            job.release_input().await;
            batch.push(job);
        }
        let outputs = batch.output_paths();

        // Inside a runtime the unlinks run on the blocking pool.
        batch.abandon();
        for _ in 0..100 {
            if outputs.iter().all(|p| !p.exists()) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(outputs.iter().all(|p| !p.exists()));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn batch_keeps_upload_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = ConversionBatch::new(RequestId::new(), 3);
        for i in 0..3 {
            let mut job = job_in(dir.path(), i);
            job.release_input().await;
            batch.push(job);
        }
        assert_eq!(batch.len(), 3);
        let indices: Vec<usize> = batch.jobs().iter().map(ConversionJob::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let outputs = batch.into_outputs();
        let names: Vec<String> = outputs.iter().map(TempArtifact::file_name).collect();
        assert_eq!(names, vec!["0-in.webp", "1-in.webp", "2-in.webp"]);
    }
}

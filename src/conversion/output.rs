//! The self-cleaning result of a batch.
//!
//! [`OutputStream`] reads the final artifact (single output or archive) and
//! owns every scratch file of the batch. The first terminal event (end of
//! file or a read error) deletes them; a stream dropped before that, for
//! example because the client went away mid-download, deletes them on drop.
//! Either way each file is removed exactly once, on the blocking pool so the
//! poll that hits end of file never waits on the filesystem.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use ac_av::{discard, TempArtifact};
use bytes::Bytes;
use futures::Stream;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Read buffer size for streaming artifacts.
const CHUNK_SIZE: usize = 64 * 1024;

/// Byte stream over a batch artifact that cleans up when it terminates.
#[derive(Debug)]
pub struct OutputStream {
    inner: ReaderStream<File>,
    artifacts: Option<Vec<TempArtifact>>,
}

impl OutputStream {
    /// Open `path` for streaming. `artifacts` are released on termination.
    ///
    /// If opening fails the artifacts are discarded with the error.
    pub async fn open(path: &Path, artifacts: Vec<TempArtifact>) -> ac_core::Result<(Self, u64)> {
        let opened = async {
            let file = File::open(path).await?;
            let len = file.metadata().await?.len();
            Ok::<_, io::Error>((file, len))
        }
        .await;

        match opened {
            Ok((file, len)) => {
                let stream = Self {
                    inner: ReaderStream::with_capacity(file, CHUNK_SIZE),
                    artifacts: Some(artifacts),
                };
                Ok((stream, len))
            }
            Err(e) => {
                discard(artifacts);
                Err(e.into())
            }
        }
    }

    /// Whether cleanup has already run.
    pub fn is_released(&self) -> bool {
        self.artifacts.is_none()
    }

    fn release(&mut self) {
        if let Some(artifacts) = self.artifacts.take() {
            tracing::debug!("stream finished; removing {} artifact(s)", artifacts.len());
            discard(artifacts);
        }
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        self.release();
    }
}

impl Stream for OutputStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(None) | Poll::Ready(Some(Err(_))) = &polled {
            self.release();
        }
        polled
    }
}

/// What the boundary needs to answer a conversion request.
#[derive(Debug)]
pub struct OutputDescriptor {
    pub stream: OutputStream,
    pub mime: String,
    pub filename: String,
    pub content_length: u64,
}

impl OutputDescriptor {
    /// Value for a `Content-Disposition` header.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename.replace('"', ""))
    }
}

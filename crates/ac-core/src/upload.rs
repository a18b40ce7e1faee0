//! The immutable input of a conversion batch.

use bytes::Bytes;

/// One uploaded file as handed over by the request boundary.
///
/// The payload is reference-counted so the boundary and the orchestrator
/// can share it without copying; the core never mutates it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    data: Bytes,
    original_name: String,
    content_type: String,
}

impl UploadedFile {
    pub fn new(
        data: impl Into<Bytes>,
        original_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            original_name: original_name.into(),
            content_type: content_type.into(),
        }
    }

    /// Raw payload bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// File name as supplied by the client. Untrusted.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Declared content type, e.g. `image/png`.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

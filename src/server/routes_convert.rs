//! `POST /convert`: multipart upload in, converted file or zip out.

use ac_core::{Error, FormatPolicy, UploadedFile};
use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::Response,
    routing::post,
    Router,
};

use crate::server::error::AppError;
use crate::server::AppContext;

/// Multipart field carrying files. `file` is accepted as an alias.
const FILES_FIELD: &str = "files";
/// Multipart field carrying the optional target format.
const FORMAT_FIELD: &str = "format";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const DEFAULT_FILE_NAME: &str = "upload";

pub fn convert_routes() -> Router<AppContext> {
    Router::new().route("/convert", post(convert))
}

async fn convert(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let (files, format) = read_upload(&mut multipart).await?;
    let policy = FormatPolicy::for_request(ctx.config.conversion.format_mode, format.as_deref())?;

    tracing::debug!(
        files = files.len(),
        policy = ?policy,
        "received conversion request"
    );

    // The batch runs in its own task so a client hanging up mid-conversion
    // does not cut it short; an unclaimed result is dropped, which deletes
    // its artifacts.
    let orchestrator = ctx.orchestrator.clone();
    let descriptor = tokio::spawn(async move { orchestrator.convert_batch(&files, &policy).await })
        .await
        .map_err(|e| Error::Internal(format!("conversion task failed: {e}")))??;

    let disposition = descriptor.content_disposition();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, descriptor.mime)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, descriptor.content_length)
        .body(Body::from_stream(descriptor.stream))
        .map_err(|e| AppError::new(Error::Internal(format!("failed to build response: {e}"))))
}

/// Collect uploaded files (in order) and the optional format field.
async fn read_upload(
    multipart: &mut Multipart,
) -> Result<(Vec<UploadedFile>, Option<String>), AppError> {
    let mut files = Vec::new();
    let mut format = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            FILES_FIELD | "file" => {
                let file_name = field
                    .file_name()
                    .unwrap_or(DEFAULT_FILE_NAME)
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let data = field.bytes().await?;

                tracing::debug!(
                    file_name = %file_name,
                    content_type = %content_type,
                    size_bytes = data.len(),
                    "received file upload"
                );
                files.push(UploadedFile::new(data, file_name, content_type));
            }
            FORMAT_FIELD => {
                let value = field.text().await?;
                if !value.trim().is_empty() {
                    format = Some(value);
                }
            }
            other => {
                tracing::debug!("ignoring unknown multipart field {other:?}");
            }
        }
    }

    if files.is_empty() {
        return Err(Error::Validation("no files uploaded".into()).into());
    }

    Ok((files, format))
}

//! # File Uploads
//!
//! Multipart uploads with progress reporting. The body is streamed in fixed
//! chunks and the callback fires as each chunk is handed to the connection.

use futures::{StreamExt, stream};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::api::ApiClient;
use crate::error::{ClientError, Result};

pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Document,
    Audio,
    Video,
    Code,
    Data,
    #[serde(other)]
    Other,
}

impl FileCategory {
    pub fn from_mime(mime_type: &str) -> Self {
        let mime = mime_type.to_ascii_lowercase();
        match mime.split('/').next().unwrap_or_default() {
            "image" => FileCategory::Image,
            "audio" => FileCategory::Audio,
            "video" => FileCategory::Video,
            "text" if mime == "text/csv" => FileCategory::Data,
            "text" => FileCategory::Document,
            _ => match mime.as_str() {
                "application/pdf" | "application/msword" => FileCategory::Document,
                "application/json" | "application/x-yaml" | "application/xml" => FileCategory::Data,
                "application/javascript" | "application/x-python" => FileCategory::Code,
                _ => FileCategory::Other,
            },
        }
    }
}

/// Metadata of a stored file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub category: FileCategory,
}

/// Best-effort MIME type from a file extension.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "yaml" | "yml" => "application/x-yaml",
        "xml" => "application/xml",
        "js" => "application/javascript",
        "py" => "application/x-python",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

impl ApiClient {
    /// Uploads `bytes` as `filename`.
    ///
    /// `on_progress(sent, total)` reports bytes handed to the connection.
    pub async fn upload_file<F>(
        &self,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
        on_progress: F,
    ) -> Result<UploadedFile>
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        let total = bytes.len() as u64;
        if total == 0 {
            on_progress(0, 0);
        }

        let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        let mut sent = 0u64;
        let body = stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            on_progress(sent, total);
            Ok::<_, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(Body::wrap_stream(body), total)
            .file_name(filename.to_string())
            .mime_str(mime_type)?;
        let form = Form::new().part("file", part);

        let response = Self::send(self.request(Method::POST, &["files"])?.multipart(form)).await?;
        let uploaded: UploadedFile = Self::decode(response).await?;
        tracing::info!(
            file_id = %uploaded.id,
            filename = %uploaded.filename,
            size = uploaded.size,
            "Uploaded file"
        );
        Ok(uploaded)
    }

    /// Reads a local file and uploads it.
    pub async fn upload_path<F>(&self, path: &Path, on_progress: F) -> Result<UploadedFile>
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Validation(format!("{} has no file name", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        self.upload_file(&filename, guess_mime_type(path), bytes, on_progress)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_mime() {
        assert_eq!(FileCategory::from_mime("image/PNG"), FileCategory::Image);
        assert_eq!(FileCategory::from_mime("text/csv"), FileCategory::Data);
        assert_eq!(FileCategory::from_mime("application/pdf"), FileCategory::Document);
        assert_eq!(FileCategory::from_mime("application/zip"), FileCategory::Other);
    }

    #[test]
    fn test_unknown_category_deserializes_as_other() {
        let category: FileCategory = serde_json::from_str("\"spreadsheet\"").unwrap();
        assert_eq!(category, FileCategory::Other);
    }
}

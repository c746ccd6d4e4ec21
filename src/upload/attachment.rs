use std::path::Path;

use tracing::info;

use crate::error::UploadError;

/// File types the attachment picker suggests. Not enforced.
pub const DEFAULT_SUGGESTED_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".txt"];

/// A user-selected file to send alongside the recording
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Name the file is uploaded under
    pub file_name: String,
    /// Declared media type
    pub media_type: String,
    pub payload: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            payload,
        }
    }

    /// Read a file from disk, naming and typing it after the path
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::Io(format!("not a file path: {}", path.display())))?
            .to_string();

        let payload = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::Io(format!("{}: {}", path.display(), e)))?;

        let media_type = media_type_for(&file_name).to_string();

        info!(
            "Loaded attachment {} ({} bytes, {})",
            file_name,
            payload.len(),
            media_type
        );

        Ok(Self {
            file_name,
            media_type,
            payload,
        })
    }

    /// Lowercased extension without the dot
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Whether the file is one of the suggested types (".pdf" or "pdf" both work)
    pub fn matches_suggestion<S: AsRef<str>>(&self, suggested: &[S]) -> bool {
        let Some(ext) = self.extension() else {
            return false;
        };

        suggested
            .iter()
            .any(|s| s.as_ref().trim_start_matches('.').eq_ignore_ascii_case(&ext))
    }
}

/// Media type guessed from the file extension
pub fn media_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("wav") => "audio/wav",
        Some("webm") => "audio/webm",
        Some("mp3") => "audio/mpeg",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

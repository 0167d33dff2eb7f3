use std::fs;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::error::NexusError;

/// Category of an attachment, independent of its exact mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// Image content (JPEG, PNG, GIF, WebP, ...).
    Image,
    /// Document content (PDF, text files, ...).
    Document,
    /// Audio content.
    Audio,
    /// Video content.
    Video,
}

/// File or media content attached to a [`crate::types::GenerateRequest`].
///
/// An attachment is either *inline* (`data` holds the base64 payload) or
/// *remote* (`data` is empty and `url` points at the resource). Whether a
/// remote attachment is passed through, fetched-and-inlined, or rejected is a
/// per-provider capability, not a policy of this type — see
/// [`crate::provider::CapabilityDescriptor`].
///
/// # Examples
///
/// ```
/// # use nexus_llm::types::{FileContent, MediaType};
/// let file = FileContent::from_bytes(b"\x89PNG", MediaType::Image, "image/png", Some("x.png"));
/// assert!(!file.data.is_empty());
/// assert!(file.url.is_none());
///
/// let remote = FileContent::from_url("https://example.com/a.png", MediaType::Image, "image/png");
/// assert!(remote.data.is_empty());
/// assert!(remote.is_remote());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContent {
    /// Category of the attachment.
    pub media_type: MediaType,
    /// MIME type such as `image/jpeg` or `application/pdf`.
    pub mime_type: String,
    /// Base64-encoded payload; empty when the attachment is remote.
    pub data: String,
    /// Remote location of the resource, when not inlined.
    pub url: Option<String>,
    /// Optional original file name.
    pub filename: Option<String>,
}

impl FileContent {
    /// Reads a file from disk, base64-encodes it, and infers the mime type
    /// from the extension.
    ///
    /// # Errors
    ///
    /// Returns [`NexusError::Argument`] when the path does not exist or the
    /// file cannot be read.
    pub fn from_path(path: impl AsRef<Path>, media_type: MediaType) -> Result<Self, NexusError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(NexusError::argument(format!(
                "file not found: {}",
                path.display()
            )));
        }

        let bytes = fs::read(path).map_err(|err| {
            NexusError::argument(format!("failed to read {}: {err}", path.display()))
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        Ok(Self {
            media_type,
            mime_type: mime_from_extension(path).to_string(),
            data: BASE64.encode(&bytes),
            url: None,
            filename,
        })
    }

    /// Encodes an in-memory buffer as an inline attachment. Never fails.
    pub fn from_bytes(
        bytes: &[u8],
        media_type: MediaType,
        mime_type: impl Into<String>,
        filename: Option<&str>,
    ) -> Self {
        Self {
            media_type,
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
            url: None,
            filename: filename.map(str::to_string),
        }
    }

    /// References a remotely hosted resource; `data` stays empty.
    pub fn from_url(
        url: impl Into<String>,
        media_type: MediaType,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            media_type,
            mime_type: mime_type.into(),
            data: String::new(),
            url: Some(url.into()),
            filename: None,
        }
    }

    /// Returns `true` when the attachment carries no inline payload and must
    /// be resolved through its url.
    pub fn is_remote(&self) -> bool {
        self.data.is_empty() && self.url.is_some()
    }

    /// Returns `true` when the attachment carries inline data or a url.
    pub fn is_usable(&self) -> bool {
        !self.data.is_empty() || self.url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// Maps a file extension to a mime type, covering the image, document, audio
/// and video families; anything else degrades to `application/octet-stream`.
fn mime_from_extension(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        // images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        // documents
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        // audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        // video
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

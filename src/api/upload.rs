//! Attachment validation and upload.
//!
//! Validation happens entirely client-side before any network call:
//! images must be JPEG or PNG up to 5 MiB, documents must be PDF up to
//! 10 MiB. Content is sniffed rather than trusted from the extension.
//! A passing file is uploaded with a single multipart POST to the
//! per-kind endpoint and yields the remote URL to attach to the next
//! outgoing message.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::ApiClient;
use crate::chat::AttachmentKind;

/// Size cap for image attachments.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Size cap for document attachments.
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

const IMAGE_ENDPOINT: &str = "/homework-ai-assistant/upload-image";
const DOCUMENT_ENDPOINT: &str = "/homework-ai-assistant/upload-document";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Policy violations, surfaced inline next to the composer. No retry,
/// no network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please attach only JPEG or PNG images")]
    UnsupportedImage,

    #[error("Please attach only PDF documents")]
    UnsupportedDocument,

    #[error("Image size should be less than 5 MiB")]
    ImageTooLarge,

    #[error("Document size should be less than 10 MiB")]
    DocumentTooLarge,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upload rejected with status {0}")]
    Status(reqwest::StatusCode),

    #[error("Another upload is already in progress")]
    Busy,
}

/// A successfully uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub url: String,
    pub kind: AttachmentKind,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Endpoint for an attachment kind.
pub fn endpoint_for(kind: AttachmentKind) -> &'static str {
    match kind {
        AttachmentKind::Image => IMAGE_ENDPOINT,
        AttachmentKind::Document => DOCUMENT_ENDPOINT,
    }
}

/// Validate file content against the attachment policy. Returns the MIME
/// type to declare on upload.
pub fn validate_bytes(bytes: &[u8], kind: AttachmentKind) -> Result<&'static str, ValidationError> {
    match kind {
        AttachmentKind::Image => {
            let mime = match image::guess_format(bytes) {
                Ok(ImageFormat::Jpeg) => "image/jpeg",
                Ok(ImageFormat::Png) => "image/png",
                _ => return Err(ValidationError::UnsupportedImage),
            };
            if bytes.len() as u64 > MAX_IMAGE_BYTES {
                return Err(ValidationError::ImageTooLarge);
            }
            Ok(mime)
        }
        AttachmentKind::Document => {
            if !bytes.starts_with(PDF_MAGIC) {
                return Err(ValidationError::UnsupportedDocument);
            }
            if bytes.len() as u64 > MAX_DOCUMENT_BYTES {
                return Err(ValidationError::DocumentTooLarge);
            }
            Ok("application/pdf")
        }
    }
}

/// Infer the attachment kind from a file extension, defaulting to image.
pub fn kind_for_path(path: &Path) -> AttachmentKind {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("pdf") => AttachmentKind::Document,
        _ => AttachmentKind::Image,
    }
}

/// One-at-a-time uploader. The busy flag mirrors the composer contract:
/// re-entrant uploads are refused, not queued.
#[derive(Default)]
pub struct Uploader {
    busy: bool,
}

impl Uploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Validate and upload one file. The busy flag is cleared on both the
    /// success and the failure path so the user can retry from scratch.
    pub async fn upload(
        &mut self,
        api: &ApiClient,
        path: &Path,
        kind: AttachmentKind,
    ) -> Result<UploadedFile, UploadError> {
        if self.busy {
            return Err(UploadError::Busy);
        }
        self.busy = true;
        let result = upload_inner(api, path, kind).await;
        self.busy = false;
        result
    }
}

async fn upload_inner(
    api: &ApiClient,
    path: &Path,
    kind: AttachmentKind,
) -> Result<UploadedFile, UploadError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mime = validate_bytes(&bytes, kind)?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("file")
        .to_string();

    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(filename)
        .mime_str(mime)?;
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = api.post(endpoint_for(kind)).multipart(form).send().await?;
    if !response.status().is_success() {
        return Err(UploadError::Status(response.status()));
    }

    let body: UploadResponse = response.json().await?;
    info!(kind = kind.label(), url = %body.url, "attachment uploaded");
    Ok(UploadedFile {
        url: body.url,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Encode a real image of the requested format, padded to a target size.
    fn image_bytes(format: ImageFormat, min_len: usize) -> Vec<u8> {
        let img = image::DynamicImage::new_rgb8(4, 4);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        // Trailing padding is ignored by the format sniffer.
        if bytes.len() < min_len {
            bytes.resize(min_len, 0);
        }
        bytes
    }

    #[test]
    fn test_small_jpeg_passes_as_image() {
        let bytes = image_bytes(ImageFormat::Jpeg, 4 * 1024 * 1024);
        assert_eq!(
            validate_bytes(&bytes, AttachmentKind::Image),
            Ok("image/jpeg")
        );
    }

    #[test]
    fn test_small_png_passes_as_image() {
        let bytes = image_bytes(ImageFormat::Png, 0);
        assert_eq!(
            validate_bytes(&bytes, AttachmentKind::Image),
            Ok("image/png")
        );
    }

    #[test]
    fn test_oversized_png_rejected_for_size() {
        let bytes = image_bytes(ImageFormat::Png, 6 * 1024 * 1024);
        assert_eq!(
            validate_bytes(&bytes, AttachmentKind::Image),
            Err(ValidationError::ImageTooLarge)
        );
    }

    #[test]
    fn test_unsupported_image_format_rejected() {
        let bytes = image_bytes(ImageFormat::Gif, 0);
        assert_eq!(
            validate_bytes(&bytes, AttachmentKind::Image),
            Err(ValidationError::UnsupportedImage)
        );
    }

    #[test]
    fn test_random_bytes_rejected_as_image() {
        assert_eq!(
            validate_bytes(b"definitely not an image", AttachmentKind::Image),
            Err(ValidationError::UnsupportedImage)
        );
    }

    #[test]
    fn test_pdf_magic_accepted_as_document() {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.extend_from_slice(&[0u8; 1024]);
        assert_eq!(
            validate_bytes(&bytes, AttachmentKind::Document),
            Ok("application/pdf")
        );
    }

    #[test]
    fn test_oversized_pdf_rejected_for_size() {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.resize(10 * 1024 * 1024 + 1, 0);
        assert_eq!(
            validate_bytes(&bytes, AttachmentKind::Document),
            Err(ValidationError::DocumentTooLarge)
        );
    }

    #[test]
    fn test_png_rejected_as_document() {
        let bytes = image_bytes(ImageFormat::Png, 0);
        assert_eq!(
            validate_bytes(&bytes, AttachmentKind::Document),
            Err(ValidationError::UnsupportedDocument)
        );
    }

    #[test]
    fn test_endpoints_per_kind() {
        assert_eq!(
            endpoint_for(AttachmentKind::Image),
            "/homework-ai-assistant/upload-image"
        );
        assert_eq!(
            endpoint_for(AttachmentKind::Document),
            "/homework-ai-assistant/upload-document"
        );
    }

    #[test]
    fn test_kind_inferred_from_extension() {
        assert_eq!(
            kind_for_path(Path::new("notes.pdf")),
            AttachmentKind::Document
        );
        assert_eq!(kind_for_path(Path::new("NOTES.PDF")), AttachmentKind::Document);
        assert_eq!(kind_for_path(Path::new("photo.jpg")), AttachmentKind::Image);
        assert_eq!(kind_for_path(Path::new("photo")), AttachmentKind::Image);
    }

    #[tokio::test]
    async fn test_invalid_file_fails_before_any_network_call() {
        // The base URL is unroutable; reaching the network would error
        // differently than the validation failure asserted here.
        let api = ApiClient::new("http://127.0.0.1:1", "tok");
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("big.png");
        tokio::fs::write(&path, image_bytes(ImageFormat::Png, 6 * 1024 * 1024))
            .await
            .unwrap();

        let mut uploader = Uploader::new();
        let err = uploader
            .upload(&api, &path, AttachmentKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Invalid(ValidationError::ImageTooLarge)
        ));
        // Ready for a retry.
        assert!(!uploader.is_busy());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let api = ApiClient::new("http://127.0.0.1:1", "tok");
        let mut uploader = Uploader::new();
        let err = uploader
            .upload(&api, Path::new("/no/such/file.png"), AttachmentKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));
        assert!(!uploader.is_busy());
    }
}

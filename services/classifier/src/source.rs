//! The image file a user picked for classification.

use crate::config::UploadConfig;
use crate::session::ValidationError;
use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::Path;

/// An image selected by the user, held in memory until it is uploaded
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Original file name, including extension
    pub name: String,
    /// MIME type of the contents
    pub content_type: String,
    /// Raw file contents
    pub bytes: Bytes,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, inferring the content type from its extension
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let content_type = path
            .extension()
            .map(|ext| content_type_for_extension(&ext.to_string_lossy()))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(Self::new(name, content_type, bytes))
    }

    /// Size of the contents in bytes
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lowercase extension used when naming the stored object.
    ///
    /// Names without a `.` fall back to the extension implied by the
    /// content type.
    pub fn extension(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
            _ => extension_for_content_type(&self.content_type).to_string(),
        }
    }

    /// Check the file against upload limits
    pub fn validate(&self, limits: &UploadConfig) -> Result<(), ValidationError> {
        if self.bytes.is_empty() {
            return Err(ValidationError::EmptyFile);
        }

        if self.size() > limits.max_file_bytes {
            return Err(ValidationError::FileTooLarge {
                size: self.size(),
                limit: limits.max_file_bytes,
            });
        }

        let accepted = limits
            .allowed_content_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&self.content_type));

        if !accepted {
            return Err(ValidationError::UnsupportedContentType(
                self.content_type.clone(),
            ));
        }

        Ok(())
    }
}

/// Get content type for an image file extension
pub fn content_type_for_extension(ext: &str) -> String {
    match ext.to_lowercase().as_str() {
        "jpeg" | "jpg" => "image/jpeg".to_string(),
        "png" => "image/png".to_string(),
        "webp" => "image/webp".to_string(),
        "bmp" => "image/bmp".to_string(),
        "gif" => "image/gif".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

fn extension_for_content_type(content_type: &str) -> &'static str {
    match content_type.to_lowercase().as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn jpeg(name: &str, len: usize) -> SourceFile {
        SourceFile::new(name, "image/jpeg", vec![0xFFu8; len])
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for_extension("jpeg"), "image/jpeg");
        assert_eq!(content_type_for_extension("JPG"), "image/jpeg");
        assert_eq!(content_type_for_extension("png"), "image/png");
        assert_eq!(content_type_for_extension("gif"), "image/gif");
        assert_eq!(content_type_for_extension("txt"), "application/octet-stream");
    }

    #[test]
    fn test_extension() {
        assert_eq!(jpeg("bottle.JPG", 1).extension(), "jpg");
        assert_eq!(jpeg("archive.tar.png", 1).extension(), "png");
        assert_eq!(jpeg("camera-capture", 1).extension(), "jpg");
        assert_eq!(jpeg("trailing.", 1).extension(), "jpg");
    }

    #[test]
    fn test_validate_accepts_supported_image() {
        assert!(jpeg("can.jpg", 512).validate(&UploadConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_file() {
        let err = jpeg("empty.jpg", 0)
            .validate(&UploadConfig::default())
            .unwrap_err();
        assert!(matches!(err, ValidationError::EmptyFile));
    }

    #[test]
    fn test_validate_rejects_oversized_file() {
        let limits = UploadConfig {
            max_file_bytes: 100,
            ..Default::default()
        };
        let err = jpeg("big.jpg", 101).validate(&limits).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::FileTooLarge { size: 101, limit: 100 }
        ));
    }

    #[test]
    fn test_validate_rejects_unsupported_type() {
        let file = SourceFile::new("notes.txt", "text/plain", "hello");
        let err = file.validate(&UploadConfig::default()).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedContentType(t) if t == "text/plain"));
    }

    #[tokio::test]
    async fn test_from_path_infers_content_type() {
        let mut file = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .unwrap();
        file.write_all(&[0x89, b'P', b'N', b'G']).unwrap();

        let source = SourceFile::from_path(file.path()).await.unwrap();

        assert_eq!(source.content_type, "image/png");
        assert_eq!(source.size(), 4);
        assert!(source.name.ends_with(".png"));
    }
}

//! Input acquisition: turn bytes, a local path, or a URL into an [`InputFile`].
//!
//! The declared media type drives decoding later on, so it is settled here:
//! from the caller, from the file extension, from the HTTP `Content-Type`,
//! or, as a last resort, by sniffing the first bytes.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Media type used when nothing better is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// One file of a batch. Immutable; cloning shares the content.
#[derive(Debug, Clone)]
pub struct InputFile {
    name: String,
    media_type: String,
    content: Arc<[u8]>,
}

impl InputFile {
    /// Wrap in-memory content with an explicit media type.
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        content: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            content: content.into(),
        }
    }

    /// Read a local file; the media type comes from its extension, or from
    /// its content when the extension is unknown.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConvertError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ConvertError::InvalidInput {
                input: format!("{}: {e}", path.display()),
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = media_type_for_name(&name)
            .map(str::to_string)
            .unwrap_or_else(|| sniff_media_type(&content).to_string());

        debug!("Read {} ({} bytes, {})", path.display(), content.len(), media_type);
        Ok(Self::from_bytes(name, media_type, content))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Declared MIME type, e.g. `image/svg+xml`.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn is_svg(&self) -> bool {
        self.media_type == "image/svg+xml"
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or HTTP(S) URL into an [`InputFile`].
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<InputFile, ConvertError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else if input.trim().is_empty() {
        Err(ConvertError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        InputFile::from_path(PathBuf::from(input)).await
    }
}

/// Media type implied by a file name's extension.
pub fn media_type_for_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let media_type = match ext.to_ascii_lowercase().as_str() {
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" | "jfif" | "jpe" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "xls" => "application/vnd.ms-excel",
        "ppt" => "application/vnd.ms-powerpoint",
        _ => return None,
    };
    Some(media_type)
}

/// Best-effort media type from content.
pub fn sniff_media_type(content: &[u8]) -> &'static str {
    if content.starts_with(b"%PDF") {
        return "application/pdf";
    }
    if let Ok(format) = image::guess_format(content) {
        return format.to_mime_type();
    }
    let head = &content[..content.len().min(512)];
    let head = String::from_utf8_lossy(head);
    let trimmed = head.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && head.contains("<svg")) {
        return "image/svg+xml";
    }
    OCTET_STREAM
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<InputFile, ConvertError> {
    info!("Downloading input from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ConvertError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ConvertError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty() && v != OCTET_STREAM);

    let name = extract_filename(url);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let media_type = header_type
        .or_else(|| media_type_for_name(&name).map(str::to_string))
        .unwrap_or_else(|| sniff_media_type(&bytes).to_string());

    info!("Downloaded {} ({} bytes, {})", name, bytes.len(), media_type);
    Ok(InputFile::from_bytes(name, media_type, bytes.to_vec()))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "download".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/logo.svg"));
        assert!(is_url("http://example.com/logo.svg"));
        assert!(!is_url("/tmp/logo.svg"));
        assert!(!is_url("logo.svg"));
        assert!(!is_url(""));
    }

    #[test]
    fn extension_media_types() {
        assert_eq!(media_type_for_name("a.SVG"), Some("image/svg+xml"));
        assert_eq!(media_type_for_name("a.jpeg"), Some("image/jpeg"));
        assert_eq!(media_type_for_name("report.xls"), Some("application/vnd.ms-excel"));
        assert_eq!(media_type_for_name("noext"), None);
        assert_eq!(media_type_for_name("a.xyz"), None);
    }

    #[test]
    fn sniffing() {
        assert_eq!(sniff_media_type(b"%PDF-1.7"), "application/pdf");
        assert_eq!(
            sniff_media_type(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            "image/png"
        );
        assert_eq!(
            sniff_media_type(br#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg"/>"#),
            "image/svg+xml"
        );
        assert_eq!(sniff_media_type(b"  <svg></svg>"), "image/svg+xml");
        assert_eq!(sniff_media_type(b""), OCTET_STREAM);
        assert_eq!(sniff_media_type(b"hello"), OCTET_STREAM);
    }

    #[test]
    fn extract_filename_from_url() {
        assert_eq!(extract_filename("https://x.org/img/logo.svg"), "logo.svg");
        assert_eq!(extract_filename("https://x.org/img/"), "download");
    }

    #[test]
    fn from_bytes_accessors() {
        let f = InputFile::from_bytes("a.svg", "image/svg+xml", b"<svg/>".to_vec());
        assert_eq!(f.name(), "a.svg");
        assert_eq!(f.size(), 6);
        assert!(f.is_svg());
        let g = f.clone();
        assert_eq!(g.bytes(), f.bytes());
    }

    #[tokio::test]
    async fn from_path_reads_and_types() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("shape.svg");
        std::fs::write(&p, "<svg xmlns='http://www.w3.org/2000/svg'/>").unwrap();
        let f = InputFile::from_path(&p).await.unwrap();
        assert_eq!(f.name(), "shape.svg");
        assert_eq!(f.media_type(), "image/svg+xml");
    }

    #[tokio::test]
    async fn from_path_sniffs_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("blob.bin");
        std::fs::write(&p, "<svg></svg>").unwrap();
        let f = InputFile::from_path(&p).await.unwrap();
        assert_eq!(f.media_type(), "image/svg+xml");
    }

    #[tokio::test]
    async fn missing_file_is_fatal() {
        let err = resolve_input("/definitely/not/here.png", 5).await.unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }
}

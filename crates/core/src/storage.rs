//! Storage reference parsing and content-type helpers.
//!
//! Reference photos and generated images are stored as strings in job and
//! style documents. Four shapes are recognized:
//!
//! - `gs://{bucket}/{path}`
//! - Firebase serving URLs: `https://firebasestorage.googleapis.com/v0/b/{bucket}/o/{encoded path}`
//! - Storage-root URLs: `https://storage.googleapis.com/{bucket}/{path}`
//! - Bare storage paths (`users/u1/front.jpg`), resolved against a default bucket

use percent_encoding::percent_decode_str;
use url::Url;

use crate::position::Position;

const GS_SCHEME: &str = "gs://";
const SERVING_HOST: &str = "firebasestorage.googleapis.com";
const STORAGE_ROOT_HOST: &str = "storage.googleapis.com";

/// Canonical `(bucket, path)` location of a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRef {
    pub bucket: String,
    pub path: String,
}

impl StorageRef {
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
        }
    }

    /// `gs://` form used when persisting references.
    pub fn to_gs_url(&self) -> String {
        format!("{GS_SCHEME}{}/{}", self.bucket, self.path)
    }
}

/// Resolve a stored reference to its `(bucket, path)` pair.
///
/// Returns `None` for anything that is neither a recognized URL shape nor a
/// plausible bare storage path.
pub fn parse_storage_reference(value: &str, default_bucket: &str) -> Option<StorageRef> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(rest) = value.strip_prefix(GS_SCHEME) {
        let (bucket, path) = rest.split_once('/')?;
        if bucket.is_empty() || path.is_empty() {
            return None;
        }
        return Some(StorageRef::new(bucket, path));
    }

    if value.starts_with("http://") || value.starts_with("https://") {
        return parse_http_reference(value);
    }

    // Bare storage path. Reject other schemes and data URLs.
    if value.contains("://") || value.starts_with("data:") || default_bucket.is_empty() {
        return None;
    }
    Some(StorageRef::new(default_bucket, value.trim_start_matches('/')))
}

fn parse_http_reference(value: &str) -> Option<StorageRef> {
    let url = Url::parse(value).ok()?;
    let host = url.host_str()?;
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

    if host.contains(SERVING_HOST) {
        let bucket_idx = segments.iter().position(|s| *s == "b")?;
        let object_idx = segments.iter().position(|s| *s == "o")?;
        let bucket = segments.get(bucket_idx + 1)?;
        let encoded = segments.get(object_idx + 1)?;
        let path = percent_decode_str(encoded).decode_utf8().ok()?;
        return Some(StorageRef::new(*bucket, path.into_owned()));
    }

    if host.contains(STORAGE_ROOT_HOST) && segments.len() >= 2 {
        let path = segments[1..]
            .iter()
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        return Some(StorageRef::new(segments[0], path));
    }

    None
}

/// Reduce a URL-shaped reference to its bare storage path.
///
/// Returns `None` when the value is already a bare path or cannot be parsed,
/// which lets callers skip documents that need no rewrite.
pub fn normalize_storage_path(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let is_url = trimmed.starts_with(GS_SCHEME)
        || trimmed.starts_with("http://")
        || trimmed.starts_with("https://");
    if !is_url {
        return None;
    }
    parse_storage_reference(trimmed, "")
        .map(|r| r.path)
        .filter(|p| p != value)
}

/// Deterministic blob path of a generated image.
pub fn generated_image_path(user_id: &str, job_id: &str, position: Position) -> String {
    format!("generated/{user_id}/{job_id}_{position}.png")
}

/// Infer an image content type from a path's extension.
pub fn infer_content_type(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Pick the content type for downloaded image bytes.
///
/// A stored `image/*` type wins; otherwise the bytes are sniffed, and the
/// extension is the last resort.
pub fn normalize_content_type(stored: Option<&str>, path: &str, bytes: &[u8]) -> String {
    if let Some(ct) = stored.filter(|ct| ct.starts_with("image/")) {
        return ct.to_string();
    }
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    infer_content_type(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKET: &str = "barb-cut.appspot.com";

    #[test]
    fn parses_gs_reference() {
        let parsed = parse_storage_reference("gs://my-bucket/users/u1/front.jpg", BUCKET).unwrap();
        assert_eq!(parsed, StorageRef::new("my-bucket", "users/u1/front.jpg"));
    }

    #[test]
    fn gs_reference_without_path_is_rejected() {
        assert!(parse_storage_reference("gs://my-bucket", BUCKET).is_none());
        assert!(parse_storage_reference("gs://my-bucket/", BUCKET).is_none());
    }

    #[test]
    fn parses_serving_url_with_encoded_path() {
        let url = "https://firebasestorage.googleapis.com/v0/b/barb-cut.appspot.com/o/users%2Fu1%2Ffront.jpg?alt=media&token=abc";
        let parsed = parse_storage_reference(url, "other").unwrap();
        assert_eq!(parsed, StorageRef::new("barb-cut.appspot.com", "users/u1/front.jpg"));
    }

    #[test]
    fn parses_storage_root_url() {
        let url = "https://storage.googleapis.com/my-bucket/styles/fade/front.png";
        let parsed = parse_storage_reference(url, BUCKET).unwrap();
        assert_eq!(parsed, StorageRef::new("my-bucket", "styles/fade/front.png"));
    }

    #[test]
    fn bare_path_uses_default_bucket() {
        let parsed = parse_storage_reference("users/u1/left.png", BUCKET).unwrap();
        assert_eq!(parsed, StorageRef::new(BUCKET, "users/u1/left.png"));
    }

    #[test]
    fn unknown_shapes_are_rejected() {
        assert!(parse_storage_reference("https://example.com/image.png", BUCKET).is_none());
        assert!(parse_storage_reference("ftp://host/file.png", BUCKET).is_none());
        assert!(parse_storage_reference("data:image/png;base64,AAAA", BUCKET).is_none());
        assert!(parse_storage_reference("   ", BUCKET).is_none());
    }

    #[test]
    fn normalize_rewrites_urls_only() {
        assert_eq!(
            normalize_storage_path("gs://b/styles/x/front.png").as_deref(),
            Some("styles/x/front.png")
        );
        assert_eq!(normalize_storage_path("styles/x/front.png"), None);
        assert_eq!(normalize_storage_path("https://example.com/a.png"), None);
    }

    #[test]
    fn generated_path_is_deterministic() {
        assert_eq!(
            generated_image_path("u1", "job9", Position::Back),
            "generated/u1/job9_back.png"
        );
        assert_eq!(
            StorageRef::new(BUCKET, "generated/u1/job9_back.png").to_gs_url(),
            "gs://barb-cut.appspot.com/generated/u1/job9_back.png"
        );
    }

    #[test]
    fn content_type_prefers_stored_then_sniffed_then_extension() {
        assert_eq!(normalize_content_type(Some("image/webp"), "a.png", b""), "image/webp");
        let png_header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(
            normalize_content_type(Some("application/octet-stream"), "a.jpg", &png_header),
            "image/png"
        );
        assert_eq!(normalize_content_type(None, "a.WEBP", b"????"), "image/webp");
        assert_eq!(normalize_content_type(None, "a", b"????"), "image/jpeg");
    }
}

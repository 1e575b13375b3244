//! Blob storage for product, profile and advert images.
//!
//! Images arrive as base64 strings in JSON bodies. A backend stores the
//! decoded bytes under `<folder>/<name>` and hands back that key; downloads
//! re-encode to base64.
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use thiserror::Error;

pub mod local;
pub mod memory;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image payload is not valid base64")]
    InvalidEncoding,
    #[error("image payload is empty")]
    Empty,
    #[error("invalid image key: {0}")]
    InvalidKey(String),
    #[error("image not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ImageResult<T> = Result<T, ImageError>;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `data` (base64) and return its key.
    async fn upload(&self, folder: &str, name: &str, data: &str) -> ImageResult<String>;
    /// Return the stored image as base64.
    async fn download(&self, key: &str) -> ImageResult<String>;
    async fn delete(&self, key: &str) -> ImageResult<()>;
    fn backend_name(&self) -> &'static str;
}

/// Decode a base64 payload, tolerating data-URL prefixes and missing padding.
pub fn decode_image(data: &str) -> ImageResult<Vec<u8>> {
    let trimmed = data.trim();
    let payload = match trimmed.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => trimmed,
    };
    let bytes = STANDARD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .map_err(|_| ImageError::InvalidEncoding)?;
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    Ok(bytes)
}

pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Build `<folder>/<name>` from sanitized path segments.
pub fn image_key(folder: &str, name: &str) -> ImageResult<String> {
    let folder = sanitize_segment(folder);
    let name = sanitize_segment(name);
    if folder.is_empty() || name.is_empty() {
        return Err(ImageError::InvalidKey(format!("{folder}/{name}")));
    }
    Ok(format!("{folder}/{name}"))
}

fn sanitize_segment(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

/// Reject keys that could escape the storage root.
pub(crate) fn check_key(key: &str) -> ImageResult<()> {
    let valid = !key.is_empty()
        && key.split('/').count() == 2
        && key
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..");
    if valid {
        Ok(())
    } else {
        Err(ImageError::InvalidKey(key.to_string()))
    }
}

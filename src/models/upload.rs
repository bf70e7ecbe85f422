// src/models/upload.rs

use serde::{Deserialize, Serialize};

/// One image file received with a submission, held in memory until it is
/// handed to the normalizer
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Filename declared by the client; kept only as metadata
    pub filename: String,
    /// Raw bytes as uploaded
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Persisted reference to a normalized image
/// DOCUMENTATION: `path` is relative to the media root and is what clients
/// later turn into a public URL; the stored file itself has a generated name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedImageRef {
    pub path: String,
    pub original_filename: String,
}

impl NormalizedImageRef {
    /// Public URL of the image under `base_url` (e.g. "http://host/")
    /// DOCUMENTATION: Already absolute https references pass through untouched
    pub fn public_url(&self, base_url: &str) -> String {
        if self.path.starts_with("https://") || self.path.starts_with("http://") {
            return self.path.clone();
        }
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.path.trim_start_matches("../").trim_start_matches('/')
        )
    }
}

// src/utils/image.rs

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

use crate::error::AppError;

/// An avatar as it is stored: raw bytes plus the data-URI prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Everything before the first comma, e.g. `data:image/png;base64`.
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Splits a data-URI (`<mime>,<base64>`) into its prefix and decoded bytes.
pub fn decode_data_uri(value: &str) -> Result<StoredImage, AppError> {
    let (mime, payload) = value.split_once(',').ok_or_else(|| {
        AppError::field(
            "image",
            "data_uri",
            "The image must be a data URI of the form <mime>,<base64>.".to_string(),
        )
    })?;

    let bytes = BASE64_STANDARD.decode(payload.trim()).map_err(|_| {
        AppError::field(
            "image",
            "base64",
            "The image payload is not valid base64.".to_string(),
        )
    })?;

    Ok(StoredImage {
        mime: mime.to_string(),
        bytes,
    })
}

/// Reassembles the data-URI served to clients.
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("{},{}", mime, BASE64_STANDARD.encode(bytes))
}

//! Data URI encoding and size formatting.

use std::path::Path;

use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use super::UploadError;

// Stored payloads are not always padded; older records were cut mid-quantum.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const FALLBACK_MIME: &str = "application/octet-stream";

const SIZE_UNITS: [&str; 3] = ["Bytes", "KB", "MB"];

/// Encode file content as a `data:<mime>;base64,<payload>` URI.
pub fn encode_data_uri(bytes: &[u8], mime_type: &str) -> String {
    let mime = if mime_type.is_empty() {
        FALLBACK_MIME
    } else {
        mime_type
    };
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Read a whole file from disk and encode it as a data URI.
pub fn read_file_encoded<P: AsRef<Path>>(path: P, mime_type: &str) -> Result<String, UploadError> {
    let bytes = std::fs::read(path)?;
    Ok(encode_data_uri(&bytes, mime_type))
}

/// Split a base64 data URI back into its MIME type and content.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), UploadError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| UploadError::InvalidDataUri("missing data: prefix".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| UploadError::InvalidDataUri("missing payload separator".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| UploadError::InvalidDataUri("not base64 encoded".into()))?;

    let bytes = LENIENT
        .decode(payload)
        .map_err(|e| UploadError::InvalidDataUri(e.to_string()))?;

    let mime = if mime.is_empty() { FALLBACK_MIME } else { mime };
    Ok((mime.to_string(), bytes))
}

/// Format a byte count as `"<value> <unit>"`, e.g. `"1.5 KB"`.
///
/// The unit is `floor(log_1024(bytes))` clamped to MB; the value is
/// rounded to two decimals with trailing zeros dropped.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut exponent = 0;
    while exponent + 1 < SIZE_UNITS.len() && bytes >= 1024u64.pow(exponent as u32 + 1) {
        exponent += 1;
    }

    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[exponent])
}

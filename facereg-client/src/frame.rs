//! Frame encoding: image → `data:image/jpeg;base64,...`

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::error::{ClientError, Result};

pub const JPEG_QUALITY: u8 = 80;
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Encode a frame as a JPEG data URI at [`JPEG_QUALITY`]
pub fn encode_data_uri(frame: &DynamicImage) -> Result<String> {
    // JPEG has no alpha channel
    let rgb = frame.to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode_image(&rgb)?;

    let mut uri = String::with_capacity(JPEG_DATA_URI_PREFIX.len() + jpeg.len() * 4 / 3 + 4);
    uri.push_str(JPEG_DATA_URI_PREFIX);
    STANDARD.encode_string(&jpeg, &mut uri);
    Ok(uri)
}

/// Decode any `data:<mime>;base64,<payload>` image URI
pub fn decode_data_uri(uri: &str) -> Result<DynamicImage> {
    let payload = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_mime, payload)| payload)
        .ok_or_else(|| ClientError::Decode("not a base64 data URI".to_string()))?;

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ClientError::Decode(e.to_string()))?;
    Ok(image::load_from_memory(&bytes)?)
}

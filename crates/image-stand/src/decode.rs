//! Image decoding from raw and base64-encoded bytes.

use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::types::{StandError, StandResult};

/// Map a MIME hint to a decoder format.
fn format_for_mime(mime: &str) -> Option<ImageFormat> {
    match mime {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/webp" => Some(ImageFormat::WebP),
        "image/gif" => Some(ImageFormat::Gif),
        _ => None,
    }
}

/// Decode image bytes, sniffing the format from content.
pub fn decode_image(bytes: &[u8]) -> StandResult<DynamicImage> {
    decode_image_with_mime(bytes, None)
}

/// Decode image bytes using an optional MIME hint.
///
/// Unknown hints fall back to content sniffing. Empty input and images with
/// a zero dimension are rejected.
pub fn decode_image_with_mime(bytes: &[u8], mime: Option<&str>) -> StandResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(StandError::Decode("image data is empty".to_string()));
    }

    let img = match mime.and_then(format_for_mime) {
        Some(fmt) => image::load_from_memory_with_format(bytes, fmt)?,
        None => image::load_from_memory(bytes)?,
    };

    ensure_non_empty(&img)?;
    Ok(img)
}

/// Decode base64 image data.
pub fn decode_base64_image(data: &str, mime: Option<&str>) -> StandResult<DynamicImage> {
    let bytes = decode_base64(data)?;
    decode_image_with_mime(&bytes, mime)
}

/// Decode standard base64 text into bytes.
pub fn decode_base64(data: &str) -> StandResult<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| StandError::Decode(format!("Invalid base64: {e}")))
}

/// Reject images with a zero dimension.
pub fn ensure_non_empty(img: &DynamicImage) -> StandResult<()> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(StandError::Decode(format!("image has zero dimension ({w}x{h})")));
    }
    Ok(())
}

/// Guess a file extension from image magic bytes.
pub fn sniff_extension(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "png",
        Ok(ImageFormat::Jpeg) => "jpg",
        Ok(ImageFormat::WebP) => "webp",
        Ok(ImageFormat::Gif) => "gif",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(w, h);
        let mut buf = Vec::new();
        img.write_with_encoder(image::codecs::png::PngEncoder::new(&mut buf))
            .unwrap();
        buf
    }

    #[test]
    fn test_decode_png() {
        let img = decode_image(&png_bytes(12, 7)).unwrap();
        assert_eq!(img.dimensions(), (12, 7));
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, StandError::Decode(_)));
    }

    #[test]
    fn test_decode_empty_is_decode_error() {
        assert!(matches!(decode_image(&[]), Err(StandError::Decode(_))));
    }

    #[test]
    fn test_unknown_mime_falls_back_to_sniffing() {
        let img = decode_image_with_mime(&png_bytes(3, 3), Some("application/x-unknown")).unwrap();
        assert_eq!(img.dimensions(), (3, 3));
    }

    #[test]
    fn test_decode_base64() {
        use base64::Engine;
        let b64 = base64::engine::general_purpose::STANDARD.encode(png_bytes(4, 4));
        assert!(decode_base64_image(&b64, Some("image/png")).is_ok());
        assert!(matches!(
            decode_base64_image("@@not-base64@@", None),
            Err(StandError::Decode(_))
        ));
    }

    #[test]
    fn test_sniff_extension() {
        assert_eq!(sniff_extension(&png_bytes(1, 1)), "png");
        assert_eq!(sniff_extension(b"xyz"), "bin");
    }
}

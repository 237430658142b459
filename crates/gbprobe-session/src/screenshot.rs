use image::ImageFormat;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

// Zero-length IEND chunk with its fixed CRC.
const IEND_CHUNK: [u8; 12] = [
    0x00, 0x00, 0x00, 0x00, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Debug, thiserror::Error)]
pub enum ImageValidationError {
    #[error("missing PNG signature")]
    Signature,
    #[error("missing IEND chunk (image truncated)")]
    Trailer,
    #[error("PNG decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

pub fn validate_png(bytes: &[u8]) -> Result<ImageInfo, ImageValidationError> {
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return Err(ImageValidationError::Signature);
    }
    if bytes.len() < PNG_SIGNATURE.len() + IEND_CHUNK.len() || !bytes.ends_with(&IEND_CHUNK) {
        return Err(ImageValidationError::Trailer);
    }
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    Ok(ImageInfo {
        width: decoded.width(),
        height: decoded.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let frame = image::RgbImage::from_pixel(width, height, image::Rgb([0x9b, 0xbc, 0x0f]));
        let mut out = Cursor::new(Vec::new());
        frame
            .write_to(&mut out, ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn accepts_encoded_frame() {
        let info = validate_png(&encode_png(160, 144)).expect("valid png");
        assert_eq!(info, ImageInfo { width: 160, height: 144 });
    }

    #[test]
    fn rejects_bare_signature() {
        let err = validate_png(&PNG_SIGNATURE).unwrap_err();
        assert!(matches!(err, ImageValidationError::Trailer));
    }

    #[test]
    fn rejects_other_formats() {
        let err = validate_png(b"GIF89a\x01\x00\x01\x00").unwrap_err();
        assert!(matches!(err, ImageValidationError::Signature));
    }

    #[test]
    fn rejects_truncated_frame() {
        let png = encode_png(16, 16);
        let err = validate_png(&png[..png.len() - 20]).unwrap_err();
        assert!(matches!(err, ImageValidationError::Trailer));
    }

    #[test]
    fn rejects_corrupt_body_with_intact_trailer() {
        let mut png = encode_png(16, 16);
        // IHDR width field.
        png[16..20].copy_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        let err = validate_png(&png).unwrap_err();
        assert!(matches!(err, ImageValidationError::Decode(_)));
    }
}

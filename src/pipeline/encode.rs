//! Image encoding: raw upload or rendered pages → base64 [`EncodedPayload`].
//!
//! Raster uploads are forwarded byte-for-byte. PDF pages are JPEG-encoded
//! first. Both are tagged `image/jpeg`; the data-URI MIME is not derived from
//! the source format.

use crate::error::DocExtractError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// MIME tag attached to every payload.
pub const PAYLOAD_MIME: &str = "image/jpeg";

/// Ordered base64 images plus their MIME tag; one entry per page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedPayload {
    pub mime_type: String,
    pub images: Vec<String>,
}

impl EncodedPayload {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Total base64 characters across all images.
    pub fn total_bytes(&self) -> usize {
        self.images.iter().map(String::len).sum()
    }

    /// `data:<mime>;base64,<payload>` URIs in page order.
    pub fn data_urls(&self) -> impl Iterator<Item = String> + '_ {
        self.images
            .iter()
            .map(move |b64| format!("data:{};base64,{}", self.mime_type, b64))
    }
}

/// Encode raw raster bytes as a single-image payload, unchanged.
pub fn encode_raster(bytes: &[u8]) -> EncodedPayload {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded raster upload → {} bytes base64", b64.len());
    EncodedPayload {
        mime_type: PAYLOAD_MIME.to_string(),
        images: vec![b64],
    }
}

/// JPEG-encode one rendered page and return it as base64.
///
/// JPEG has no alpha channel, so the bitmap is flattened to RGB first.
pub fn encode_page(img: &DynamicImage, quality: u8) -> Result<String, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page {}x{} → {} bytes base64", rgb.width(), rgb.height(), b64.len());
    Ok(b64)
}

/// Encode rendered pages in order. Index `i` of the payload is page `i`.
pub fn encode_pages(pages: &[DynamicImage], quality: u8) -> Result<EncodedPayload, DocExtractError> {
    let images = pages
        .iter()
        .enumerate()
        .map(|(idx, img)| {
            encode_page(img, quality).map_err(|e| DocExtractError::ImageEncodingFailed {
                page: idx,
                detail: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EncodedPayload {
        mime_type: PAYLOAD_MIME.to_string(),
        images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn raster_roundtrips_original_bytes() {
        let bytes = b"\x89PNG\r\n\x1a\nnot-really-a-png".to_vec();
        let payload = encode_raster(&bytes);
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(STANDARD.decode(&payload.images[0]).unwrap(), bytes);
    }

    #[test]
    fn rgba_page_encodes_as_jpeg() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 128])));
        let b64 = encode_page(&img, 90).expect("encode should succeed");
        let decoded = STANDARD.decode(&b64).expect("valid base64");
        // JPEG SOI marker
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn pages_keep_order() {
        let pages: Vec<DynamicImage> = (1..=3)
            .map(|w| DynamicImage::ImageRgba8(RgbaImage::from_pixel(w * 8, 8, Rgba([0, 0, 0, 255]))))
            .collect();
        let payload = encode_pages(&pages, 80).unwrap();
        assert_eq!(payload.len(), 3);
        for (i, b64) in payload.images.iter().enumerate() {
            let decoded = STANDARD.decode(b64).unwrap();
            let img = image::load_from_memory(&decoded).unwrap();
            assert_eq!(img.width(), (i as u32 + 1) * 8);
        }
    }

    #[test]
    fn data_urls_carry_mime() {
        let payload = encode_raster(b"abc");
        let urls: Vec<_> = payload.data_urls().collect();
        assert_eq!(urls, vec!["data:image/jpeg;base64,YWJj".to_string()]);
    }
}

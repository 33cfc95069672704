//! Upload images are shrunk to fit a square box, re-encoded as JPEG and
//! stored inline as pure base64.

use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use karat_core::KaratError;

pub const DEFAULT_MAX_BYTES: usize = 900 * 1024;
pub const DEFAULT_MAX_DIMENSION: u32 = 900;
pub const DEFAULT_QUALITY: u8 = 75;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageOptions {
    /// Largest re-encoded image accepted.
    pub max_bytes: usize,
    /// Width and height bound. Smaller images are never upscaled.
    pub max_dimension: u32,
    /// JPEG quality, 1 to 100.
    pub quality: u8,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl ImageOptions {
    /// Accept base64 or a `data:` URL and return canonical JPEG base64
    /// without any prefix.
    pub fn normalize(&self, input: &str) -> anyhow::Result<String> {
        let payload = strip_data_url(input.trim());
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if compact.is_empty() {
            return Err(invalid("image is required"));
        }
        let bytes = general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| invalid(format!("image is not valid base64: {e}")))?;
        self.encode(&bytes)
    }

    /// Decode raw upload bytes, fit them inside `max_dimension` and return
    /// the JPEG as base64.
    pub fn encode(&self, bytes: &[u8]) -> anyhow::Result<String> {
        if bytes.is_empty() {
            return Err(invalid("image is required"));
        }
        let decoded =
            image::load_from_memory(bytes).map_err(|e| invalid(format!("image could not be decoded: {e}")))?;
        let jpeg = self.to_jpeg(self.fit(decoded))?;
        if jpeg.len() > self.max_bytes {
            return Err(invalid(format!(
                "image is {} bytes, the limit is {}",
                jpeg.len(),
                self.max_bytes
            )));
        }
        Ok(general_purpose::STANDARD.encode(jpeg))
    }

    fn fit(&self, img: DynamicImage) -> DynamicImage {
        let max = self.max_dimension.max(1);
        if img.width() <= max && img.height() <= max {
            return img;
        }
        img.resize(max, max, FilterType::Triangle)
    }

    fn to_jpeg(&self, img: DynamicImage) -> anyhow::Result<Vec<u8>> {
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut out = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut out, self.quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|e| KaratError::general_error(format!("image could not be encoded: {e}")).into_anyhow())?;
        Ok(out.into_inner())
    }
}

fn strip_data_url(input: &str) -> &str {
    if !input.starts_with("data:") {
        return input;
    }
    input.split_once(',').map(|(_, rest)| rest).unwrap_or("")
}

fn invalid(message: impl Into<String>) -> anyhow::Error {
    KaratError::unprocessable("Image upload rejected")
        .with_errors(serde_json::json!({ "image": [message.into()] }))
        .into_anyhow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::png_base64;
    use image::ImageFormat;

    fn dimensions(b64: &str) -> (u32, u32) {
        let bytes = general_purpose::STANDARD.decode(b64).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let img = image::load_from_memory(&bytes).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn strips_data_url_prefix() {
        let opts = ImageOptions::default();
        let raw = png_base64(4, 4);
        let out = opts.normalize(&format!("data:image/png;base64,{raw}")).unwrap();
        assert!(!out.starts_with("data:"));
        assert!(out.starts_with("/9j/"));
        assert_eq!(opts.normalize(&raw).unwrap(), out);
    }

    #[test]
    fn large_images_shrink_to_fit_keeping_aspect() {
        let opts = ImageOptions::default();
        let out = opts.normalize(&png_base64(1800, 1200)).unwrap();
        assert_eq!(dimensions(&out), (900, 600));

        let out = opts.normalize(&png_base64(300, 2700)).unwrap();
        assert_eq!(dimensions(&out), (100, 900));
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let opts = ImageOptions::default();
        let out = opts.normalize(&png_base64(120, 80)).unwrap();
        assert_eq!(dimensions(&out), (120, 80));
    }

    #[test]
    fn rejects_oversized_and_garbage() {
        let opts = ImageOptions {
            max_bytes: 16,
            ..ImageOptions::default()
        };
        assert!(opts.normalize(&png_base64(8, 8)).is_err());

        let opts = ImageOptions::default();
        let err = opts.encode(b"\xff\xd8\xff\xe0jpeg").unwrap_err();
        assert_eq!(
            KaratError::find_in(&err).map(|e| e.kind),
            Some(karat_core::ErrorKind::Unprocessable)
        );
        assert!(opts.normalize("not base64!!").is_err());
        assert!(opts.normalize("data:image/png;base64,").is_err());
    }
}

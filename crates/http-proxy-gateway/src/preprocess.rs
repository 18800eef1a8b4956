// Path: crates/http-proxy-gateway/src/preprocess.rs
//! The fixed decode + resize transform applied to every inbound image before
//! it is sent to workers.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{imageops::FilterType, ImageFormat, RgbImage};
use std::io::Cursor;
use vproxy_types::error::DecodeError;

#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    size: u32,
}

impl ImagePreprocessor {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    /// Decodes a base64 image, converts it to RGB and centre-crops it to a
    /// `size × size` square.
    pub fn preprocess(&self, encoded: &str) -> Result<PreprocessedImage, DecodeError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| DecodeError::Base64(e.to_string()))?;
        let decoded =
            image::load_from_memory(&bytes).map_err(|e| DecodeError::Image(e.to_string()))?;
        let rgb = decoded
            .resize_to_fill(self.size, self.size, FilterType::Triangle)
            .to_rgb8();
        Ok(PreprocessedImage { rgb })
    }
}

pub struct PreprocessedImage {
    rgb: RgbImage,
}

impl PreprocessedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.rgb.dimensions()
    }

    /// Base64 PNG, the wire form workers receive.
    pub fn to_png_base64(&self) -> Result<String, DecodeError> {
        let mut bytes: Vec<u8> = Vec::new();
        self.rgb
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| DecodeError::Encode(e.to_string()))?;
        Ok(BASE64.encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbaImage};

    fn encoded_png(width: u32, height: u32) -> String {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        BASE64.encode(bytes)
    }

    #[test]
    fn output_is_a_square_rgb_png() {
        let pre = ImagePreprocessor::new(32);
        let image = pre.preprocess(&encoded_png(80, 40)).unwrap();
        assert_eq!(image.dimensions(), (32, 32));

        let wire = BASE64.decode(image.to_png_base64().unwrap()).unwrap();
        let back = image::load_from_memory_with_format(&wire, ImageFormat::Png)
            .unwrap()
            .to_rgb8();
        assert_eq!(back.dimensions(), (32, 32));
        assert_eq!(*back.get_pixel(16, 16), Rgb([200, 10, 10]));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let pre = ImagePreprocessor::new(32);
        assert!(matches!(
            pre.preprocess("***"),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn non_image_bytes_are_rejected() {
        let pre = ImagePreprocessor::new(32);
        let not_an_image = BASE64.encode(b"definitely not a picture");
        assert!(matches!(
            pre.preprocess(&not_an_image),
            Err(DecodeError::Image(_))
        ));
    }
}

//! The module contains the `Photo` payload attached to items and the
//! downsampling applied to every captured image before it is kept.
use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, codecs::jpeg::JpegEncoder, imageops::FilterType};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Encoded image as a base64 data URL, the form persisted records carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Photo(String);

impl Photo {
    /// Wrap an already encoded data URL.
    pub fn from_data_url(data_url: impl Into<String>) -> Self {
        Self(data_url.into())
    }

    pub fn as_data_url(&self) -> &str {
        &self.0
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode the payload back into pixels.
    pub fn decode(&self) -> ResultEngine<DynamicImage> {
        let (_, payload) = self
            .0
            .split_once(";base64,")
            .ok_or_else(|| EngineError::Validation("photo is not a base64 data url".to_string()))?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|err| EngineError::Validation(format!("invalid photo payload: {err}")))?;
        Ok(image::load_from_memory(&bytes)?)
    }
}

/// Downsampling parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoOptions {
    /// Cap on the long edge, in pixels.
    pub max_dimension: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for PhotoOptions {
    fn default() -> Self {
        Self {
            max_dimension: 800,
            quality: 70,
        }
    }
}

/// Downsample and re-encode an image.
pub fn encode(image: &DynamicImage, options: &PhotoOptions) -> ResultEngine<Photo> {
    let max = options.max_dimension.max(1);
    let resized;
    let image = if image.width() > max || image.height() > max {
        resized = image.resize(max, max, FilterType::Triangle);
        &resized
    } else {
        image
    };

    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, options.quality.clamp(1, 100))
        .encode_image(&image.to_rgb8())?;

    let encoded = STANDARD.encode(buffer.into_inner());
    tracing::debug!(
        "encoded photo {}x{} into {} bytes",
        image.width(),
        image.height(),
        encoded.len()
    );
    Ok(Photo(format!("{DATA_URL_PREFIX}{encoded}")))
}

/// Decode an image file (any supported format) and downsample it.
pub fn encode_file(bytes: &[u8], options: &PhotoOptions) -> ResultEngine<Photo> {
    let image = image::load_from_memory(bytes)?;
    encode(&image, options)
}

/// Centered square crop.
pub fn crop_square(image: &DynamicImage) -> DynamicImage {
    let side = image.width().min(image.height());
    let x = (image.width() - side) / 2;
    let y = (image.height() - side) / 2;
    image.crop_imm(x, y, side, side)
}

#[cfg(test)]
mod tests {
    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn large_images_are_capped_on_long_edge() {
        let photo = encode(&gradient(1600, 1200), &PhotoOptions::default()).unwrap();

        assert!(photo.as_data_url().starts_with("data:image/jpeg;base64,"));
        let decoded = photo.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 600));
    }

    #[test]
    fn small_images_keep_their_size() {
        let photo = encode(&gradient(120, 60), &PhotoOptions::default()).unwrap();
        let decoded = photo.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 60));
    }

    #[test]
    fn files_are_decoded_and_reencoded() {
        let mut png = Cursor::new(Vec::new());
        gradient(1000, 2000)
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();
        let options = PhotoOptions {
            max_dimension: 600,
            quality: 60,
        };

        let photo = encode_file(png.get_ref(), &options).unwrap();

        let decoded = photo.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300, 600));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            encode_file(b"not an image", &PhotoOptions::default()),
            Err(EngineError::Image(_))
        ));
        assert!(Photo::from_data_url("nope").decode().is_err());
    }

    #[test]
    fn crop_square_is_centered() {
        let square = crop_square(&gradient(400, 300));
        assert_eq!((square.width(), square.height()), (300, 300));
    }
}

//! Collaborators that deal with pixels: DICOM decoding and the render surface
//!
//! The hosting core never looks at image content; everything pixel-related
//! the viewer needs lives behind the traits in this module.

use std::path::{Path, PathBuf};

use dicom_pixeldata::image::{self as img, DynamicImage};
use dicom_pixeldata::PixelDecoder;
use thiserror::Error;

pub mod surface;

pub use surface::{HeadlessSurface, RenderSurface, SurfaceSnapshot};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("File does not exist: {0}")]
    NotFound(PathBuf),
    #[error("open dicom: {0}")]
    Open(String),
    #[error("decode pixel data: {0}")]
    Pixel(String),
    #[error("to image: {0}")]
    Image(String),
    #[error("jpeg encode: {0}")]
    Encode(String),
}

/// One decoded frame
#[derive(Debug, Clone)]
pub struct Frame {
    image: DynamicImage,
}

impl Frame {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Encode as 8-bit RGB JPEG
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, DecodeError> {
        let rgb = self.image.to_rgb8();
        let mut buf: Vec<u8> = Vec::new();
        let mut enc = img::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
        enc.encode_image(&rgb)
            .map_err(|e| DecodeError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

/// Turns a stored object into a displayable frame
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Frame, DecodeError>;
}

/// Decoder backed by `dicom-object` and `dicom-pixeldata`; shows frame 0
#[derive(Debug, Clone, Default)]
pub struct DicomDecoder;

impl DicomDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl ImageDecoder for DicomDecoder {
    fn decode(&self, path: &Path) -> Result<Frame, DecodeError> {
        if !path.exists() {
            return Err(DecodeError::NotFound(path.to_path_buf()));
        }
        let obj = dicom_object::open_file(path).map_err(|e| DecodeError::Open(e.to_string()))?;
        let pixel_data = obj
            .decode_pixel_data()
            .map_err(|e| DecodeError::Pixel(e.to_string()))?;
        let image = pixel_data
            .to_dynamic_image(0)
            .map_err(|e| DecodeError::Image(e.to_string()))?;
        Ok(Frame::new(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let err = DicomDecoder::new()
            .decode(Path::new("/nonexistent/dah/a.dcm"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::NotFound(_)));
    }

    #[test]
    fn test_not_a_dicom_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.dcm");
        std::fs::write(&path, b"definitely not DICOM").unwrap();
        let err = DicomDecoder::new().decode(&path).unwrap_err();
        assert!(matches!(err, DecodeError::Open(_)));
    }

    #[test]
    fn test_jpeg_encoding() {
        let frame = Frame::new(DynamicImage::new_luma8(8, 4));
        let jpeg = frame.to_jpeg(90).unwrap();
        // JPEG SOI marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!((frame.width(), frame.height()), (8, 4));
    }
}

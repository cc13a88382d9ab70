use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use std::fmt;
use std::io::Cursor;
use std::path::Path;

use crate::error::{AxeraError, Result};

/// An image as it travels to and from the Axera service: PNG bytes.
///
/// Every constructor normalizes to PNG, so whatever the source encoding was
/// (JPEG, WebP, ...) the wire form is always a base64 PNG stream. Once an
/// `ImageData` exists its bytes are never re-encoded, which gives the
/// round-trip law `ImageData::from_base64(&img.to_base64()) == img`.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    png: Vec<u8>,
}

impl ImageData {
    /// Wrap encoded image bytes, transcoding to PNG when they are not PNG.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        match image::guess_format(&bytes) {
            Ok(ImageFormat::Png) => Ok(Self { png: bytes }),
            Ok(format) => {
                log::debug!("transcoding {:?} image ({} bytes) to PNG", format, bytes.len());
                let decoded = image::load_from_memory_with_format(&bytes, format)?;
                Self::from_dynamic(&decoded)
            }
            Err(e) => Err(AxeraError::Image(format!("unrecognized image format: {}", e))),
        }
    }

    /// Encode an in-memory image as PNG.
    pub fn from_dynamic(img: &DynamicImage) -> Result<Self> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png)?;
        Ok(Self {
            png: buf.into_inner(),
        })
    }

    /// Read an image file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| AxeraError::Image(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(bytes)
    }

    /// Decode a base64 image as returned by the service.
    ///
    /// A leading `data:image/...;base64,` prefix is tolerated.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let trimmed = encoded.trim();
        let payload = match trimmed.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => trimmed,
        };
        let bytes = STANDARD.decode(payload)?;
        Self::from_bytes(bytes)
    }

    /// Base64 of the PNG bytes, the form sent in request payloads.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }

    pub fn as_png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn into_png_bytes(self) -> Vec<u8> {
        self.png
    }

    /// Size of the encoded PNG in bytes.
    pub fn len(&self) -> usize {
        self.png.len()
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }

    /// Pixel dimensions `(width, height)`. Decodes the PNG.
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        let img = image::load_from_memory_with_format(&self.png, ImageFormat::Png)?;
        Ok((img.width(), img.height()))
    }

    /// Write the PNG bytes to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.png)?;
        Ok(())
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

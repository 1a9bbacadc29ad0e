use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

use crate::error::{EncodeError, PixelError};

/// Single channel 8-bit grayscale image, one byte per pixel in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRaster {
    rows: u32,
    columns: u32,
    bytes: Vec<u8>,
}

impl NormalizedRaster {
    pub fn new(rows: u32, columns: u32, bytes: Vec<u8>) -> Result<Self, PixelError> {
        let expected = u64::from(rows) * u64::from(columns);
        if rows == 0 || columns == 0 || bytes.len() as u64 != expected {
            return Err(PixelError::UnsupportedFormat(format!(
                "raster of {rows}x{columns} cannot hold {} bytes",
                bytes.len()
            )));
        }
        Ok(Self {
            rows,
            columns,
            bytes,
        })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Encode a raster as an 8-bit grayscale PNG.
///
/// Compression and filter settings are fixed, so the same raster always produces
/// the same bytes.
pub fn encode_png(raster: &NormalizedRaster) -> Result<Vec<u8>, EncodeError> {
    let mut png = Vec::with_capacity(raster.bytes.len() / 2 + 64);
    let encoder =
        PngEncoder::new_with_quality(&mut png, CompressionType::Default, FilterType::Adaptive);
    encoder.write_image(
        &raster.bytes,
        raster.columns,
        raster.rows,
        ExtendedColorType::L8,
    )?;
    Ok(png)
}

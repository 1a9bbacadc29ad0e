//! Turns the pixel data of a decoded file into an 8-bit grayscale raster.
//!
//! Stored samples go through the linear modality rescale (`value * slope + intercept`)
//! and are then stretched so the smallest rescaled value maps to 0 and the largest to
//! 255. There is no VOI windowing; the preview always shows the full value range.

use byteorder::{ByteOrder, LittleEndian};

use crate::dataset::Dataset;
use crate::error::PixelError;
use crate::raster::NormalizedRaster;
use crate::registry::{name_of, tags, Tag};

/// Output value for every pixel of an image whose rescaled values are all equal.
pub const MID_GRAY: u8 = 128;

/// The stored samples of a single frame and the attributes needed to interpret them.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub rows: u32,
    pub columns: u32,
    pub samples_per_pixel: u32,
    pub bits_allocated: u32,
    pub signed: bool,
    pub planar: bool,
    pub rescale_slope: f64,
    pub rescale_intercept: f64,
    /// `rows * columns * samples_per_pixel` stored values.
    pub samples: Vec<i32>,
}

impl PixelBuffer {
    pub fn from_dataset(dataset: &Dataset) -> Result<Self, PixelError> {
        let data = dataset
            .get(tags::PIXEL_DATA)
            .ok_or(PixelError::MissingPixelData)?;

        let rows = required_uint(dataset, tags::ROWS)?;
        let columns = required_uint(dataset, tags::COLUMNS)?;
        let bits_allocated = required_uint(dataset, tags::BITS_ALLOCATED)?;
        let samples_per_pixel = optional_uint(dataset, tags::SAMPLES_PER_PIXEL, 1)?;
        let signed = match optional_uint(dataset, tags::PIXEL_REPRESENTATION, 0)? {
            0 => false,
            1 => true,
            other => return Err(unsupported(format!("PixelRepresentation {other}"))),
        };
        let planar = optional_uint(dataset, tags::PLANAR_CONFIGURATION, 0)? == 1;
        let frames = optional_uint(dataset, tags::NUMBER_OF_FRAMES, 1)?;
        let rescale_slope = optional_float(dataset, tags::RESCALE_SLOPE, 1.0)?;
        let rescale_intercept = optional_float(dataset, tags::RESCALE_INTERCEPT, 0.0)?;

        if rows == 0 || columns == 0 || samples_per_pixel == 0 {
            return Err(unsupported(format!(
                "image geometry {rows}x{columns} with {samples_per_pixel} samples per pixel"
            )));
        }
        if frames > 1 {
            return Err(unsupported(format!("multi-frame image with {frames} frames")));
        }
        if bits_allocated != 8 && bits_allocated != 16 {
            return Err(unsupported(format!("BitsAllocated {bits_allocated}")));
        }

        let expected = u64::from(rows) * u64::from(columns) * u64::from(samples_per_pixel);
        let bytes_per_sample = u64::from(bits_allocated / 8);
        let payload = data.bytes.len() as u64;
        let expected_bytes = expected * bytes_per_sample;
        // values are padded to even length
        let padded = expected_bytes % 2 == 1 && payload == expected_bytes + 1;
        if payload != expected_bytes && !padded {
            return Err(unsupported(format!(
                "pixel data has {payload} bytes but {rows}x{columns}x{samples_per_pixel} \
                 samples of {bits_allocated} bits need {expected_bytes}"
            )));
        }

        let raw = &data.bytes[..expected_bytes as usize];
        let samples = match (bits_allocated, signed) {
            (8, false) => raw.iter().map(|&b| i32::from(b)).collect(),
            (8, true) => raw.iter().map(|&b| i32::from(b as i8)).collect(),
            (_, false) => raw
                .chunks_exact(2)
                .map(|c| i32::from(LittleEndian::read_u16(c)))
                .collect(),
            (_, true) => raw
                .chunks_exact(2)
                .map(|c| i32::from(LittleEndian::read_i16(c)))
                .collect(),
        };

        Ok(Self {
            rows,
            columns,
            samples_per_pixel,
            bits_allocated,
            signed,
            planar,
            rescale_slope,
            rescale_intercept,
            samples,
        })
    }

    /// Stored values of the first sample of every pixel, in row-major order.
    ///
    /// For color images this is the red (or luminance) channel.
    pub fn first_channel(&self) -> Vec<i32> {
        let spp = self.samples_per_pixel as usize;
        if spp == 1 {
            self.samples.clone()
        } else if self.planar {
            let plane = (self.rows * self.columns) as usize;
            self.samples[..plane].to_vec()
        } else {
            self.samples.iter().step_by(spp).copied().collect()
        }
    }

    /// First-channel values after the modality rescale.
    pub fn rescaled(&self) -> Vec<f64> {
        self.first_channel()
            .into_iter()
            .map(|v| f64::from(v) * self.rescale_slope + self.rescale_intercept)
            .collect()
    }

    pub fn to_raster(&self) -> Result<NormalizedRaster, PixelError> {
        let values = self.rescaled();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(unsupported(format!(
                "rescale by slope {} and intercept {} overflows",
                self.rescale_slope, self.rescale_intercept
            )));
        }
        NormalizedRaster::new(self.rows, self.columns, normalize(&values))
    }
}

/// Map values linearly onto `0..=255`, the minimum to 0 and the maximum to 255.
///
/// If all values are equal they all map to [MID_GRAY]. Values must be finite.
pub fn normalize(values: &[f64]) -> Vec<u8> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !(max > min) {
        return vec![MID_GRAY; values.len()];
    }
    // halved so that max - min cannot overflow
    let (min, range) = (min / 2.0, max / 2.0 - min / 2.0);
    values
        .iter()
        .map(|&v| ((v / 2.0 - min) / range * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect()
}

/// Read, rescale and normalize the pixel data of a data set.
pub fn process(dataset: &Dataset) -> Result<NormalizedRaster, PixelError> {
    PixelBuffer::from_dataset(dataset)?.to_raster()
}

fn unsupported(details: String) -> PixelError {
    PixelError::UnsupportedFormat(details)
}

fn required_uint(dataset: &Dataset, tag: Tag) -> Result<u32, PixelError> {
    let element = dataset
        .get(tag)
        .ok_or_else(|| unsupported(format!("missing {}", name_of(tag))))?;
    element
        .uint()
        .ok_or_else(|| unsupported(format!("{} is not a number", name_of(tag))))
}

fn optional_uint(dataset: &Dataset, tag: Tag, default: u32) -> Result<u32, PixelError> {
    match dataset.get(tag) {
        None => Ok(default),
        Some(e) if e.is_empty() => Ok(default),
        Some(e) => e
            .uint()
            .ok_or_else(|| unsupported(format!("{} is not a number", name_of(tag)))),
    }
}

fn optional_float(dataset: &Dataset, tag: Tag, default: f64) -> Result<f64, PixelError> {
    let value = match dataset.get(tag) {
        None => return Ok(default),
        Some(e) if e.text().is_empty() => return Ok(default),
        Some(e) => e.float(),
    };
    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| unsupported(format!("{} is not a finite number", name_of(tag))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::ContainerDecoder;
    use crate::testing::{image_header, words, FileBuilder};
    use crate::vr::Vr;
    use rstest::*;

    fn decode(builder: FileBuilder) -> Dataset {
        ContainerDecoder::default().decode(builder.build()).unwrap()
    }

    #[test]
    fn test_ramp_4x4_u16() {
        let dataset = decode(image_header(4, 4, 16, false).pixels(16, &words(0..16)));
        let raster = process(&dataset).unwrap();
        assert_eq!(raster.rows(), 4);
        assert_eq!(raster.columns(), 4);
        let bytes = raster.bytes();
        assert_eq!(bytes.len(), 16);
        assert!(bytes.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[15], 255);
        assert_eq!(bytes[1], 17);
    }

    #[test]
    fn test_signed_with_rescale() {
        let samples = [-2000i16, -1000, 0, 1000];
        let data: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let dataset = decode(
            image_header(2, 2, 16, true)
                .element(tags::RESCALE_INTERCEPT, Vr::DS, b"-1024")
                .element(tags::RESCALE_SLOPE, Vr::DS, b"0.5")
                .pixels(16, &data),
        );
        let buffer = PixelBuffer::from_dataset(&dataset).unwrap();
        assert_eq!(buffer.rescaled(), vec![-2024.0, -1524.0, -1024.0, -524.0]);
        assert_eq!(buffer.to_raster().unwrap().bytes(), &[0, 85, 170, 255]);
    }

    #[test]
    fn test_negative_slope_still_spans_range() {
        let dataset = decode(
            image_header(1, 3, 8, false)
                .element(tags::RESCALE_SLOPE, Vr::DS, b"-1")
                .pixels(8, &[0, 10, 20]),
        );
        assert_eq!(process(&dataset).unwrap().bytes(), &[255, 128, 0]);
    }

    #[rstest]
    #[case(8, vec![7u8; 4])]
    #[case(16, words([300; 4]))]
    fn test_constant_image_is_mid_gray(#[case] bits: u16, #[case] data: Vec<u8>) {
        let dataset = decode(image_header(2, 2, bits, false).pixels(bits, &data));
        assert_eq!(process(&dataset).unwrap().bytes(), &[MID_GRAY; 4]);
    }

    #[test]
    fn test_odd_8bit_payload_with_padding() {
        let dataset = decode(image_header(3, 3, 8, false).pixels(8, &[0, 1, 2, 3, 4, 5, 6, 7, 8]));
        assert_eq!(dataset.get(tags::PIXEL_DATA).unwrap().len(), 10);
        let raster = process(&dataset).unwrap();
        assert_eq!(raster.bytes().len(), 9);
        assert_eq!(raster.bytes()[8], 255);
    }

    #[test]
    fn test_missing_pixel_data() {
        let dataset = decode(image_header(2, 2, 8, false));
        assert_eq!(process(&dataset).unwrap_err(), PixelError::MissingPixelData);
    }

    #[rstest]
    #[case(image_header(2, 2, 12, false).pixels(12, &[0; 8]))]
    #[case(image_header(2, 2, 32, false).pixels(32, &[0; 16]))]
    #[case(image_header(2, 2, 16, false).pixels(16, &[0; 6]))]
    #[case(image_header(2, 2, 16, false).pixels(16, &[0; 10]))]
    #[case(image_header(0, 2, 8, false).pixels(8, &[]))]
    #[case(image_header(2, 2, 8, false).element(tags::NUMBER_OF_FRAMES, Vr::IS, b"2").pixels(8, &[0; 8]))]
    #[case(image_header(2, 2, 8, false).element(tags::RESCALE_SLOPE, Vr::DS, b"NaN").pixels(8, &[0; 4]))]
    #[case(image_header(4, 4, 16, false).element(tags::RESCALE_SLOPE, Vr::DS, b"1e308").pixels(16, &words(0..16)))]
    #[case(image_header(1, 2, 8, false).element(tags::RESCALE_INTERCEPT, Vr::DS, b"1.7e308").element(tags::RESCALE_SLOPE, Vr::DS, b"1e308").pixels(8, &[0, 2]))]
    #[case(FileBuilder::explicit().element(tags::COLUMNS, Vr::US, &2u16.to_le_bytes()).pixels(8, &[0; 4]))]
    fn test_unsupported(#[case] builder: FileBuilder) {
        let dataset = decode(builder);
        assert!(matches!(
            process(&dataset).unwrap_err(),
            PixelError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn test_color_interleaved_takes_first_sample() {
        let dataset = decode(
            image_header(1, 2, 8, false)
                .element(tags::SAMPLES_PER_PIXEL, Vr::US, &3u16.to_le_bytes())
                .pixels(8, &[10, 99, 99, 20, 0, 0]),
        );
        let buffer = PixelBuffer::from_dataset(&dataset).unwrap();
        assert_eq!(buffer.first_channel(), vec![10, 20]);
        assert_eq!(buffer.to_raster().unwrap().bytes(), &[0, 255]);
    }

    #[test]
    fn test_color_planar_takes_first_plane() {
        let dataset = decode(
            image_header(1, 2, 8, false)
                .element(tags::SAMPLES_PER_PIXEL, Vr::US, &3u16.to_le_bytes())
                .element(tags::PLANAR_CONFIGURATION, Vr::US, &1u16.to_le_bytes())
                .pixels(8, &[10, 20, 99, 99, 0, 0]),
        );
        assert_eq!(PixelBuffer::from_dataset(&dataset).unwrap().first_channel(), vec![10, 20]);
    }

    #[rstest]
    #[case(vec![3.0, -7.5, 0.25, 1e6, -1e6, 42.0, 42.0])]
    #[case(vec![0.0, 1.0])]
    #[case(vec![f64::MAX, 0.0, -f64::MAX])]
    #[case((0..500).map(|i| ((i * 7919) % 1013) as f64 * 0.37 - 100.0).collect())]
    fn test_normalize_is_monotonic_and_spans_range(#[case] values: Vec<f64>) {
        let normalized = normalize(&values);
        let mut pairs: Vec<_> = values.iter().copied().zip(normalized.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert!(pairs.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(pairs.first().unwrap().1, 0);
        assert_eq!(pairs.last().unwrap().1, 255);
    }

    #[test]
    fn test_normalize_extreme_range() {
        assert_eq!(normalize(&[-1e308, 0.0, 1e308]), vec![0, 128, 255]);
    }

    #[test]
    fn test_normalize_empty() {
        assert!(normalize(&[]).is_empty());
    }
}

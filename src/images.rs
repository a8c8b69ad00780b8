//! Image extraction from indirect objects.
//!
//! The native layer hands back the image dictionary parameters and the
//! filter-decoded sample stream. Turning those samples into pixels and PNG
//! bytes happens here, outside the document lock.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::native::{ColorModel, ImageHeader};

impl Document {
    /// Decode image object `object` and return it as PNG bytes.
    ///
    /// Fails with [`Error::ObjectMissing`] unless `1 <= object < object_count()`
    /// and with [`Error::NotImage`] when the object is anything but an image
    /// XObject; scan loops should skip the latter.
    pub fn extract_image_bytes(&self, object: u32) -> Result<Vec<u8>> {
        let image = self.decode_image(object)?;
        encode_png(&image)
    }

    /// Decode image object `object` into a pixel buffer
    pub fn extract_image(&self, object: u32) -> Result<DynamicImage> {
        let png = self.extract_image_bytes(object)?;
        Ok(image::load_from_memory_with_format(&png, ImageFormat::Png)?)
    }

    /// Walk every object number and collect the images, as
    /// `(object_number, png_bytes)` in object order.
    ///
    /// Non-image objects are skipped. Images whose samples cannot be decoded
    /// are logged and skipped too.
    pub fn scan_images(&self) -> Result<Vec<(u32, Vec<u8>)>> {
        let total = u32::try_from(self.object_count()).unwrap_or(u32::MAX);
        let mut images = Vec::new();

        for object in 1..total {
            match self.extract_image_bytes(object) {
                Ok(png) => images.push((object, png)),
                Err(err) if err.is_not_image() => continue,
                Err(err @ Error::DecodeImageFailed { .. }) => {
                    tracing::warn!(object, error = %err, "skipping undecodable image");
                }
                Err(err) => return Err(err),
            }
        }

        tracing::debug!(count = images.len(), "image scan finished");
        Ok(images)
    }

    fn decode_image(&self, object: u32) -> Result<DynamicImage> {
        let total = self.object_count();
        let max_pixels = self.config().max_image_pixels;

        let (header, samples) = self.with_context(|context| {
            if object == 0 || object as usize >= total {
                return Err(Error::ObjectMissing { object, total });
            }
            if context.object_subtype(object)?.as_deref() != Some("Image") {
                return Err(Error::NotImage { object });
            }

            tracing::debug!(object, "extracting image");
            let decode_failed = |err: crate::native::NativeError| Error::DecodeImageFailed {
                object,
                reason: err.to_string(),
            };
            let header = context.image_header(object).map_err(decode_failed)?;
            check_header(object, &header, max_pixels)?;
            let samples = context.image_samples(object).map_err(decode_failed)?;
            Ok((header, samples))
        })?;

        to_dynamic_image(object, &header, samples)
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Reject images we cannot or should not decode before their samples are read
fn check_header(object: u32, header: &ImageHeader, max_pixels: u64) -> Result<()> {
    if let Some(filter) = &header.undecoded_filter {
        return Err(Error::DecodeImageFailed {
            object,
            reason: format!("unsupported filter {}", filter),
        });
    }

    if header.width == 0 || header.height == 0 {
        return Err(Error::DecodeImageFailed {
            object,
            reason: format!("empty image {}x{}", header.width, header.height),
        });
    }

    if !matches!(header.bits_per_component, 1 | 2 | 4 | 8 | 16) {
        return Err(Error::DecodeImageFailed {
            object,
            reason: format!("unsupported bits per component {}", header.bits_per_component),
        });
    }

    let pixels = u64::from(header.width) * u64::from(header.height);
    if pixels > max_pixels {
        return Err(Error::ImageDimensionExceeded {
            detail: format!(
                "object {} is {}x{} ({} pixels, limit {})",
                object, header.width, header.height, pixels, max_pixels
            ),
        });
    }

    Ok(())
}

/// Read sample `index` of a packed row
fn read_sample(row: &[u8], index: usize, bpc: u8) -> u16 {
    match bpc {
        8 => u16::from(row[index]),
        16 => u16::from_be_bytes([row[2 * index], row[2 * index + 1]]),
        _ => {
            let bit = index * bpc as usize;
            let shift = 8 - bpc as usize - bit % 8;
            let mask = (1u8 << bpc) - 1;
            u16::from((row[bit / 8] >> shift) & mask)
        }
    }
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let ink = |v: u8| ((255 - u32::from(v)) * (255 - u32::from(k)) / 255) as u8;
    [ink(c), ink(m), ink(y)]
}

/// CIE L*a*b* (L in 0..=100) to sRGB, relative to `white_point`
fn lab_to_rgb(white_point: [f32; 3], l: f32, a: f32, b: f32) -> [u8; 3] {
    const DELTA: f32 = 6.0 / 29.0;
    let finv = |t: f32| {
        if t > DELTA {
            t * t * t
        } else {
            3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
        }
    };

    let fy = (l + 16.0) / 116.0;
    let x = white_point[0] * finv(fy + a / 500.0);
    let y = white_point[1] * finv(fy);
    let z = white_point[2] * finv(fy - b / 200.0);

    let linear = [
        3.2406 * x - 1.5372 * y - 0.4986 * z,
        -0.9689 * x + 1.8758 * y + 0.0415 * z,
        0.0557 * x - 0.2040 * y + 1.0570 * z,
    ];
    linear.map(|c| {
        let c = c.clamp(0.0, 1.0);
        let encoded = if c <= 0.003_130_8 {
            12.92 * c
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        };
        (encoded * 255.0).round().clamp(0.0, 255.0) as u8
    })
}

/// Map three normalized samples (0..=1) onto a Lab space and convert
fn lab_pixel(white_point: [f32; 3], range: [f32; 4], px: [f32; 3]) -> [u8; 3] {
    let l = px[0] * 100.0;
    let a = range[0] + px[1] * (range[1] - range[0]);
    let b = range[2] + px[2] * (range[3] - range[2]);
    lab_to_rgb(white_point, l, a, b)
}

/// Convert filter-decoded samples into a pixel buffer
pub(crate) fn to_dynamic_image(
    object: u32,
    header: &ImageHeader,
    mut samples: Vec<u8>,
) -> Result<DynamicImage> {
    let width = header.width as usize;
    let height = header.height as usize;
    let bpc = header.bits_per_component;
    let components = header.color.components();

    let row_bytes = (width * components * bpc as usize).div_ceil(8);
    let expected = row_bytes * height;
    if samples.len() < expected {
        // Pad at most one partial row; anything shorter is a broken stream
        if expected - samples.len() > row_bytes {
            return Err(Error::DecodeImageFailed {
                object,
                reason: format!(
                    "image data truncated: expected {} bytes, got {}",
                    expected,
                    samples.len()
                ),
            });
        }
        tracing::warn!(
            object,
            expected,
            actual = samples.len(),
            "image samples truncated, padding last row with zeros"
        );
        samples.resize(expected, 0);
    }

    let max_value = ((1u32 << bpc) - 1) as u16;
    let mut raw = Vec::with_capacity(width * height * components);
    for row in samples.chunks_exact(row_bytes).take(height) {
        for index in 0..width * components {
            let value = read_sample(row, index, bpc);
            raw.push(if header.decode_inverted {
                max_value - value
            } else {
                value
            });
        }
    }

    let scale = |value: u16| (u32::from(value) * 255 / u32::from(max_value)) as u8;
    let invalid = || Error::DecodeImageFailed {
        object,
        reason: "sample buffer does not match image size".to_string(),
    };

    let image = match &header.color {
        ColorModel::Gray => {
            let pixels = raw.iter().map(|&v| scale(v)).collect();
            DynamicImage::ImageLuma8(
                GrayImage::from_raw(header.width, header.height, pixels).ok_or_else(invalid)?,
            )
        }
        ColorModel::Rgb => {
            let pixels = raw.iter().map(|&v| scale(v)).collect();
            DynamicImage::ImageRgb8(
                RgbImage::from_raw(header.width, header.height, pixels).ok_or_else(invalid)?,
            )
        }
        ColorModel::Cmyk => {
            let pixels = raw
                .chunks_exact(4)
                .flat_map(|px| cmyk_to_rgb(scale(px[0]), scale(px[1]), scale(px[2]), scale(px[3])))
                .collect();
            DynamicImage::ImageRgb8(
                RgbImage::from_raw(header.width, header.height, pixels).ok_or_else(invalid)?,
            )
        }
        ColorModel::Lab { white_point, range } => {
            let unit = |value: u16| f32::from(value) / f32::from(max_value);
            let pixels = raw
                .chunks_exact(3)
                .flat_map(|px| {
                    lab_pixel(*white_point, *range, [unit(px[0]), unit(px[1]), unit(px[2])])
                })
                .collect();
            DynamicImage::ImageRgb8(
                RgbImage::from_raw(header.width, header.height, pixels).ok_or_else(invalid)?,
            )
        }
        ColorModel::Indexed {
            base,
            hival,
            lookup,
        } => {
            let entry_len = base.components();
            let entry = |index: u16| -> Vec<u8> {
                let start = usize::from(index.min(u16::from(*hival))) * entry_len;
                (start..start + entry_len)
                    .map(|i| lookup.get(i).copied().unwrap_or(0))
                    .collect()
            };

            match base.as_ref() {
                ColorModel::Gray => {
                    let pixels = raw.iter().flat_map(|&v| entry(v)).collect();
                    DynamicImage::ImageLuma8(
                        GrayImage::from_raw(header.width, header.height, pixels)
                            .ok_or_else(invalid)?,
                    )
                }
                ColorModel::Rgb => {
                    let pixels = raw.iter().flat_map(|&v| entry(v)).collect();
                    DynamicImage::ImageRgb8(
                        RgbImage::from_raw(header.width, header.height, pixels)
                            .ok_or_else(invalid)?,
                    )
                }
                ColorModel::Cmyk => {
                    let pixels = raw
                        .iter()
                        .flat_map(|&v| {
                            let ink = entry(v);
                            cmyk_to_rgb(ink[0], ink[1], ink[2], ink[3])
                        })
                        .collect();
                    DynamicImage::ImageRgb8(
                        RgbImage::from_raw(header.width, header.height, pixels)
                            .ok_or_else(invalid)?,
                    )
                }
                ColorModel::Lab { white_point, range } => {
                    let unit = |byte: u8| f32::from(byte) / 255.0;
                    let pixels = raw
                        .iter()
                        .flat_map(|&v| {
                            let px = entry(v);
                            lab_pixel(*white_point, *range, [unit(px[0]), unit(px[1]), unit(px[2])])
                        })
                        .collect();
                    DynamicImage::ImageRgb8(
                        RgbImage::from_raw(header.width, header.height, pixels)
                            .ok_or_else(invalid)?,
                    )
                }
                ColorModel::Indexed { .. } => {
                    return Err(Error::DecodeImageFailed {
                        object,
                        reason: "nested Indexed colour space".to_string(),
                    })
                }
            }
        }
    };

    Ok(image)
}

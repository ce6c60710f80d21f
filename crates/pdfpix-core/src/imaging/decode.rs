//! Payload decoding.

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use tracing::trace;

use crate::error::DecodeError;
use crate::pdf::{ColorSpace, ImagePayload};

type Result<T> = std::result::Result<T, DecodeError>;

/// Decode an embedded image into a pixel buffer.
pub fn decode(payload: &ImagePayload) -> Result<DynamicImage> {
    match payload {
        ImagePayload::Encoded { filter, data } => match filter.as_str() {
            "DCTDecode" => {
                trace!("Decoding JPEG image ({} bytes)", data.len());
                Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?)
            }
            other => Err(DecodeError::UnsupportedFilter(other.to_string())),
        },
        ImagePayload::Raw {
            width,
            height,
            color_space,
            bits_per_component,
            data,
        } => decode_raw(*width, *height, color_space, *bits_per_component, data),
    }
}

fn decode_raw(
    width: u32,
    height: u32,
    color_space: &ColorSpace,
    bits: u8,
    data: &[u8],
) -> Result<DynamicImage> {
    trace!(
        "Creating image from raw data: {}x{}, colorspace={:?}, bits={}",
        width, height, color_space, bits
    );

    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions { width, height });
    }
    if !matches!(bits, 1 | 2 | 4 | 8) {
        return Err(DecodeError::UnsupportedBits(bits));
    }
    let components = color_space
        .components()
        .ok_or_else(|| DecodeError::UnsupportedColorSpace(color_space_name(color_space)))?;

    let samples = unpack(data, width, height, components, bits)?;

    match color_space {
        ColorSpace::Indexed { base, lookup } => {
            let base_components = match base.as_ref() {
                ColorSpace::Gray | ColorSpace::Rgb | ColorSpace::Cmyk => base.components(),
                _ => None,
            }
            .ok_or_else(|| DecodeError::UnsupportedColorSpace(color_space_name(base)))?;
            let colors = expand_palette(&samples, lookup, base_components);
            build(width, height, base, colors)
        }
        _ => build(width, height, color_space, scale(samples, bits)),
    }
}

/// Build an image from 8-bit samples in a device colour space.
fn build(width: u32, height: u32, color_space: &ColorSpace, samples: Vec<u8>) -> Result<DynamicImage> {
    let actual = samples.len();
    let (channels, image) = match color_space {
        ColorSpace::Gray => (1, GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)),
        ColorSpace::Rgb => (3, RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8)),
        ColorSpace::Cmyk => (
            4,
            RgbImage::from_raw(width, height, cmyk_to_rgb(&samples)).map(DynamicImage::ImageRgb8),
        ),
        other => return Err(DecodeError::UnsupportedColorSpace(color_space_name(other))),
    };
    image.ok_or(DecodeError::Truncated {
        expected: (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(channels),
        actual,
    })
}

/// Split packed rows into one byte per sample. Rows start on byte
/// boundaries.
fn unpack(data: &[u8], width: u32, height: u32, components: usize, bits: u8) -> Result<Vec<u8>> {
    let bits = bits as usize;
    let overflow = || DecodeError::InvalidDimensions { width, height };
    let per_row = (width as usize).checked_mul(components).ok_or_else(overflow)?;
    let row_bytes = per_row.checked_mul(bits).ok_or_else(overflow)?.div_ceil(8);
    let expected = row_bytes.checked_mul(height as usize).ok_or_else(overflow)?;
    if data.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    if bits == 8 {
        return Ok(data[..expected].to_vec());
    }

    let mask = (1u8 << bits) - 1;
    let mut samples = Vec::with_capacity(per_row * height as usize);
    for row in data[..expected].chunks(row_bytes) {
        for i in 0..per_row {
            let bit = i * bits;
            let shift = 8 - bits - (bit % 8);
            samples.push((row[bit / 8] >> shift) & mask);
        }
    }
    Ok(samples)
}

/// Stretch sub-byte samples to the 0..=255 range.
fn scale(mut samples: Vec<u8>, bits: u8) -> Vec<u8> {
    if bits < 8 {
        let max = (1u16 << bits) - 1;
        for s in &mut samples {
            *s = (*s as u16 * 255 / max) as u8;
        }
    }
    samples
}

/// Look up palette entries. Indices past the end of the table map to zeros.
fn expand_palette(indices: &[u8], lookup: &[u8], components: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(indices.len() * components);
    for &index in indices {
        let start = index as usize * components;
        match lookup.get(start..start + components) {
            Some(entry) => out.extend_from_slice(entry),
            None => out.extend(std::iter::repeat_n(0, components)),
        }
    }
    out
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(samples.len() / 4 * 3);
    for px in samples.chunks_exact(4) {
        let k = 255 - px[3] as u16;
        for &c in &px[..3] {
            rgb.push(((255 - c as u16) * k / 255) as u8);
        }
    }
    rgb
}

fn color_space_name(color_space: &ColorSpace) -> String {
    match color_space {
        ColorSpace::Gray => "DeviceGray".to_string(),
        ColorSpace::Rgb => "DeviceRGB".to_string(),
        ColorSpace::Cmyk => "DeviceCMYK".to_string(),
        ColorSpace::Indexed { .. } => "Indexed".to_string(),
        ColorSpace::Other(name) => name.clone(),
    }
}

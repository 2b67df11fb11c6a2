//! Allocation and pixel access helpers shared by every stage.
//!
//! Buffers are plain `image` crate buffers. Access through [`sample`] and
//! [`store`] is bounds-checked in debug builds and reports
//! [`NucleusError::OutOfRange`]; release builds index the raw storage directly.

use image::{GrayImage, ImageBuffer, Pixel, RgbImage};

use crate::error::{NucleusError, Result};

/// Allocate a zeroed single-channel buffer
pub fn allocate_gray(width: u32, height: u32) -> Result<GrayImage> {
    ensure_non_empty(width, height)?;
    Ok(GrayImage::new(width, height))
}

/// Allocate a zeroed three-channel buffer
pub fn allocate_rgb(width: u32, height: u32) -> Result<RgbImage> {
    ensure_non_empty(width, height)?;
    Ok(RgbImage::new(width, height))
}

pub fn ensure_non_empty(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(NucleusError::Configuration(format!(
            "image dimensions must be positive, got {width}x{height}"
        )));
    }
    Ok(())
}

/// Fail with `DimensionMismatch` unless both buffers have the same size
pub fn ensure_same_dimensions(expected: (u32, u32), found: (u32, u32)) -> Result<()> {
    if expected != found {
        return Err(NucleusError::DimensionMismatch { expected, found });
    }
    Ok(())
}

#[inline]
fn raw_index(width: u32, row: u32, col: u32) -> usize {
    row as usize * width as usize + col as usize
}

#[inline]
fn check_bounds(width: u32, height: u32, row: u32, col: u32) -> Result<()> {
    if cfg!(debug_assertions) && (row >= height || col >= width) {
        return Err(NucleusError::OutOfRange { row, col, width, height });
    }
    Ok(())
}

/// Read the first channel of pixel (row, col)
pub fn sample<P>(image: &ImageBuffer<P, Vec<P::Subpixel>>, row: u32, col: u32) -> Result<P::Subpixel>
where
    P: Pixel,
{
    let (width, height) = image.dimensions();
    check_bounds(width, height, row, col)?;
    let channels = P::CHANNEL_COUNT as usize;
    Ok(image.as_raw()[raw_index(width, row, col) * channels])
}

/// Write every channel of pixel (row, col)
pub fn store<P>(image: &mut ImageBuffer<P, Vec<P::Subpixel>>, row: u32, col: u32, value: P) -> Result<()>
where
    P: Pixel,
{
    let (width, height) = image.dimensions();
    check_bounds(width, height, row, col)?;
    let channels = P::CHANNEL_COUNT as usize;
    let start = raw_index(width, row, col) * channels;
    let storage: &mut [P::Subpixel] = image;
    storage[start..start + channels].copy_from_slice(value.channels());
    Ok(())
}

//! Low-level image operators consumed by the segmentation stages.
//!
//! Grey morphology works with arbitrary structuring elements (including
//! anchored custom kernels), the flood fill uses a floating range with
//! 8-connectivity, and the watershed is the marker-controlled priority flood
//! with 256 FIFO levels.

use std::collections::VecDeque;

use image::{GrayImage, Luma};
use rayon::prelude::*;

use crate::{
    algorithms::structuring::StructuringElement,
    buffer::ensure_same_dimensions,
    error::{NucleusError, Result},
    types::{LabelMap, RIDGE_LABEL},
};

const IN_QUEUE: i32 = -2;
const LEVELS: usize = 256;

#[derive(Debug, Clone, Copy)]
enum MorphOp {
    Erode,
    Dilate,
}

impl MorphOp {
    fn identity(self) -> u8 {
        match self {
            MorphOp::Erode => u8::MAX,
            MorphOp::Dilate => u8::MIN,
        }
    }

    fn combine(self, acc: u8, value: u8) -> u8 {
        match self {
            MorphOp::Erode => acc.min(value),
            MorphOp::Dilate => acc.max(value),
        }
    }
}

/// Minimum filter over the element, applied `iterations` times
pub fn erode(image: &GrayImage, element: &StructuringElement, iterations: u32) -> GrayImage {
    repeat(image, element, iterations, MorphOp::Erode)
}

/// Maximum filter over the element, applied `iterations` times
pub fn dilate(image: &GrayImage, element: &StructuringElement, iterations: u32) -> GrayImage {
    repeat(image, element, iterations, MorphOp::Dilate)
}

fn repeat(image: &GrayImage, element: &StructuringElement, iterations: u32, op: MorphOp) -> GrayImage {
    let offsets = element.offsets();
    let mut current = image.clone();
    for _ in 0..iterations {
        current = single_pass(&current, &offsets, op);
    }
    current
}

fn single_pass(image: &GrayImage, offsets: &[(i64, i64)], op: MorphOp) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let source = image.as_raw();
    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;
    let mut output = image.clone();
    let rows: &mut [u8] = &mut output;

    rows.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let mut acc = op.identity();
                for &(dx, dy) in offsets {
                    // out-of-image neighbors replicate the nearest edge pixel
                    let sx = (x as i64 + dx).clamp(0, max_x) as usize;
                    let sy = (y as i64 + dy).clamp(0, max_y) as usize;
                    acc = op.combine(acc, source[sy * width as usize + sx]);
                }
                *out = acc;
            }
        });

    output
}

/// 255 - v for every pixel
pub fn invert(image: &GrayImage) -> GrayImage {
    let mut inverted = image.clone();
    let pixels: &mut [u8] = &mut inverted;
    pixels.par_iter_mut().for_each(|v| *v = u8::MAX - *v);
    inverted
}

/// Pixelwise saturating sum of two equally sized images
pub fn saturating_add(lhs: &GrayImage, rhs: &GrayImage) -> Result<GrayImage> {
    ensure_same_dimensions(lhs.dimensions(), rhs.dimensions())?;
    let mut sum = lhs.clone();
    let pixels: &mut [u8] = &mut sum;
    pixels
        .par_iter_mut()
        .zip(rhs.as_raw().par_iter())
        .for_each(|(a, &b)| *a = a.saturating_add(b));
    Ok(sum)
}

/// 8-connected floating-range flood fill, in place.
///
/// A neighbor joins the region when its original value lies within
/// `[v - lo_diff, v + hi_diff]`, where `v` is the original value of the
/// region pixel it was reached from. Returns the number of filled pixels.
pub fn flood_fill(
    image: &mut GrayImage,
    seed: (u32, u32),
    fill: u8,
    lo_diff: u8,
    hi_diff: u8,
) -> Result<usize> {
    let (width, height) = image.dimensions();
    let (seed_x, seed_y) = seed;
    if seed_x >= width || seed_y >= height {
        return Err(NucleusError::Configuration(format!(
            "flood fill seed ({seed_x}, {seed_y}) lies outside a {width}x{height} image"
        )));
    }

    let source = image.as_raw().clone();
    let width = width as usize;
    let height = height as usize;
    let mut visited = vec![false; source.len()];
    let mut stack = vec![seed_y as usize * width + seed_x as usize];
    visited[stack[0]] = true;
    let mut filled = 0;

    while let Some(index) = stack.pop() {
        let (x, y) = ((index % width) as i64, (index / width) as i64);
        image.put_pixel(x as u32, y as u32, Luma([fill]));
        filled += 1;

        let value = source[index] as i16;
        let low = value - lo_diff as i16;
        let high = value + hi_diff as i16;

        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if (dx == 0 && dy == 0) || nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                let neighbor = ny as usize * width + nx as usize;
                let candidate = source[neighbor] as i16;
                if !visited[neighbor] && candidate >= low && candidate <= high {
                    visited[neighbor] = true;
                    stack.push(neighbor);
                }
            }
        }
    }

    Ok(filled)
}

/// Marker-controlled watershed flood.
///
/// The outermost pixel frame becomes ridge, negative interior markers are
/// reset to unlabeled, and unlabeled pixels are flooded from the markers in
/// order of the absolute terrain difference to the pixel that reached them.
/// A pixel whose labeled 4-neighbors disagree becomes ridge.
pub fn watershed(terrain: &GrayImage, markers: LabelMap) -> Result<LabelMap> {
    ensure_same_dimensions(terrain.dimensions(), markers.dimensions())?;
    let (width, height) = terrain.dimensions();
    let w = width as usize;
    let h = height as usize;
    let mut labels = markers.into_raw();

    if w == 0 || h == 0 {
        return LabelMap::from_raw(width, height, labels)
            .ok_or_else(|| NucleusError::InvariantViolation("empty label map".to_string()));
    }

    for x in 0..w {
        labels[x] = RIDGE_LABEL;
        labels[(h - 1) * w + x] = RIDGE_LABEL;
    }
    for y in 0..h {
        labels[y * w] = RIDGE_LABEL;
        labels[y * w + w - 1] = RIDGE_LABEL;
    }

    let levels = terrain.as_raw();
    let diff = |a: usize, b: usize| (levels[a] as i16 - levels[b] as i16).unsigned_abs() as usize;
    let mut queues: Vec<VecDeque<usize>> = (0..LEVELS).map(|_| VecDeque::new()).collect();

    for y in 1..h.saturating_sub(1) {
        for x in 1..w - 1 {
            let index = y * w + x;
            if labels[index] < 0 {
                labels[index] = 0;
            }
            if labels[index] != 0 {
                continue;
            }
            let priority = [index - 1, index + 1, index - w, index + w]
                .into_iter()
                .filter(|&n| labels[n] > 0)
                .map(|n| diff(index, n))
                .min();
            if let Some(priority) = priority {
                queues[priority].push_back(index);
                labels[index] = IN_QUEUE;
            }
        }
    }

    let mut active = 0;
    loop {
        if queues[active].is_empty() {
            match (active + 1..LEVELS).find(|&level| !queues[level].is_empty()) {
                Some(level) => active = level,
                None => break,
            }
        }
        let Some(index) = queues[active].pop_front() else {
            continue;
        };

        let neighbors = [index - 1, index + 1, index - w, index + w];
        let mut label = 0;
        for &n in &neighbors {
            let candidate = labels[n];
            if candidate > 0 {
                if label == 0 {
                    label = candidate;
                } else if candidate != label {
                    label = RIDGE_LABEL;
                }
            }
        }

        if label == 0 {
            return Err(NucleusError::InvariantViolation(format!(
                "queued pixel {index} has no labeled neighbor"
            )));
        }
        labels[index] = label;
        if label == RIDGE_LABEL {
            continue;
        }

        for &n in &neighbors {
            if labels[n] == 0 {
                let priority = diff(index, n);
                queues[priority].push_back(n);
                active = active.min(priority);
                labels[n] = IN_QUEUE;
            }
        }
    }

    LabelMap::from_raw(width, height, labels)
        .ok_or_else(|| NucleusError::InvariantViolation("label buffer size changed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    fn single_bright_pixel() -> GrayImage {
        let mut image = filled(7, 7, 10);
        image.put_pixel(3, 3, Luma([200]));
        image
    }

    #[test]
    fn test_zero_iterations_is_identity() {
        let image = single_bright_pixel();
        let element = StructuringElement::rectangle(3, 3).expect("Should build rectangle");
        assert_eq!(dilate(&image, &element, 0), image);
        assert_eq!(erode(&image, &element, 0), image);
    }

    #[test]
    fn test_dilate_grows_by_iterations() {
        let image = single_bright_pixel();
        let element = StructuringElement::rectangle(3, 3).expect("Should build rectangle");

        let once = dilate(&image, &element, 1);
        assert_eq!(once.pixels().filter(|p| p.0[0] == 200).count(), 9);

        let twice = dilate(&image, &element, 2);
        assert_eq!(twice.pixels().filter(|p| p.0[0] == 200).count(), 25);
    }

    #[test]
    fn test_erode_removes_small_peak() {
        let image = single_bright_pixel();
        let element = StructuringElement::rectangle(3, 3).expect("Should build rectangle");
        let eroded = erode(&image, &element, 1);
        assert!(eroded.pixels().all(|p| p.0[0] == 10));
    }

    #[test]
    fn test_custom_anchor_shifts_dilation() {
        // only the cell left of the anchor is active: dst(x) = src(x - 1)
        let element = StructuringElement::custom(vec![vec![1, 0, 0]], 0, 1)
            .expect("Should build custom element");
        let dilated = dilate(&single_bright_pixel(), &element, 1);
        assert_eq!(dilated.get_pixel(4, 3).0[0], 200);
        assert_eq!(dilated.get_pixel(3, 3).0[0], 10);
    }

    #[test]
    fn test_border_replicates() {
        let mut image = filled(5, 5, 50);
        image.put_pixel(0, 0, Luma([0]));
        let element = StructuringElement::rectangle(3, 3).expect("Should build rectangle");
        let eroded = erode(&image, &element, 1);
        assert_eq!(eroded.get_pixel(0, 0).0[0], 0);
        assert_eq!(eroded.get_pixel(1, 1).0[0], 0);
        assert_eq!(eroded.get_pixel(4, 4).0[0], 50);
    }

    #[test]
    fn test_invert_and_saturating_add() {
        let image = filled(3, 3, 200);
        let inverted = invert(&image);
        assert!(inverted.pixels().all(|p| p.0[0] == 55));

        let sum = saturating_add(&image, &image).expect("Should add equal sizes");
        assert!(sum.pixels().all(|p| p.0[0] == 255));

        assert!(saturating_add(&image, &filled(4, 3, 0)).is_err());
    }

    #[test]
    fn test_flood_fill_stops_at_walls() {
        let mut image = filled(9, 9, 0);
        for i in 0..9 {
            image.put_pixel(4, i, Luma([255]));
        }
        let filled_count = flood_fill(&mut image, (0, 0), 128, 10, 10).expect("Should fill");
        assert_eq!(filled_count, 36);
        assert_eq!(image.get_pixel(3, 8).0[0], 128);
        assert_eq!(image.get_pixel(4, 4).0[0], 255);
        assert_eq!(image.get_pixel(5, 4).0[0], 0);
    }

    #[test]
    fn test_flood_fill_is_eight_connected() {
        let mut image = filled(3, 3, 255);
        image.put_pixel(0, 0, Luma([0]));
        image.put_pixel(1, 1, Luma([0]));
        image.put_pixel(2, 2, Luma([0]));
        let filled_count = flood_fill(&mut image, (0, 0), 9, 0, 0).expect("Should fill");
        assert_eq!(filled_count, 3);
        assert_eq!(image.get_pixel(2, 2).0[0], 9);
    }

    #[test]
    fn test_flood_fill_rejects_outside_seed() {
        let mut image = filled(3, 3, 0);
        assert!(matches!(
            flood_fill(&mut image, (3, 0), 1, 0, 0),
            Err(NucleusError::Configuration(_))
        ));
    }

    #[test]
    fn test_watershed_splits_two_basins() {
        let terrain = filled(11, 7, 0);
        let mut markers = LabelMap::new(11, 7);
        markers.put_pixel(2, 3, Luma([1]));
        markers.put_pixel(8, 3, Luma([2]));

        let labels = watershed(&terrain, markers).expect("Should flood");

        for x in 0..11 {
            assert_eq!(labels.get_pixel(x, 0).0[0], RIDGE_LABEL);
            assert_eq!(labels.get_pixel(x, 6).0[0], RIDGE_LABEL);
        }
        assert_eq!(labels.get_pixel(1, 3).0[0], 1);
        assert_eq!(labels.get_pixel(9, 3).0[0], 2);
        assert!(labels.pixels().all(|p| matches!(p.0[0], RIDGE_LABEL | 1 | 2)));
    }

    #[test]
    fn test_watershed_prefers_low_terrain_steps() {
        // a bright wall at column 5 delays flooding across it
        let mut terrain = filled(11, 7, 0);
        for y in 0..7 {
            terrain.put_pixel(5, y, Luma([200]));
        }
        let mut markers = LabelMap::new(11, 7);
        markers.put_pixel(1, 3, Luma([1]));
        markers.put_pixel(9, 3, Luma([2]));

        let labels = watershed(&terrain, markers).expect("Should flood");
        for y in 1..6 {
            for x in 1..5 {
                assert_eq!(labels.get_pixel(x, y).0[0], 1);
            }
            for x in 6..10 {
                assert_eq!(labels.get_pixel(x, y).0[0], 2);
            }
        }
    }

    #[test]
    fn test_watershed_checks_dimensions() {
        let terrain = filled(4, 4, 0);
        assert!(matches!(
            watershed(&terrain, LabelMap::new(5, 4)),
            Err(NucleusError::DimensionMismatch { .. })
        ));
    }
}

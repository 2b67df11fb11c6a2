use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, warn};

use crate::{
    algorithms::primitives::watershed,
    buffer::{allocate_rgb, ensure_same_dimensions, sample, store},
    error::Result,
    traits::MarkerSegmenter,
    types::{LabelMap, Segmentation, SegmentationOutcome, RIDGE_LABEL},
};

const RIDGE_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const UNLABELED_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// One random color per region id, for a single segmentation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    colors: Vec<Rgb<u8>>,
}

impl ColorTable {
    /// Draw `count` colors; the same seed always yields the same table
    pub fn random(count: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let colors = (0..count)
            .map(|_| Rgb([rng.gen_range(0..255), rng.gen_range(0..255), rng.gen_range(0..255)]))
            .collect();
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color of a watershed label: ridges are white, anything outside
    /// `1..=len` is black
    pub fn color_of(&self, label: i32) -> Rgb<u8> {
        if label == RIDGE_LABEL {
            return RIDGE_COLOR;
        }
        match usize::try_from(label) {
            Ok(id) if id >= 1 && id <= self.colors.len() => self.colors[id - 1],
            _ => UNLABELED_COLOR,
        }
    }
}

/// Trace the mask's contours and paint one label per outer contour.
///
/// Each outer contour labels its 8-connected foreground component, so holes
/// stay unlabeled and nested holes never add components. Labels follow
/// contour traversal order starting at 1.
pub fn label_outer_contours(mask: &GrayImage) -> Result<(LabelMap, usize)> {
    // find_contours only starts an outer border after a background pixel, so
    // components touching column 0 need a zero frame around the mask
    let contours: Vec<Contour<i32>> = find_contours(&pad_with_background(mask));
    let (width, height) = mask.dimensions();
    let mut labels = LabelMap::new(width, height);
    let mut count = 0;

    for contour in contours.iter().filter(|c| c.border_type == BorderType::Outer) {
        let Some(start) = contour.points.first() else {
            continue;
        };
        count += 1;
        let start = ((start.x - 1) as u32, (start.y - 1) as u32);
        paint_component(mask, &mut labels, start, count as i32)?;
    }

    Ok((labels, count))
}

/// Copy of `mask` inside a one-pixel background frame
fn pad_with_background(mask: &GrayImage) -> GrayImage {
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);
    padded
}

fn paint_component(mask: &GrayImage, labels: &mut LabelMap, start: (u32, u32), label: i32) -> Result<()> {
    let (width, height) = mask.dimensions();
    let mut stack = vec![start];
    store(labels, start.1, start.0, Luma([label]))?;

    while let Some((x, y)) = stack.pop() {
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                if sample(mask, ny, nx)? != 0 && sample(&*labels, ny, nx)? == 0 {
                    store(labels, ny, nx, Luma([label]))?;
                    stack.push((nx, ny));
                }
            }
        }
    }
    Ok(())
}

/// Paint labels with the color table and blend 50/50 with the original
pub fn compose(original: &GrayImage, labels: &LabelMap, colors: &ColorTable) -> Result<RgbImage> {
    ensure_same_dimensions(original.dimensions(), labels.dimensions())?;
    let (width, height) = original.dimensions();
    let mut image = allocate_rgb(width, height)?;

    for row in 0..height {
        for col in 0..width {
            let gray = sample(original, row, col)? as f32;
            let color = colors.color_of(sample(labels, row, col)?);
            let blend = |c: u8| (0.5 * c as f32 + 0.5 * gray).round_ties_even() as u8;
            store(&mut image, row, col, Rgb(color.0.map(blend)))?;
        }
    }
    Ok(image)
}

/// Contour-seeded watershed with colorized output
#[derive(Debug, Clone, Default)]
pub struct MarkerWatershedSegmenter {
    /// Seed for the color table; `None` draws fresh colors every call
    pub color_seed: Option<u64>,
}

impl MarkerWatershedSegmenter {
    pub fn with_seed(seed: u64) -> Self {
        Self { color_seed: Some(seed) }
    }

    /// Degenerate result when no marker exists: black labels over the original
    pub fn empty(original: &GrayImage) -> Result<Segmentation> {
        let labels = LabelMap::new(original.width(), original.height());
        let image = compose(original, &labels, &ColorTable::random(0, None))?;
        Ok(Segmentation {
            image,
            labels,
            component_count: 0,
            outcome: SegmentationOutcome::EmptyMask,
        })
    }
}

impl MarkerSegmenter for MarkerWatershedSegmenter {
    fn segment(&self, original: &GrayImage, terrain: &GrayImage, markers: &GrayImage) -> Result<Segmentation> {
        ensure_same_dimensions(original.dimensions(), terrain.dimensions())?;
        ensure_same_dimensions(original.dimensions(), markers.dimensions())?;

        let (seeds, component_count) = label_outer_contours(markers)?;
        debug!(component_count, "labeled outer contours");

        if component_count == 0 {
            warn!("mask has no foreground contours, skipping watershed");
            return Self::empty(original);
        }

        let colors = ColorTable::random(component_count, self.color_seed);
        let labels = watershed(terrain, seeds)?;
        let image = compose(original, &labels, &colors)?;

        Ok(Segmentation {
            image,
            labels,
            component_count,
            outcome: SegmentationOutcome::Segmented,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algorithms::BorderSeeds, error::NucleusError, traits::SeedStamper};

    fn blobs_mask() -> GrayImage {
        let mut mask = GrayImage::new(60, 40);
        // square with a hole
        for y in 5..25 {
            for x in 5..25 {
                let in_hole = (12..18).contains(&x) && (12..18).contains(&y);
                if !in_hole {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
        // separate disc
        for y in 10..30 {
            for x in 35..55 {
                let (dx, dy) = (x as f32 - 45.0, y as f32 - 20.0);
                if dx * dx + dy * dy <= 64.0 {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
        mask
    }

    #[test]
    fn test_holes_do_not_create_components() {
        let (labels, count) = label_outer_contours(&blobs_mask()).expect("Should label");
        assert_eq!(count, 2);
        let square = labels.get_pixel(6, 6).0[0];
        let disc = labels.get_pixel(45, 20).0[0];
        assert!(square > 0 && disc > 0 && square != disc);
        assert_eq!(labels.get_pixel(14, 14).0[0], 0, "hole stays unlabeled");
        assert_eq!(labels.get_pixel(30, 5).0[0], 0);
    }

    #[test]
    fn test_island_inside_hole_gets_its_own_label() {
        let mut mask = blobs_mask();
        mask.put_pixel(14, 14, Luma([255]));
        mask.put_pixel(15, 14, Luma([255]));
        let (labels, count) = label_outer_contours(&mask).expect("Should label");
        assert_eq!(count, 3);
        let island = labels.get_pixel(14, 14).0[0];
        assert_ne!(island, labels.get_pixel(6, 6).0[0]);
        assert_eq!(island, labels.get_pixel(15, 14).0[0]);
    }

    #[test]
    fn test_color_table_lookup() {
        let table = ColorTable::random(3, Some(7));
        assert_eq!(table.len(), 3);
        assert_eq!(table.color_of(RIDGE_LABEL), Rgb([255, 255, 255]));
        assert_eq!(table.color_of(0), Rgb([0, 0, 0]));
        assert_eq!(table.color_of(4), Rgb([0, 0, 0]));
        assert_eq!(table, ColorTable::random(3, Some(7)));
        assert!(table.colors.iter().all(|c| c.0.iter().all(|&v| v < 255)));
    }

    #[test]
    fn test_compose_blends_half_and_half() {
        let original = GrayImage::from_pixel(2, 1, Luma([100]));
        let mut labels = LabelMap::new(2, 1);
        labels.put_pixel(0, 0, Luma([RIDGE_LABEL]));
        let image = compose(&original, &labels, &ColorTable::random(0, Some(1))).expect("Should compose");
        assert_eq!(image.get_pixel(0, 0).0, [178, 178, 178]);
        assert_eq!(image.get_pixel(1, 0).0, [50, 50, 50]);
    }

    #[test]
    fn test_compose_rounds_halves_to_even() {
        let original = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 221 } else { 223 }]));
        let labels = LabelMap::new(2, 1);
        let image = compose(&original, &labels, &ColorTable::random(0, Some(1))).expect("Should compose");
        assert_eq!(image.get_pixel(0, 0).0, [110, 110, 110]);
        assert_eq!(image.get_pixel(1, 0).0, [112, 112, 112]);
    }

    #[test]
    fn test_stamped_frame_is_its_own_component() {
        let mut mask = GrayImage::new(40, 30);
        for y in 12..18 {
            for x in 17..23 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        BorderSeeds::default().stamp(&mut mask).expect("Should stamp");

        let (labels, count) = label_outer_contours(&mask).expect("Should label");
        assert_eq!(count, 2);
        let frame = labels.get_pixel(2, 2).0[0];
        let blob = labels.get_pixel(20, 15).0[0];
        assert!(frame > 0 && blob > 0);
        assert_ne!(frame, blob);
        assert_eq!(labels.get_pixel(0, 0).0[0], frame);
        assert_eq!(labels.get_pixel(39, 29).0[0], frame);
        assert_eq!(labels.get_pixel(10, 10).0[0], 0);
    }

    #[test]
    fn test_full_mask_is_one_component() {
        let mask = GrayImage::from_pixel(12, 8, Luma([255]));
        let (labels, count) = label_outer_contours(&mask).expect("Should label");
        assert_eq!(count, 1);
        assert!(labels.pixels().all(|p| p.0[0] == 1));
    }

    #[test]
    fn test_component_in_corner_is_labeled() {
        let mut mask = GrayImage::new(20, 20);
        for y in 0..4 {
            for x in 0..4 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let (labels, count) = label_outer_contours(&mask).expect("Should label");
        assert_eq!(count, 1);
        assert_eq!(labels.get_pixel(0, 0).0[0], 1);
        assert_eq!(labels.get_pixel(3, 3).0[0], 1);
    }

    #[test]
    fn test_segment_labels_every_pixel() {
        let mask = blobs_mask();
        let original = GrayImage::from_pixel(60, 40, Luma([150]));
        let terrain = GrayImage::from_pixel(60, 40, Luma([255]));
        let result = MarkerWatershedSegmenter::with_seed(3)
            .segment(&original, &terrain, &mask)
            .expect("Should segment");

        assert_eq!(result.component_count, 2);
        assert_eq!(result.outcome, SegmentationOutcome::Segmented);
        assert!(result
            .labels
            .pixels()
            .all(|p| p.0[0] == RIDGE_LABEL || (1..=2).contains(&p.0[0])));
        assert_eq!(result.region_ids(), vec![1, 2]);
    }

    #[test]
    fn test_empty_mask_skips_watershed() {
        let original = GrayImage::from_pixel(20, 20, Luma([220]));
        let mask = GrayImage::new(20, 20);
        let result = MarkerWatershedSegmenter::default()
            .segment(&original, &original, &mask)
            .expect("Should not fail on an empty mask");
        assert!(result.is_empty());
        assert_eq!(result.component_count, 0);
        assert!(result.image.pixels().all(|p| p.0 == [110, 110, 110]));
    }

    #[test]
    fn test_mismatched_inputs_are_rejected() {
        let original = GrayImage::new(20, 20);
        let other = GrayImage::new(21, 20);
        assert!(matches!(
            MarkerWatershedSegmenter::default().segment(&original, &other, &original),
            Err(NucleusError::DimensionMismatch { .. })
        ));
    }
}

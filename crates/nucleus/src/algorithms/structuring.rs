use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{NucleusError, Result};

/// Shape tag of a structuring element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum KernelShape {
    Rectangle,
    Ellipse,
    Custom,
}

/// An odd-sized neighborhood used by erosion and dilation.
///
/// Cells with a non-zero weight are part of the neighborhood. The anchor is
/// the cell that lands on the pixel being filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    shape: KernelShape,
    width: u32,
    height: u32,
    anchor_row: u32,
    anchor_col: u32,
    weights: Vec<i32>,
}

impl StructuringElement {
    /// Every cell of a `width` x `height` box, anchored at its center
    pub fn rectangle(width: u32, height: u32) -> Result<Self> {
        validate_size(width, height)?;
        Ok(Self {
            shape: KernelShape::Rectangle,
            width,
            height,
            anchor_row: height / 2,
            anchor_col: width / 2,
            weights: vec![1; (width * height) as usize],
        })
    }

    /// Ellipse inscribed in a `width` x `height` box, anchored at its center
    pub fn ellipse(width: u32, height: u32) -> Result<Self> {
        validate_size(width, height)?;
        Ok(Self::ellipse_unchecked(width, height))
    }

    /// Caller guarantees positive odd dimensions
    pub(crate) fn ellipse_unchecked(width: u32, height: u32) -> Self {
        let r = (height / 2) as i64;
        let c = (width / 2) as i64;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };
        let mut weights = vec![0; (width * height) as usize];

        for row in 0..height as i64 {
            let dy = row - r;
            if dy.abs() > r {
                continue;
            }
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i64;
            let start = (c - dx).max(0);
            let end = (c + dx + 1).min(width as i64);
            for col in start..end {
                weights[(row * width as i64 + col) as usize] = 1;
            }
        }

        Self {
            shape: KernelShape::Ellipse,
            width,
            height,
            anchor_row: height / 2,
            anchor_col: width / 2,
            weights,
        }
    }

    /// Explicit weight grid, kept verbatim
    pub fn custom(weights: Vec<Vec<i32>>, anchor_row: u32, anchor_col: u32) -> Result<Self> {
        let height = weights.len() as u32;
        let width = weights.first().map_or(0, |row| row.len()) as u32;
        validate_size(width, height)?;

        if weights.iter().any(|row| row.len() as u32 != width) {
            return Err(NucleusError::Configuration(
                "custom structuring element rows must all have the same length".to_string(),
            ));
        }
        if anchor_row >= height || anchor_col >= width {
            return Err(NucleusError::Configuration(format!(
                "anchor ({anchor_row}, {anchor_col}) lies outside a {width}x{height} element"
            )));
        }

        let weights: Vec<i32> = weights.into_iter().flatten().collect();
        if weights.iter().all(|&w| w == 0) {
            return Err(NucleusError::Configuration(
                "custom structuring element has no active cells".to_string(),
            ));
        }

        Ok(Self {
            shape: KernelShape::Custom,
            width,
            height,
            anchor_row,
            anchor_col,
            weights,
        })
    }

    /// 3x3 element of the toggle operator: every cell but the top-left corner
    pub fn toggle_default() -> Self {
        let mut weights = vec![-2; 9];
        weights[0] = 0;
        Self {
            shape: KernelShape::Custom,
            width: 3,
            height: 3,
            anchor_row: 1,
            anchor_col: 1,
            weights,
        }
    }

    pub fn shape(&self) -> KernelShape {
        self.shape
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn anchor(&self) -> (u32, u32) {
        (self.anchor_row, self.anchor_col)
    }

    pub fn is_active(&self, row: u32, col: u32) -> bool {
        row < self.height && col < self.width && self.weights[(row * self.width + col) as usize] != 0
    }

    /// Active cells as `(dx, dy)` offsets from the anchor
    pub fn offsets(&self) -> Vec<(i64, i64)> {
        (0..self.height)
            .flat_map(|row| (0..self.width).map(move |col| (row, col)))
            .filter(|&(row, col)| self.is_active(row, col))
            .map(|(row, col)| {
                (
                    col as i64 - self.anchor_col as i64,
                    row as i64 - self.anchor_row as i64,
                )
            })
            .collect()
    }
}

fn validate_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 || width % 2 == 0 || height % 2 == 0 {
        return Err(NucleusError::Configuration(format!(
            "structuring element must have positive odd dimensions, got {width}x{height}"
        )));
    }
    Ok(())
}

use crate::evaluator::SlopeField;
use crate::grid::{Grid, DEFAULT_SAMPLES};
use nalgebra::DMatrix;

/// Length every drawable arrow is normalized to.
pub const DEFAULT_ARROW_LENGTH: f64 = 0.3;

/// Sampling and normalization settings for a direction field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldConfig {
    pub samples: usize,
    pub arrow_length: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            arrow_length: DEFAULT_ARROW_LENGTH,
        }
    }
}

/// One arrow of the field, anchored at its grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrow {
    pub row: usize,
    pub col: usize,
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    /// Raw slope before normalization; may be infinite.
    pub slope: f64,
}

/// Unit run / slope rise vectors rescaled to a common length.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionField {
    dx: DMatrix<f64>,
    dy: DMatrix<f64>,
    slopes: DMatrix<f64>,
    gaps: DMatrix<bool>,
    arrow_length: f64,
}

impl DirectionField {
    /// Builds `(1, slope)` for every cell and scales it to `arrow_length`.
    ///
    /// NaN slopes become `(0, 0)` gaps. Infinite slopes become vertical arrows.
    pub fn from_slopes(slopes: &SlopeField, arrow_length: f64) -> Self {
        let values = slopes.values();
        let (rows, cols) = values.shape();
        let mut dx = DMatrix::zeros(rows, cols);
        let mut dy = DMatrix::zeros(rows, cols);
        let mut gaps = DMatrix::from_element(rows, cols, false);

        for col in 0..cols {
            for row in 0..rows {
                match normalize(values[(row, col)], arrow_length) {
                    Some((u, v)) => {
                        dx[(row, col)] = u;
                        dy[(row, col)] = v;
                    }
                    None => gaps[(row, col)] = true,
                }
            }
        }

        Self {
            dx,
            dy,
            slopes: values.clone(),
            gaps,
            arrow_length,
        }
    }

    pub fn dx(&self) -> &DMatrix<f64> {
        &self.dx
    }

    pub fn dy(&self) -> &DMatrix<f64> {
        &self.dy
    }

    pub fn arrow_length(&self) -> f64 {
        self.arrow_length
    }

    pub fn shape(&self) -> (usize, usize) {
        self.dx.shape()
    }

    pub fn is_gap(&self, row: usize, col: usize) -> bool {
        self.gaps.get((row, col)).copied().unwrap_or(true)
    }

    pub fn gap_count(&self) -> usize {
        self.gaps.iter().filter(|gap| **gap).count()
    }

    /// Drawable arrows in row-major order. Gaps are skipped, so every yielded
    /// coordinate is finite.
    pub fn arrows<'a>(&'a self, grid: &'a Grid) -> impl Iterator<Item = Arrow> + 'a {
        grid.points()
            .filter(move |&(row, col, _, _)| !self.is_gap(row, col))
            .map(move |(row, col, x, y)| Arrow {
                row,
                col,
                x,
                y,
                dx: self.dx[(row, col)],
                dy: self.dy[(row, col)],
                slope: self.slopes[(row, col)],
            })
    }
}

/// Scales `(1, slope)` to `length`, or `None` when the direction is undefined.
fn normalize(slope: f64, length: f64) -> Option<(f64, f64)> {
    if slope.is_nan() {
        return None;
    }
    if slope.is_infinite() {
        return Some((0.0, length.copysign(slope)));
    }
    // hypot keeps huge slopes from overflowing to an infinite magnitude.
    let magnitude = 1.0_f64.hypot(slope);
    if magnitude == 0.0 || !magnitude.is_finite() {
        return None;
    }
    Some((length / magnitude, slope / magnitude * length))
}

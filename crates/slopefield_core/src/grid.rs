use anyhow::{bail, Result};
use nalgebra::DMatrix;

/// Number of samples per axis used when nothing else is requested.
pub const DEFAULT_SAMPLES: usize = 20;

/// A closed interval `[min, max]` along one plot axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            bail!("Axis bounds must be finite (min={min}, max={max}).");
        }
        if min >= max {
            bail!("min must be less than max (min={min}, max={max}).");
        }
        Ok(Self { min, max })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Distance between neighbouring samples when the range is split into `samples` points.
    pub fn step(&self, samples: usize) -> f64 {
        if samples < 2 {
            return self.span();
        }
        self.span() / (samples - 1) as f64
    }

    /// Evenly spaced samples including both end points.
    pub fn linspace(&self, samples: usize) -> Vec<f64> {
        match samples {
            0 => Vec::new(),
            1 => vec![self.min],
            _ => {
                let step = self.step(samples);
                (0..samples)
                    .map(|i| {
                        if i == samples - 1 {
                            self.max
                        } else {
                            self.min + step * i as f64
                        }
                    })
                    .collect()
            }
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for AxisRange {
    fn default() -> Self {
        Self {
            min: -5.0,
            max: 5.0,
        }
    }
}

/// Sample locations for a direction field.
///
/// `x` and `y` share one shape: rows follow the y samples and columns follow the
/// x samples, the same layout a meshgrid of the two axes produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    x: DMatrix<f64>,
    y: DMatrix<f64>,
    x_range: AxisRange,
    y_range: AxisRange,
}

impl Grid {
    pub fn new(x_range: AxisRange, y_range: AxisRange, nx: usize, ny: usize) -> Result<Self> {
        if nx < 2 || ny < 2 {
            bail!("Each axis needs at least 2 samples (nx={nx}, ny={ny}).");
        }
        let xs = x_range.linspace(nx);
        let ys = y_range.linspace(ny);
        let x = DMatrix::from_fn(ny, nx, |_, col| xs[col]);
        let y = DMatrix::from_fn(ny, nx, |row, _| ys[row]);
        Ok(Self {
            x,
            y,
            x_range,
            y_range,
        })
    }

    /// Square grid with `samples` points on each axis.
    pub fn square(x_range: AxisRange, y_range: AxisRange, samples: usize) -> Result<Self> {
        Self::new(x_range, y_range, samples, samples)
    }

    /// Wraps caller-built coordinate matrices. The axis ranges are taken from the data.
    pub fn from_matrices(x: DMatrix<f64>, y: DMatrix<f64>) -> Result<Self> {
        if x.shape() != y.shape() {
            bail!(
                "Coordinate matrices must share a shape (x is {:?}, y is {:?}).",
                x.shape(),
                y.shape()
            );
        }
        if x.is_empty() {
            bail!("Coordinate matrices must not be empty.");
        }
        let x_range = AxisRange::new(x.min(), x.max())?;
        let y_range = AxisRange::new(y.min(), y.max())?;
        Ok(Self {
            x,
            y,
            x_range,
            y_range,
        })
    }

    /// `(rows, cols)`, i.e. `(y samples, x samples)`.
    pub fn shape(&self) -> (usize, usize) {
        self.x.shape()
    }

    pub fn x(&self) -> &DMatrix<f64> {
        &self.x
    }

    pub fn y(&self) -> &DMatrix<f64> {
        &self.y
    }

    pub fn x_range(&self) -> AxisRange {
        self.x_range
    }

    pub fn y_range(&self) -> AxisRange {
        self.y_range
    }

    /// Spacing between neighbouring columns and rows.
    pub fn cell_size(&self) -> (f64, f64) {
        let (rows, cols) = self.shape();
        (self.x_range.step(cols), self.y_range.step(rows))
    }

    /// Iterates `(row, col, x, y)` over every cell in row-major order.
    pub fn points(&self) -> impl Iterator<Item = (usize, usize, f64, f64)> + '_ {
        let (rows, cols) = self.shape();
        (0..rows).flat_map(move |row| {
            (0..cols).map(move |col| (row, col, self.x[(row, col)], self.y[(row, col)]))
        })
    }
}

//! Per-column min-max scaling of structured features.
//!
//! Fit and transform happen over the FULL matrix before splitting, so
//! test-set statistics leak into the normalization parameters. That is the
//! experiment's documented design; do not re-fit on partitions.

use ndarray::Array2;

use crate::error::{PipelineError, PipelineResult};

/// Fitted min-max scaler. Immutable value object: fitting returns a new
/// scaler, transforming never mutates it.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    mins: Vec<f64>,
    maxs: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit column minima and maxima over the full matrix.
    pub fn fit(matrix: &Array2<f64>) -> PipelineResult<Self> {
        if matrix.nrows() == 0 {
            return Err(PipelineError::EmptyInput);
        }
        let cols = matrix.ncols();
        let mut mins = vec![f64::INFINITY; cols];
        let mut maxs = vec![f64::NEG_INFINITY; cols];
        for row in matrix.rows() {
            for (c, &v) in row.iter().enumerate() {
                if v < mins[c] {
                    mins[c] = v;
                }
                if v > maxs[c] {
                    maxs[c] = v;
                }
            }
        }
        Ok(Self { mins, maxs })
    }

    /// Rescale each column to [0, 1] using the fitted range.
    ///
    /// Constant columns (zero range) map to 0.0, matching the reference
    /// scaler's zero-range handling.
    pub fn transform(&self, matrix: &Array2<f64>) -> PipelineResult<Array2<f64>> {
        if matrix.ncols() != self.mins.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.mins.len(),
                got: matrix.ncols(),
            });
        }
        let mut out = matrix.clone();
        for mut row in out.rows_mut() {
            for (c, v) in row.iter_mut().enumerate() {
                let range = self.maxs[c] - self.mins[c];
                *v = if range > 0.0 {
                    (*v - self.mins[c]) / range
                } else {
                    0.0
                };
            }
        }
        Ok(out)
    }

    /// Fit and transform in one step, the way the pipeline uses it.
    pub fn fit_transform(matrix: &Array2<f64>) -> PipelineResult<(Self, Array2<f64>)> {
        let scaler = Self::fit(matrix)?;
        let scaled = scaler.transform(matrix)?;
        Ok((scaler, scaled))
    }

    /// Fitted per-column minima.
    pub fn mins(&self) -> &[f64] {
        &self.mins
    }

    /// Fitted per-column maxima.
    pub fn maxs(&self) -> &[f64] {
        &self.maxs
    }
}

//! Logarithmic transform for flow-cytometry intensities.
//!
//! Channel intensities are heavy-tailed and span several decades, so the
//! spread-based merge metric is only meaningful in log space. Values are first
//! clipped into `[min_clip, max(data)]` so that zero and negative readings
//! (common after compensation) map to a finite floor.

use crate::error::{Error, Result};
use ndarray::Array2;

/// Logarithm base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LogBase {
    /// Base 2.
    Two,
    /// Base 10.
    #[default]
    Ten,
    /// Natural logarithm.
    E,
}

/// Clip-then-log transform.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogTransform {
    /// Logarithm base.
    pub base: LogBase,
    /// Lower clipping bound. Must be strictly positive.
    pub min_clip: f64,
}

impl Default for LogTransform {
    fn default() -> Self {
        Self {
            base: LogBase::Ten,
            min_clip: 1e-5,
        }
    }
}

impl LogTransform {
    /// Base-10 transform with the default clip floor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the logarithm base.
    pub fn with_base(mut self, base: LogBase) -> Self {
        self.base = base;
        self
    }

    /// Set the lower clipping bound.
    pub fn with_min_clip(mut self, min_clip: f64) -> Self {
        self.min_clip = min_clip;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.min_clip > 0.0 && self.min_clip.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "min_clip",
                message: "must be finite and > 0",
            });
        }
        Ok(())
    }

    #[inline]
    fn log(&self, x: f64) -> f64 {
        match self.base {
            LogBase::Two => x.log2(),
            LogBase::Ten => x.log10(),
            LogBase::E => x.ln(),
        }
    }

    /// Transform a whole matrix. The upper clip bound is the matrix maximum.
    pub fn apply(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.validate()?;
        let upper = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(self.apply_bounded(data, upper))
    }

    /// Transform with an explicit upper clip bound.
    ///
    /// Used to map user-chosen centers into the same space as the data they
    /// will be compared against.
    pub fn apply_with_upper(&self, data: &Array2<f64>, upper: f64) -> Result<Array2<f64>> {
        self.validate()?;
        Ok(self.apply_bounded(data, upper))
    }

    fn apply_bounded(&self, data: &Array2<f64>, upper: f64) -> Array2<f64> {
        // A matrix entirely below the floor clips everything to the floor.
        let upper = upper.max(self.min_clip);
        data.mapv(|x| self.log(x.clamp(self.min_clip, upper)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_log10_default() {
        let data = array![[1.0, 10.0], [100.0, 1000.0]];
        let out = LogTransform::new().apply(&data).unwrap();
        assert!((out[[0, 0]] - 0.0).abs() < 1e-12);
        assert!((out[[0, 1]] - 1.0).abs() < 1e-12);
        assert!((out[[1, 1]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_clips_non_positive() {
        let data = array![[-5.0, 0.0], [8.0, 4.0]];
        let out = LogTransform::new()
            .with_base(LogBase::Two)
            .with_min_clip(0.25)
            .apply(&data)
            .unwrap();
        assert_eq!(out[[0, 0]], -2.0);
        assert_eq!(out[[0, 1]], -2.0);
        assert_eq!(out[[1, 0]], 3.0);
        assert!(out.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_upper_bound_clips() {
        let centers = array![[50.0], [5.0]];
        let out = LogTransform::new().apply_with_upper(&centers, 10.0).unwrap();
        assert!((out[[0, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_natural_log() {
        let data = array![[std::f64::consts::E]];
        let out = LogTransform::new().with_base(LogBase::E).apply(&data).unwrap();
        assert!((out[[0, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_positive_clip() {
        let data = array![[1.0]];
        assert!(LogTransform::new().with_min_clip(0.0).apply(&data).is_err());
    }
}

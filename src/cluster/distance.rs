//! Spread-based cluster distance (Bakker Schut, Grooth & Greve, 1993).
//!
//! Decides which two clusters merge next during agglomeration. For every
//! channel `d` each cluster contributes its mean and two **spread values**,
//! one for the values above the mean and one for those below:
//!
//! ```text
//! SVH[d] = σ[d] / √|{x > μ[d]}|        SVL[d] = σ[d] / √|{x < μ[d]}|
//!
//! dist(A, B) = Σ_d  |μA[d] − μB[d]| − (SVH_A[d] + SVL_A[d] + SVH_B[d] + SVL_B[d])
//! ```
//!
//! This is a merge-priority score, not a metric. It goes negative whenever the
//! spreads exceed the separation of the means, which is exactly the case of two
//! heavily overlapping populations that should merge first.
//!
//! `σ` is the population standard deviation (divide by `n`). Singleton clusters
//! have zero spread in every channel, and an empty side (`|{x > μ}| = 0`) has
//! zero spread on that side.

use crate::error::{Error, Result};
use ndarray::{Array1, ArrayView2};

/// Per-channel mean and spread values of one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadStats {
    mean: Array1<f64>,
    high: Array1<f64>,
    low: Array1<f64>,
    len: usize,
}

impl SpreadStats {
    /// Summarize every row of `rows`. Returns `None` for an empty cluster.
    pub fn from_rows(rows: ArrayView2<'_, f64>) -> Option<Self> {
        Self::compute(rows.nrows(), rows.ncols(), |i, d| rows[[i, d]])
    }

    /// Summarize the rows of `data` listed in `indices`, without copying them.
    pub fn from_indices(data: ArrayView2<'_, f64>, indices: &[usize]) -> Option<Self> {
        Self::compute(indices.len(), data.ncols(), |i, d| data[[indices[i], d]])
    }

    fn compute(n: usize, dims: usize, value: impl Fn(usize, usize) -> f64) -> Option<Self> {
        if n == 0 {
            return None;
        }

        let mut mean = Array1::zeros(dims);
        let mut high = Array1::zeros(dims);
        let mut low = Array1::zeros(dims);
        let n_f = n as f64;

        for d in 0..dims {
            let mu = (0..n).map(|i| value(i, d)).sum::<f64>() / n_f;
            mean[d] = mu;

            if n == 1 {
                continue;
            }

            let mut ss = 0.0;
            let mut n_high = 0usize;
            let mut n_low = 0usize;
            for i in 0..n {
                let x = value(i, d);
                let dx = x - mu;
                ss += dx * dx;
                if x > mu {
                    n_high += 1;
                } else if x < mu {
                    n_low += 1;
                }
            }
            let sigma = (ss / n_f).sqrt();

            if n_high > 0 {
                high[d] = sigma / (n_high as f64).sqrt();
            }
            if n_low > 0 {
                low[d] = sigma / (n_low as f64).sqrt();
            }
        }

        Some(Self {
            mean,
            high,
            low,
            len: n,
        })
    }

    /// Per-channel means.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Per-channel spread above the mean (SVH).
    pub fn high(&self) -> &Array1<f64> {
        &self.high
    }

    /// Per-channel spread below the mean (SVL).
    pub fn low(&self) -> &Array1<f64> {
        &self.low
    }

    /// Number of rows summarized.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; empty clusters have no stats.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of channels.
    pub fn dims(&self) -> usize {
        self.mean.len()
    }

    /// Merge-priority score between `self` and `other`. Lower merges first.
    pub fn distance_to(&self, other: &SpreadStats) -> f64 {
        debug_assert_eq!(self.dims(), other.dims());
        (0..self.dims())
            .map(|d| {
                let separation = (self.mean[d] - other.mean[d]).abs();
                separation - (self.high[d] + self.low[d] + other.high[d] + other.low[d])
            })
            .sum()
    }
}

/// Merge-priority score between two clusters given as row sets.
///
/// Both clusters must be non-empty and have the same number of channels.
pub fn cluster_distance(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Result<f64> {
    if a.ncols() != b.ncols() {
        return Err(Error::DimensionMismatch {
            expected: a.ncols(),
            found: b.ncols(),
        });
    }
    let sa = SpreadStats::from_rows(a).ok_or(Error::EmptyCluster { id: 0 })?;
    let sb = SpreadStats::from_rows(b).ok_or(Error::EmptyCluster { id: 1 })?;
    Ok(sa.distance_to(&sb))
}

//! k-means++ seeding with greedy local trials.
//!
//! Picks well-separated starting centers (Arthur & Vassilvitskii, 2007):
//!
//! 1. Choose the first center uniformly at random.
//! 2. Keep `D(x)²`, the squared distance of every row to its nearest center,
//!    and the potential `φ = Σ D(x)²`.
//! 3. For each further center, draw `n_local_trials` candidates with
//!    probability proportional to `D(x)²` and keep the one whose addition
//!    gives the smallest new potential.
//!
//! Plain k-means++ is the special case `n_local_trials = 1`. The extra trials
//! make the chosen set less sensitive to a single unlucky draw, which matters
//! when the seeds feed an over-segmentation with hundreds of centers.

use crate::error::{Error, Result};
use crate::events::EventMatrix;
use ndarray::{Array2, ArrayView1};
use rand::prelude::*;
use tracing::debug;

/// k-means++ seed chooser.
#[derive(Debug, Clone)]
pub struct KmeansPlusPlus {
    /// Number of centers to choose.
    k: usize,
    /// Candidates drawn per center.
    n_local_trials: usize,
    /// Random seed.
    seed: Option<u64>,
}

impl KmeansPlusPlus {
    /// Choose `k` centers with 10 local trials per center.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            n_local_trials: 10,
            seed: None,
        }
    }

    /// Set the number of candidates drawn per center.
    pub fn with_local_trials(mut self, n_local_trials: usize) -> Self {
        self.n_local_trials = n_local_trials;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Choose centers from row-major data. Returns copies of the chosen rows.
    pub fn choose(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let events = EventMatrix::from_rows(data)?;
        let centers = self.choose_from(&events)?;
        Ok(centers.outer_iter().map(|r| r.to_vec()).collect())
    }

    /// Choose centers from a validated event matrix, seeding the RNG from the config.
    pub fn choose_from(&self, events: &EventMatrix) -> Result<Array2<f64>> {
        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };
        self.choose_with_rng(events, &mut rng)
    }

    /// Choose centers using a caller-supplied random source.
    ///
    /// `k > n` is rejected. `k == n` is allowed but may repeat rows.
    pub fn choose_with_rng<R: Rng + ?Sized>(
        &self,
        events: &EventMatrix,
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        let n = events.nrows();
        if self.k == 0 || self.k > n {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }
        if self.n_local_trials == 0 {
            return Err(Error::InvalidParameter {
                name: "n_local_trials",
                message: "must be >= 1",
            });
        }

        let mut chosen: Vec<usize> = Vec::with_capacity(self.k);
        let first = rng.random_range(0..n);
        chosen.push(first);

        let mut closest: Vec<f64> = (0..n)
            .map(|i| squared_distance(&events.row(i), &events.row(first)))
            .collect();
        let mut potential: f64 = closest.iter().sum();

        while chosen.len() < self.k {
            let mut best: Option<(usize, f64)> = None;

            for _ in 0..self.n_local_trials {
                let candidate = sample_proportional(&closest, potential, rng);
                let new_potential: f64 = (0..n)
                    .map(|i| closest[i].min(squared_distance(&events.row(i), &events.row(candidate))))
                    .sum();

                if best.map_or(true, |(_, p)| new_potential < p) {
                    best = Some((candidate, new_potential));
                }
            }

            let Some((index, new_potential)) = best else {
                break;
            };
            for (i, slot) in closest.iter_mut().enumerate() {
                let d = squared_distance(&events.row(i), &events.row(index));
                if d < *slot {
                    *slot = d;
                }
            }
            potential = new_potential;
            chosen.push(index);
        }

        debug!(k = self.k, rows = n, potential, "k-means++ seeding complete");
        Ok(events.select(&chosen))
    }
}

/// D²-sampling: walk rows in order, subtracting each weight from a uniform draw
/// in `[0, total)` until it is exhausted.
fn sample_proportional<R: Rng + ?Sized>(weights: &[f64], total: f64, rng: &mut R) -> usize {
    if total <= 0.0 {
        // Every row coincides with a chosen center.
        return rng.random_range(0..weights.len());
    }

    let mut remaining = rng.random::<f64>() * total;
    for (i, &w) in weights.iter().enumerate() {
        if remaining < w {
            return i;
        }
        remaining -= w;
    }
    // Rounding can leave a sliver past the last positive weight.
    weights.iter().rposition(|&w| w > 0.0).unwrap_or(weights.len() - 1)
}

#[inline]
pub(crate) fn squared_distance(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_equal(a: &[f64], b: &[f64]) -> bool {
        a.iter().zip(b).all(|(x, y)| x == y)
    }

    #[test]
    fn test_returns_k_rows_from_data() {
        let data: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i % 7) as f64, (i / 7) as f64 * 3.0])
            .collect();

        let centers = KmeansPlusPlus::new(6).with_seed(7).choose(&data).unwrap();
        assert_eq!(centers.len(), 6);
        for c in &centers {
            assert!(data.iter().any(|r| rows_equal(r, c)), "{c:?} is not a data row");
        }
    }

    #[test]
    fn test_k_one_returns_single_row() {
        let data = vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]];
        let centers = KmeansPlusPlus::new(1).with_seed(3).choose(&data).unwrap();
        assert_eq!(centers.len(), 1);
        assert!(data.iter().any(|r| rows_equal(r, &centers[0])));
    }

    #[test]
    fn test_spreads_over_separated_groups() {
        // Three tight groups; three seeds must land one per group.
        let mut data = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (100.0, 0.0), (0.0, 100.0)] {
            for j in 0..5 {
                data.push(vec![cx + j as f64 * 0.01, cy]);
            }
        }

        for seed in 0..10 {
            let centers = KmeansPlusPlus::new(3).with_seed(seed).choose(&data).unwrap();
            let mut groups: Vec<usize> = centers
                .iter()
                .map(|c| data.iter().position(|r| rows_equal(r, c)).unwrap() / 5)
                .collect();
            groups.sort_unstable();
            assert_eq!(groups, vec![0, 1, 2], "seed {seed}");
        }
    }

    #[test]
    fn test_deterministic_with_seed() {
        let data: Vec<Vec<f64>> = (0..30).map(|i| vec![(i * i % 17) as f64]).collect();
        let a = KmeansPlusPlus::new(4).with_seed(11).choose(&data).unwrap();
        let b = KmeansPlusPlus::new(4).with_seed(11).choose(&data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_all_identical_rows() {
        let data = vec![vec![5.0, 5.0]; 4];
        let centers = KmeansPlusPlus::new(3).with_seed(1).choose(&data).unwrap();
        assert_eq!(centers, vec![vec![5.0, 5.0]; 3]);
    }

    #[test]
    fn test_invalid_k() {
        let data = vec![vec![0.0], vec![1.0]];
        assert!(KmeansPlusPlus::new(0).choose(&data).is_err());
        assert!(KmeansPlusPlus::new(3).choose(&data).is_err());
        assert!(KmeansPlusPlus::new(1).with_local_trials(0).choose(&data).is_err());
    }

    #[test]
    fn test_sample_proportional_skips_zero_weights() {
        let mut rng = StdRng::seed_from_u64(5);
        let weights = [0.0, 0.0, 4.0, 0.0];
        for _ in 0..50 {
            assert_eq!(sample_proportional(&weights, 4.0, &mut rng), 2);
        }
    }
}

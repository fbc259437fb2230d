//! K-means clustering.
//!
//! Partitions events into k clusters by alternating two steps (Lloyd):
//!
//! 1. **Assign**: each event goes to its nearest center (squared Euclidean)
//! 2. **Update**: each center moves to the mean (or median) of its events
//!
//! # Two Modes
//!
//! - **Random restarts** (default): run `n_passes` independent passes, each
//!   starting from k distinct events drawn uniformly, and keep the pass with
//!   the lowest within-cluster error. The status message reports how many
//!   passes reached that same partition, a rough stability signal.
//! - **Manual centers**: a single deterministic refinement from the supplied
//!   centers. Label `i` is the cluster that grew out of center `i`. If some
//!   center attracts no events the result is still returned, with a warning
//!   in the message so the caller can retry with different centers.
//!
//! # Median Centers
//!
//! With [`CenterMethod::Median`] the update step uses the per-channel median,
//! which is robust to the long tails typical of cytometry channels. The pass
//! error is then the L1 distance to the centers rather than the squared L2.

use super::traits::{Assignment, Clustering};
use crate::error::{Error, Result};
use crate::events::{count_distinct, renumber_by_first_appearance, EventMatrix};
use crate::transform::LogTransform;
use ndarray::{Array2, ArrayView1};
use rand::prelude::*;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How a cluster's center is recomputed each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CenterMethod {
    /// Arithmetic mean.
    #[default]
    Mean,
    /// Per-channel median.
    Median,
}

impl CenterMethod {
    /// Every variant, in display order.
    pub const ALL: [CenterMethod; 2] = [CenterMethod::Mean, CenterMethod::Median];

    /// Stable lowercase key.
    pub fn as_str(&self) -> &'static str {
        match self {
            CenterMethod::Mean => "mean",
            CenterMethod::Median => "median",
        }
    }
}

impl fmt::Display for CenterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CenterMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "a" => Ok(CenterMethod::Mean),
            "median" | "m" => Ok(CenterMethod::Median),
            _ => Err(Error::InvalidParameter {
                name: "center",
                message: "expected 'mean' or 'median'",
            }),
        }
    }
}

/// K-means clustering algorithm.
#[derive(Debug, Clone)]
pub struct Kmeans {
    /// Number of clusters.
    k: usize,
    /// Independent random restarts.
    n_passes: usize,
    /// Center update rule.
    center: CenterMethod,
    /// Manually chosen starting centers.
    initial_centers: Option<Vec<Vec<f64>>>,
    /// Optional transform applied to data (and manual centers) first.
    transform: Option<LogTransform>,
    /// Maximum iterations per pass.
    max_iter: usize,
    /// Convergence tolerance on total squared center shift.
    tol: f64,
    /// Random seed.
    seed: Option<u64>,
}

/// Outcome of one Lloyd run.
#[derive(Debug, Clone)]
struct Pass {
    labels: Vec<usize>,
    error: f64,
    iterations: usize,
}

impl Kmeans {
    /// Create a new K-means clusterer.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            n_passes: 1,
            center: CenterMethod::Mean,
            initial_centers: None,
            transform: None,
            max_iter: 100,
            tol: 1e-8,
            seed: None,
        }
    }

    /// Set the number of random restarts.
    pub fn with_passes(mut self, n_passes: usize) -> Self {
        self.n_passes = n_passes;
        self
    }

    /// Set the center update rule.
    pub fn with_center(mut self, center: CenterMethod) -> Self {
        self.center = center;
        self
    }

    /// Refine from these centers instead of restarting randomly.
    ///
    /// Only the first `k` centers are used.
    pub fn with_initial_centers(mut self, centers: Vec<Vec<f64>>) -> Self {
        self.initial_centers = Some(centers);
        self
    }

    /// Transform data (and manual centers) before clustering.
    pub fn with_transform(mut self, transform: LogTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self, n: usize, d: usize) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidClusterCount {
                requested: 0,
                n_items: n,
            });
        }
        // Manual centers may outnumber the events; the surplus ends up empty.
        if self.k > n && self.initial_centers.is_none() {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "must be >= 1",
            });
        }
        match &self.initial_centers {
            Some(centers) => {
                if centers.len() < self.k {
                    return Err(Error::InvalidClusterCount {
                        requested: self.k,
                        n_items: centers.len(),
                    });
                }
                if let Some(c) = centers.iter().take(self.k).find(|c| c.len() != d) {
                    return Err(Error::DimensionMismatch {
                        expected: d,
                        found: c.len(),
                    });
                }
                if centers.iter().take(self.k).flatten().any(|x| !x.is_finite()) {
                    return Err(Error::InvalidParameter {
                        name: "initial_centers",
                        message: "centers must be finite",
                    });
                }
            }
            None => {
                if self.n_passes == 0 {
                    return Err(Error::InvalidParameter {
                        name: "n_passes",
                        message: "must be >= 1",
                    });
                }
            }
        }
        Ok(())
    }

    /// Cluster a validated event matrix.
    pub fn fit_events(&self, events: &EventMatrix) -> Result<Assignment> {
        let (n, d) = (events.nrows(), events.ncols());
        self.validate(n, d)?;

        debug!(
            rows = n,
            dims = d,
            k = self.k,
            passes = self.n_passes,
            center = %self.center,
            manual = self.initial_centers.is_some(),
            "running k-means"
        );

        let raw = events.view().to_owned();
        let data = match &self.transform {
            Some(t) => t.apply(&raw)?,
            None => raw,
        };

        match &self.initial_centers {
            Some(centers) => self.fit_manual(events, &data, centers),
            None => Ok(self.fit_restarts(&data)),
        }
    }

    fn fit_manual(
        &self,
        events: &EventMatrix,
        data: &Array2<f64>,
        centers: &[Vec<f64>],
    ) -> Result<Assignment> {
        let d = data.ncols();
        let flat: Vec<f64> = centers.iter().take(self.k).flatten().copied().collect();
        let mut init =
            Array2::from_shape_vec((self.k, d), flat).map_err(|e| Error::Other(e.to_string()))?;
        if let Some(t) = &self.transform {
            let upper = events.view().iter().copied().fold(f64::NEG_INFINITY, f64::max);
            init = t.apply_with_upper(&init, upper)?;
        }

        let pass = self.refine(data, init);
        let used = count_distinct(&pass.labels);
        let message = if used < self.k {
            warn!(
                requested = self.k,
                non_empty = used,
                "k-means from manual centers left clusters empty"
            );
            format!(
                "Warning: {} of {} clusters are empty. Choose different initial cluster centers and re-run k-means.",
                self.k - used,
                self.k
            )
        } else {
            format!(
                "Refined {} manually chosen centers in {} iterations",
                self.k, pass.iterations
            )
        };

        info!(clusters = used, iterations = pass.iterations, "k-means complete");
        Ok(Assignment::new(pass.labels, message))
    }

    fn fit_restarts(&self, data: &Array2<f64>) -> Assignment {
        let base_seed = self.seed.unwrap_or_else(|| rand::rng().random());

        let run = |pass: usize| {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(pass as u64));
            let picked = rand::seq::index::sample(&mut rng, data.nrows(), self.k).into_vec();
            let init = data.select(ndarray::Axis(0), &picked);
            self.refine(data, init)
        };

        #[cfg(feature = "parallel")]
        let passes: Vec<Pass> = (0..self.n_passes).into_par_iter().map(run).collect();

        #[cfg(not(feature = "parallel"))]
        let passes: Vec<Pass> = (0..self.n_passes).map(run).collect();

        // Earliest pass wins ties so the result does not depend on scheduling.
        let best = passes
            .iter()
            .enumerate()
            .min_by(|(ia, a), (ib, b)| a.error.total_cmp(&b.error).then(ia.cmp(ib)))
            .map(|(i, _)| i)
            .unwrap_or(0);

        let best_shape = renumber_by_first_appearance(&passes[best].labels);
        let n_found = passes
            .iter()
            .filter(|p| renumber_by_first_appearance(&p.labels) == best_shape)
            .count();

        info!(
            clusters = count_distinct(&passes[best].labels),
            error = passes[best].error,
            n_found,
            "k-means complete"
        );

        let labels = passes.into_iter().nth(best).map(|p| p.labels).unwrap_or_default();
        Assignment::new(
            labels,
            format!("Number of rounds optimal solution was found: {n_found}"),
        )
    }

    /// Lloyd iterations from the given starting centers.
    ///
    /// Empty clusters keep their previous center.
    fn refine(&self, data: &Array2<f64>, mut centers: Array2<f64>) -> Pass {
        let n = data.nrows();
        let k = centers.nrows();
        let mut labels = vec![0usize; n];
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            iterations = iter + 1;
            let changed = assign(data, &centers, &mut labels);

            let new_centers = self.update_centers(data, &labels, &centers);
            let shift: f64 = centers
                .iter()
                .zip(new_centers.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            centers = new_centers;

            if (iter > 0 && !changed) || shift < self.tol {
                break;
            }
        }

        // Final assignment against the settled centers.
        assign(data, &centers, &mut labels);

        let error = (0..n)
            .map(|i| self.point_error(&data.row(i), &centers.row(labels[i])))
            .sum();
        debug_assert!(labels.iter().all(|&l| l < k));

        Pass {
            labels,
            error,
            iterations,
        }
    }

    fn update_centers(&self, data: &Array2<f64>, labels: &[usize], previous: &Array2<f64>) -> Array2<f64> {
        let (k, d) = previous.dim();
        let mut centers = previous.clone();

        match self.center {
            CenterMethod::Mean => {
                let mut sums = Array2::<f64>::zeros((k, d));
                let mut counts = vec![0usize; k];
                for (i, &c) in labels.iter().enumerate() {
                    let mut row = sums.row_mut(c);
                    row += &data.row(i);
                    counts[c] += 1;
                }
                for c in 0..k {
                    if counts[c] > 0 {
                        let mean = &sums.row(c) / counts[c] as f64;
                        centers.row_mut(c).assign(&mean);
                    }
                }
            }
            CenterMethod::Median => {
                let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
                for (i, &c) in labels.iter().enumerate() {
                    members[c].push(i);
                }
                for (c, rows) in members.iter().enumerate() {
                    if rows.is_empty() {
                        continue;
                    }
                    for j in 0..d {
                        let mut values: Vec<f64> = rows.iter().map(|&i| data[[i, j]]).collect();
                        centers[[c, j]] = median(&mut values);
                    }
                }
            }
        }
        centers
    }

    fn point_error(&self, a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
        match self.center {
            CenterMethod::Mean => super::seeding::squared_distance(a, b),
            CenterMethod::Median => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
        }
    }

    /// Refine from centers over already-prepared data, for callers that own
    /// their own seeding (the Bakker-Schut over-segmentation).
    pub(crate) fn refine_labels(&self, data: &Array2<f64>, centers: Array2<f64>) -> Vec<usize> {
        self.refine(data, centers).labels
    }
}

/// Nearest-center assignment. Returns whether any label changed.
fn assign(data: &Array2<f64>, centers: &Array2<f64>, labels: &mut [usize]) -> bool {
    let k = centers.nrows();
    let nearest = |i: usize| {
        let point = data.row(i);
        let mut best_cluster = 0;
        let mut best_dist = f64::INFINITY;
        for c in 0..k {
            let dist = super::seeding::squared_distance(&point, &centers.row(c));
            if dist < best_dist {
                best_dist = dist;
                best_cluster = c;
            }
        }
        best_cluster
    };

    let update = |(i, label): (usize, &mut usize)| {
        let c = nearest(i);
        let changed = *label != c;
        *label = c;
        changed
    };

    #[cfg(feature = "parallel")]
    let changed = labels
        .par_iter_mut()
        .enumerate()
        .map(update)
        .reduce(|| false, |a, b| a || b);

    #[cfg(not(feature = "parallel"))]
    let changed = labels.iter_mut().enumerate().map(update).fold(false, |a, b| a || b);

    changed
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let m = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[m - 1] + values[m]) / 2.0
    } else {
        values[m]
    }
}

impl Clustering for Kmeans {
    fn fit(&self, data: &[Vec<f64>]) -> Result<Assignment> {
        let events = EventMatrix::from_rows(data)?;
        self.fit_events(&events)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_groups() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
        ]
    }

    #[test]
    fn test_kmeans_basic() {
        let kmeans = Kmeans::new(2).with_passes(5).with_seed(42);
        let labels = kmeans.fit_predict(&two_groups()).unwrap();

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_kmeans_all_points_assigned() {
        let data: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![i as f64 * 0.1, (i % 5) as f64])
            .collect();

        let labels = Kmeans::new(5).with_seed(123).fit_predict(&data).unwrap();

        assert_eq!(labels.len(), data.len());
        for &label in &labels {
            assert!(label < 5, "label {} out of range", label);
        }
    }

    #[test]
    fn test_kmeans_k_equals_n() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let labels = Kmeans::new(3).with_seed(42).fit_predict(&data).unwrap();
        assert_eq!(count_distinct(&labels), 3);
    }

    #[test]
    fn test_kmeans_deterministic_with_seed() {
        let data: Vec<Vec<f64>> = (0..40).map(|i| vec![(i * 7 % 13) as f64, (i % 4) as f64]).collect();
        let a = Kmeans::new(3).with_passes(4).with_seed(9).fit(&data).unwrap();
        let b = Kmeans::new(3).with_passes(4).with_seed(9).fit(&data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_restart_message_counts_passes() {
        let out = Kmeans::new(2).with_passes(6).with_seed(1).fit(&two_groups()).unwrap();
        // Any two-center start on two distant pairs converges to the same split.
        assert_eq!(out.message, "Number of rounds optimal solution was found: 6");
    }

    #[test]
    fn test_manual_centers_assign_to_nearest() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.5, 0.2],
            vec![50.0, 0.0],
            vec![49.5, 0.4],
            vec![0.0, 50.0],
            vec![0.3, 49.8],
        ];
        let centers = vec![vec![50.0, 0.0], vec![0.0, 50.0], vec![0.0, 0.0]];

        let out = Kmeans::new(3).with_initial_centers(centers).fit(&data).unwrap();
        assert_eq!(out.labels, vec![2, 2, 0, 0, 1, 1]);
        assert!(!out.message.starts_with("Warning"));
    }

    #[test]
    fn test_manual_centers_degenerate_warns() {
        let data = vec![vec![0.0], vec![0.1], vec![0.2]];
        // The far center attracts nothing.
        let centers = vec![vec![0.1], vec![1000.0]];

        let out = Kmeans::new(2).with_initial_centers(centers).fit(&data).unwrap();
        assert_eq!(out.labels, vec![0, 0, 0]);
        assert!(out.message.starts_with("Warning: 1 of 2 clusters are empty"));
    }

    #[test]
    fn test_manual_centers_extra_ignored() {
        let data = vec![vec![0.0], vec![10.0]];
        let centers = vec![vec![0.0], vec![10.0], vec![5.0]];
        let out = Kmeans::new(2).with_initial_centers(centers).fit(&data).unwrap();
        assert_eq!(out.labels, vec![0, 1]);
    }

    #[test]
    fn test_manual_centers_more_than_events_warns() {
        let data = vec![vec![0.0], vec![10.0]];
        let centers = vec![vec![0.0], vec![10.0], vec![20.0]];

        let out = Kmeans::new(3).with_initial_centers(centers).fit(&data).unwrap();
        assert_eq!(out.labels, vec![0, 1]);
        assert!(out.message.starts_with("Warning: 1 of 3 clusters are empty"), "{}", out.message);

        assert!(Kmeans::new(3).fit(&data).is_err());
    }

    #[test]
    fn test_manual_centers_validation() {
        let data = two_groups();
        assert!(matches!(
            Kmeans::new(2).with_initial_centers(vec![vec![0.0, 0.0]]).fit(&data),
            Err(Error::InvalidClusterCount { .. })
        ));
        assert!(matches!(
            Kmeans::new(1).with_initial_centers(vec![vec![0.0, 0.0, 0.0]]).fit(&data),
            Err(Error::DimensionMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_median_centers() {
        // An outlier drags the mean but not the median.
        let data = vec![vec![0.0], vec![1.0], vec![2.0], vec![100.0], vec![200.0], vec![201.0], vec![202.0]];
        let centers = vec![vec![1.0], vec![201.0]];
        let out = Kmeans::new(2)
            .with_center(CenterMethod::Median)
            .with_initial_centers(centers)
            .fit(&data)
            .unwrap();
        assert_eq!(out.labels, vec![0, 0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_center_method_parse() {
        assert_eq!("mean".parse::<CenterMethod>().unwrap(), CenterMethod::Mean);
        assert_eq!("M".parse::<CenterMethod>().unwrap(), CenterMethod::Median);
        assert!("mode".parse::<CenterMethod>().is_err());
    }

    #[test]
    fn test_log_transform_applied_to_centers() {
        // Linearly 4000 is nearer the 1000 center; in log space it is nearer 10000.
        let data = vec![vec![1000.0], vec![4000.0], vec![10000.0]];
        let centers = vec![vec![1000.0], vec![10000.0]];
        let out = Kmeans::new(2)
            .with_initial_centers(centers)
            .with_transform(LogTransform::new())
            .with_max_iter(1)
            .fit(&data)
            .unwrap();
        assert_eq!(out.labels, vec![0, 1, 1]);

        let linear = Kmeans::new(2)
            .with_initial_centers(vec![vec![1000.0], vec![10000.0]])
            .with_max_iter(1)
            .fit(&data)
            .unwrap();
        assert_eq!(linear.labels, vec![0, 0, 1]);
    }

    #[test]
    fn test_kmeans_invalid_config() {
        let data = two_groups();
        assert!(Kmeans::new(0).fit(&data).is_err());
        assert!(Kmeans::new(5).fit(&data).is_err());
        assert!(Kmeans::new(2).with_passes(0).fit(&data).is_err());
        assert!(Kmeans::new(2).fit(&[]).is_err());
    }
}

//! Bakker Schut k-means for flow cytometry.
//!
//! Ordinary k-means with a small k is unstable on biological populations,
//! which are rarely convex. Bakker Schut, Grooth & Greve (1993) instead
//! over-segment and then merge:
//!
//! 1. **Init**: clip and log-transform the events. Readings below 1 are
//!    floored at 1 (log 0), so near-zero events stay together
//! 2. **Over-segment**: k-means++ seeds (200 by default, as the authors
//!    suggest) refined by one k-means run
//! 3. **Merge**: agglomerate with the spread-based score
//!    ([`super::distance`]) until `n_clusters` remain
//!
//! The final labels are contiguous from 0, numbered by first appearance.
//!
//! # Reference
//!
//! T.C. Bakker Schut, B.G. de Grooth, J. Greve. "Cluster analysis of flow
//! cytometric list mode data on a personal computer." Cytometry 14 (1993) 649-659.

use super::kmeans::Kmeans;
use super::merge::{MergeOutcome, Merger};
use super::seeding::KmeansPlusPlus;
use super::traits::{Assignment, Clustering};
use crate::error::{Error, Result};
use crate::events::EventMatrix;
use crate::transform::LogTransform;
use rand::prelude::*;
use tracing::{debug, info, warn};

/// Over-segmentation size recommended by the original authors.
pub const DEFAULT_INIT_CLUSTERS: usize = 200;

/// Clip floor of the default transform.
pub const DEFAULT_MIN_CLIP: f64 = 1.0;

/// Bakker Schut over-segment-and-merge clustering.
#[derive(Debug, Clone)]
pub struct BakkerSchut {
    /// Final number of clusters.
    k: usize,
    /// Clusters produced by the over-segmentation.
    init_clusters: usize,
    /// k-means++ candidates per seed.
    n_local_trials: usize,
    /// Transform applied before clustering.
    transform: LogTransform,
    /// Lloyd iterations for the over-segmentation.
    max_iter: usize,
    /// Random seed.
    seed: Option<u64>,
}

impl BakkerSchut {
    /// Cluster into `k` final clusters.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            init_clusters: DEFAULT_INIT_CLUSTERS,
            n_local_trials: 10,
            transform: LogTransform::new().with_min_clip(DEFAULT_MIN_CLIP),
            max_iter: 100,
            seed: None,
        }
    }

    /// Set the over-segmentation size.
    pub fn with_init_clusters(mut self, init_clusters: usize) -> Self {
        self.init_clusters = init_clusters;
        self
    }

    /// Set the k-means++ candidates drawn per seed.
    pub fn with_local_trials(mut self, n_local_trials: usize) -> Self {
        self.n_local_trials = n_local_trials;
        self
    }

    /// Set the transform applied before clustering.
    pub fn with_transform(mut self, transform: LogTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Set Lloyd iterations for the over-segmentation.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Run the full pipeline and return labels with the merge history.
    pub fn fit_detailed(&self, data: &[Vec<f64>]) -> Result<MergeOutcome> {
        let events = EventMatrix::from_rows(data)?;
        self.fit_events(&events)
    }

    /// Run the full pipeline on a validated event matrix.
    pub fn fit_events(&self, events: &EventMatrix) -> Result<MergeOutcome> {
        if self.k == 0 {
            return Err(Error::InvalidClusterCount {
                requested: 0,
                n_items: events.nrows(),
            });
        }
        if self.init_clusters == 0 {
            return Err(Error::InvalidParameter {
                name: "init_clusters",
                message: "must be >= 1",
            });
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "must be >= 1",
            });
        }

        let n = events.nrows();
        let log_events = EventMatrix::from_array(self.transform.apply(&events.view().to_owned())?)?;

        let n_seeds = self.init_clusters.min(n);
        if n_seeds < self.init_clusters {
            warn!(
                requested = self.init_clusters,
                rows = n,
                "fewer events than initial clusters; seeding every event"
            );
        }

        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };
        let centers = KmeansPlusPlus::new(n_seeds)
            .with_local_trials(self.n_local_trials)
            .choose_with_rng(&log_events, &mut rng)?;

        let log_data = log_events.into_inner();
        let over_segmented = Kmeans::new(n_seeds)
            .with_max_iter(self.max_iter)
            .refine_labels(&log_data, centers);
        debug!(
            rows = n,
            seeds = n_seeds,
            target = self.k,
            "over-segmentation complete"
        );

        let outcome = Merger::new(self.k).merge(log_data.view(), &over_segmented)?;
        info!(
            initial = outcome.initial_clusters,
            clusters = outcome.n_clusters(),
            merges = outcome.steps.len(),
            "bakker-schut clustering complete"
        );
        Ok(outcome)
    }
}

impl Clustering for BakkerSchut {
    fn fit(&self, data: &[Vec<f64>]) -> Result<Assignment> {
        let outcome = self.fit_detailed(data)?;
        let message = if outcome.steps.is_empty() {
            format!(
                "Over-segmentation produced {} clusters; no merges needed",
                outcome.initial_clusters
            )
        } else {
            format!(
                "Merged {} initial clusters into {}",
                outcome.initial_clusters,
                outcome.n_clusters()
            )
        };
        Ok(Assignment::new(outcome.labels, message))
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

//! Clustering traits.

use crate::error::Result;

/// Result of one clustering run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// One cluster label per input event.
    pub labels: Vec<usize>,
    /// Human-readable status for display. Not meant to be parsed.
    pub message: String,
}

impl Assignment {
    /// Bundle labels with a status message.
    pub fn new(labels: Vec<usize>, message: impl Into<String>) -> Self {
        Self {
            labels,
            message: message.into(),
        }
    }

    /// Number of distinct labels.
    pub fn n_clusters(&self) -> usize {
        crate::events::count_distinct(&self.labels)
    }
}

/// Trait for clustering algorithms.
pub trait Clustering {
    /// Fit the model to data and return assignments with a status message.
    fn fit(&self, data: &[Vec<f64>]) -> Result<Assignment>;

    /// Fit the model to data and return cluster assignments only.
    ///
    /// Returns a vector of cluster labels, one per input point.
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        self.fit(data).map(|a| a.labels)
    }

    /// Get the requested number of clusters.
    fn n_clusters(&self) -> usize;
}

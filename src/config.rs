//! Method-independent clustering options.
//!
//! [`ClusterOptions`] is the union of every option the built-in methods
//! recognize. Hosts fill one in from a form or a saved project, and the
//! [`crate::registry::MethodRegistry`] hands it to whichever method was picked;
//! each method reads only the fields it understands.

use crate::cluster::{BakkerSchut, CenterMethod, Kmeans, DEFAULT_INIT_CLUSTERS};
use crate::transform::LogTransform;

/// Options shared by the registered clustering methods.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClusterOptions {
    /// Target number of clusters.
    pub n_clusters: usize,
    /// Random restarts for k-means.
    pub n_passes: usize,
    /// k-means center update rule.
    pub center: CenterMethod,
    /// Manually chosen k-means starting centers.
    pub initial_centers: Option<Vec<Vec<f64>>>,
    /// Scale k-means clusters on. `None` clusters the raw values.
    pub transform: Option<LogTransform>,
    /// Over-segmentation size for Bakker Schut.
    pub init_clusters: usize,
    /// Random seed.
    pub seed: Option<u64>,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            n_clusters: 1,
            n_passes: 1,
            center: CenterMethod::Mean,
            initial_centers: None,
            transform: Some(LogTransform::default()),
            init_clusters: DEFAULT_INIT_CLUSTERS,
            seed: None,
        }
    }
}

impl ClusterOptions {
    /// Options targeting `n_clusters`, everything else default.
    pub fn with_clusters(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            ..Self::default()
        }
    }

    /// Configure a [`Kmeans`] from these options.
    pub fn kmeans(&self) -> Kmeans {
        let mut k = Kmeans::new(self.n_clusters)
            .with_passes(self.n_passes)
            .with_center(self.center);
        if let Some(centers) = &self.initial_centers {
            k = k.with_initial_centers(centers.clone());
        }
        if let Some(transform) = self.transform {
            k = k.with_transform(transform);
        }
        if let Some(seed) = self.seed {
            k = k.with_seed(seed);
        }
        k
    }

    /// Configure a [`BakkerSchut`] from these options.
    pub fn bakker_schut(&self) -> BakkerSchut {
        let b = BakkerSchut::new(self.n_clusters).with_init_clusters(self.init_clusters);
        match self.seed {
            Some(seed) => b.with_seed(seed),
            None => b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Clustering;

    #[test]
    fn test_defaults() {
        let o = ClusterOptions::default();
        assert_eq!(o.n_clusters, 1);
        assert_eq!(o.n_passes, 1);
        assert_eq!(o.center, CenterMethod::Mean);
        assert_eq!(o.init_clusters, 200);
        assert!(o.initial_centers.is_none());
        assert_eq!(o.transform, Some(LogTransform::new()));
    }

    #[test]
    fn test_builds_configured_methods() {
        let o = ClusterOptions {
            n_clusters: 3,
            seed: Some(1),
            ..ClusterOptions::default()
        };
        assert_eq!(o.kmeans().n_clusters(), 3);
        assert_eq!(o.bakker_schut().n_clusters(), 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_fills_defaults() {
        let o: ClusterOptions =
            serde_json::from_str(r#"{"n_clusters": 4, "center": "median"}"#).unwrap();
        assert_eq!(o.n_clusters, 4);
        assert_eq!(o.center, CenterMethod::Median);
        assert_eq!(o.init_clusters, 200);
    }
}

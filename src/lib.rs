//! # flowclust
//!
//! Clustering for flow cytometry event data.
//!
//! The core is the Bakker Schut method: over-segment the log-scaled events
//! with k-means (seeded by k-means++), then merge the pieces agglomeratively
//! using a distance that accounts for each cluster's asymmetric spread.
//! Plain k-means and a single-cluster baseline sit alongside it, behind a
//! [`registry::MethodRegistry`] a host application can list and dispatch.
//!
//! ```rust
//! use flowclust::{ClusterOptions, MethodId, MethodRegistry};
//!
//! let data = vec![vec![2.0, 3.0], vec![2.5, 3.1], vec![900.0, 40.0], vec![950.0, 38.0]];
//! let registry = MethodRegistry::builtin();
//! let options = ClusterOptions { n_clusters: 2, seed: Some(9), ..ClusterOptions::default() };
//!
//! let out = registry.cluster(MethodId::BAKKER_SCHUT, &data, &options).unwrap();
//! assert_eq!(out.labels, vec![0, 0, 1, 1]);
//! ```

pub mod cluster;
pub mod config;
/// Error types used across `flowclust`.
pub mod error;
pub mod events;
pub mod registry;
pub mod transform;

pub use cluster::{
    reassign_cluster_ids, BakkerSchut, CenterMethod, Clustering, Kmeans, KmeansPlusPlus, Unicluster,
};
pub use config::ClusterOptions;
pub use error::{Error, Result};
pub use events::EventMatrix;
pub use registry::{MethodDescriptor, MethodId, MethodRegistry};
pub use transform::{LogBase, LogTransform};

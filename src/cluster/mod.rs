//! Clustering algorithms for flow cytometry events.
//!
//! Every method takes a table of events (one row per event, one column per
//! channel) and produces a hard assignment: one cluster id per event.
//!
//! ## Algorithms
//!
//! ### K-means
//!
//! Assign each event to the nearest center, move each center to the mean
//! (or median) of its events, repeat until nothing moves.
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! Seeds come from k-means++ with local trials ([`KmeansPlusPlus`]), or from
//! centers picked by the user. Several random passes can be run; the lowest
//! error wins.
//!
//! ### Bakker Schut
//!
//! K-means assumes roughly spherical clusters of similar size, which cell
//! populations rarely are. [`BakkerSchut`] over-segments the log-scaled data
//! into many small k-means clusters, then merges them bottom-up.
//!
//! The merge score is the spread distance ([`cluster_distance`]):
//!
//! ```text
//! d(A, B) = Σ_c |μA_c - μB_c| - (σA_c⁺ + σA_c⁻ + σB_c⁺ + σB_c⁻)
//! ```
//!
//! where σ⁺ and σ⁻ are the standard deviations of the values above and below
//! the mean. Broad clusters look closer than tight ones at the same center
//! separation, so skewed populations stay whole.
//!
//! ### Unicluster
//!
//! All events in cluster 0. Useful as a baseline.
//!
//! ## Usage
//!
//! ```rust
//! use flowclust::cluster::{BakkerSchut, Clustering, Kmeans};
//!
//! let data = vec![
//!     vec![1.0, 1.0],
//!     vec![1.2, 1.1],
//!     vec![500.0, 800.0],
//!     vec![520.0, 790.0],
//! ];
//!
//! let labels = Kmeans::new(2).with_seed(1).fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//!
//! let labels = BakkerSchut::new(2).with_seed(1).fit_predict(&data).unwrap();
//! assert_eq!(labels, vec![0, 0, 1, 1]);
//! ```

mod bakker_schut;
mod distance;
mod kmeans;
mod merge;
mod reassign;
mod seeding;
mod traits;
mod unicluster;

pub use bakker_schut::{BakkerSchut, DEFAULT_INIT_CLUSTERS, DEFAULT_MIN_CLIP};
pub use distance::{cluster_distance, SpreadStats};
pub use kmeans::{CenterMethod, Kmeans};
pub use merge::{DistanceMatrix, MergeOutcome, MergeStep, Merger};
pub use reassign::{reassign_cluster_ids, reassign_events, Reassignment};
pub use seeding::KmeansPlusPlus;
pub use traits::{Assignment, Clustering};
pub use unicluster::Unicluster;

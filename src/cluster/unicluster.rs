//! Trivial single-cluster method.

use super::traits::{Assignment, Clustering};
use crate::error::Result;
use crate::events::EventMatrix;

/// Puts every event in cluster 0.
///
/// Useful as a baseline, and as the starting labeling before a user splits a
/// population by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unicluster;

impl Clustering for Unicluster {
    fn fit(&self, data: &[Vec<f64>]) -> Result<Assignment> {
        let events = EventMatrix::from_rows(data)?;
        Ok(Assignment::new(vec![0; events.nrows()], "One cluster found"))
    }

    fn n_clusters(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everything_in_cluster_zero() {
        let out = Unicluster.fit(&[vec![1.0], vec![5.0], vec![9.0]]).unwrap();
        assert_eq!(out.labels, vec![0, 0, 0]);
        assert_eq!(out.message, "One cluster found");
    }

    #[test]
    fn test_empty_input() {
        assert!(Unicluster.fit(&[]).is_err());
    }
}

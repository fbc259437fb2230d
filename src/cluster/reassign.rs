//! Align the cluster ids of one clustering with another.
//!
//! Two runs over related datasets (or two runs over the same one) label the
//! same populations with arbitrary ids. To compare them side by side, each
//! destination cluster takes the id of the closest source cluster, scored
//! with the same spread-based distance the merger uses. Matching is greedy
//! and without replacement: destination clusters are visited in ascending id
//! order and each picks the best source cluster not yet taken.

use super::distance::SpreadStats;
use crate::error::{Error, Result};
use crate::events::EventMatrix;
use std::collections::BTreeMap;
use tracing::debug;

/// Result of aligning a destination clustering to a source clustering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassignment {
    /// Destination id to new (source) id.
    pub mapping: BTreeMap<usize, usize>,
    /// Destination labels rewritten through `mapping`.
    pub labels: Vec<usize>,
}

/// Relabel `dst_labels` so each destination cluster takes the id of its
/// nearest unused source cluster.
///
/// When the destination has more clusters than the source, the leftovers get
/// fresh ids above the largest source id, in ascending destination order.
pub fn reassign_cluster_ids(
    src_data: &[Vec<f64>],
    src_labels: &[usize],
    dst_data: &[Vec<f64>],
    dst_labels: &[usize],
) -> Result<Reassignment> {
    let src = EventMatrix::from_rows(src_data)?;
    let dst = EventMatrix::from_rows(dst_data)?;
    reassign_events(&src, src_labels, &dst, dst_labels)
}

/// [`reassign_cluster_ids`] over validated event matrices.
pub fn reassign_events(
    src: &EventMatrix,
    src_labels: &[usize],
    dst: &EventMatrix,
    dst_labels: &[usize],
) -> Result<Reassignment> {
    if src.ncols() != dst.ncols() {
        return Err(Error::DimensionMismatch {
            expected: src.ncols(),
            found: dst.ncols(),
        });
    }

    let src_stats = summarize(src, src_labels)?;
    let dst_stats = summarize(dst, dst_labels)?;

    let mut mapping = BTreeMap::new();
    let mut taken = vec![false; src_stats.len()];
    let mut next_fresh = src_stats.last().map_or(0, |(id, _)| id + 1);

    for (dst_id, ds) in &dst_stats {
        let best = src_stats
            .iter()
            .enumerate()
            .filter(|(slot, _)| !taken[*slot])
            .map(|(slot, (src_id, ss))| (slot, *src_id, ss.distance_to(ds)))
            .fold(None, |best: Option<(usize, usize, f64)>, cand| match best {
                Some((_, _, bd)) if bd <= cand.2 => best,
                _ => Some(cand),
            });

        let new_id = match best {
            Some((slot, src_id, _)) => {
                taken[slot] = true;
                src_id
            }
            None => {
                next_fresh += 1;
                next_fresh - 1
            }
        };
        mapping.insert(*dst_id, new_id);
    }

    debug!(
        src_clusters = src_stats.len(),
        dst_clusters = dst_stats.len(),
        "cluster ids reassigned"
    );

    let labels = dst_labels.iter().map(|l| mapping[l]).collect();
    Ok(Reassignment { mapping, labels })
}

fn summarize(events: &EventMatrix, labels: &[usize]) -> Result<Vec<(usize, SpreadStats)>> {
    events
        .group_indices(labels)?
        .into_iter()
        .map(|(id, rows)| {
            SpreadStats::from_indices(events.view(), &rows)
                .map(|s| (id, s))
                .ok_or(Error::EmptyCluster { id })
        })
        .collect()
}

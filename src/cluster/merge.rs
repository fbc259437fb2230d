//! Agglomerative merging of an over-segmented partition.
//!
//! Starting from many small clusters, repeatedly merge the pair with the
//! lowest [`SpreadStats::distance_to`] score until the target count is reached.
//!
//! # Bookkeeping
//!
//! Clusters live in an arena of slots. A slot id is only an arena index; merged
//! clusters get a fresh id one past the largest ever issued, and the two
//! consumed slots are emptied. Each event's membership is a slot id, and only
//! the members of the merged pair are relabeled on each step.
//!
//! # Incremental Distance Matrix
//!
//! The upper-triangular matrix holds one score per unordered pair of live
//! clusters, keyed `(i, j)` with `i < j` and scored as `dist(i, j)`. After a
//! merge of `a` and `b` into `m`:
//!
//! - rows `a` and `b` are dropped
//! - columns `a` and `b` are dropped from every other row
//! - column `m` is added to every other row (`m` is the largest id, so it is
//!   always a column, never a row with entries)
//!
//! That is O(k) new scores per step instead of O(k²). Each row also caches its
//! own minimum entry. Only rows whose cached minimum was `a` or `b` are
//! rescanned; every other row just compares its minimum with the new column.
//! The global minimum is then the minimum over row minima, which is always
//! identical to a full rescan.

use super::distance::SpreadStats;
use crate::error::{Error, Result};
use crate::events::renumber_by_first_appearance;
use ndarray::ArrayView2;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One merge in the agglomeration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeStep {
    /// Smaller slot id of the merged pair.
    pub left: usize,
    /// Larger slot id of the merged pair.
    pub right: usize,
    /// Slot id of the resulting cluster.
    pub merged: usize,
    /// Score at which the pair merged.
    pub distance: f64,
    /// Events in the resulting cluster.
    pub size: usize,
    /// Live clusters after this merge.
    pub live_after: usize,
}

/// Result of a merge run.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Final labels, contiguous from 0 in order of first appearance.
    pub labels: Vec<usize>,
    /// Live clusters before the first merge.
    pub initial_clusters: usize,
    /// Merge history, in order.
    pub steps: Vec<MergeStep>,
}

impl MergeOutcome {
    /// Number of clusters in the final labeling.
    pub fn n_clusters(&self) -> usize {
        self.initial_clusters - self.steps.len()
    }
}

#[derive(Debug)]
struct Slot {
    members: Vec<usize>,
    stats: SpreadStats,
}

/// Clusters keyed by slot id.
#[derive(Debug)]
struct Arena {
    slots: Vec<Option<Slot>>,
    live: BTreeSet<usize>,
}

impl Arena {
    fn from_labels(data: ArrayView2<'_, f64>, labels: &[usize]) -> Result<(Self, Vec<usize>)> {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &l) in labels.iter().enumerate() {
            groups.entry(l).or_default().push(i);
        }

        let mut membership = vec![0usize; labels.len()];
        let mut slots = Vec::with_capacity(2 * groups.len());
        let mut live = BTreeSet::new();
        for (id, (label, members)) in groups.into_iter().enumerate() {
            let stats = SpreadStats::from_indices(data, &members).ok_or(Error::EmptyCluster { id: label })?;
            for &i in &members {
                membership[i] = id;
            }
            slots.push(Some(Slot { members, stats }));
            live.insert(id);
        }
        Ok((Self { slots, live }, membership))
    }

    fn stats(&self, id: usize) -> Option<&SpreadStats> {
        self.slots.get(id)?.as_ref().map(|s| &s.stats)
    }

    /// Merge two live slots into a fresh one and return its id.
    fn merge(&mut self, data: ArrayView2<'_, f64>, a: usize, b: usize) -> Result<usize> {
        let sa = self.slots.get_mut(a).and_then(Option::take).ok_or(Error::EmptyCluster { id: a })?;
        let sb = self.slots.get_mut(b).and_then(Option::take).ok_or(Error::EmptyCluster { id: b })?;
        self.live.remove(&a);
        self.live.remove(&b);

        let mut members = sa.members;
        members.extend(sb.members);
        members.sort_unstable();
        let id = self.slots.len();
        let stats = SpreadStats::from_indices(data, &members).ok_or(Error::EmptyCluster { id })?;

        self.slots.push(Some(Slot { members, stats }));
        self.live.insert(id);
        Ok(id)
    }

    fn members(&self, id: usize) -> &[usize] {
        self.slots
            .get(id)
            .and_then(Option::as_ref)
            .map(|s| s.members.as_slice())
            .unwrap_or(&[])
    }
}

/// Upper-triangular pairwise scores over live clusters, with per-row minima.
#[derive(Debug, Clone, Default)]
pub struct DistanceMatrix {
    rows: BTreeMap<usize, BTreeMap<usize, f64>>,
    row_min: BTreeMap<usize, (usize, f64)>,
}

impl DistanceMatrix {
    /// Score every pair of the given clusters, in ascending id order.
    pub fn build(clusters: &[(usize, &SpreadStats)]) -> Self {
        let mut sorted: Vec<(usize, &SpreadStats)> = clusters.to_vec();
        sorted.sort_by_key(|(id, _)| *id);

        let row = |a: usize| -> (usize, BTreeMap<usize, f64>) {
            let (ia, sa) = sorted[a];
            let entries = sorted[a + 1..]
                .iter()
                .map(|(ib, sb)| (*ib, sa.distance_to(sb)))
                .collect();
            (ia, entries)
        };

        #[cfg(feature = "parallel")]
        let rows: Vec<(usize, BTreeMap<usize, f64>)> = (0..sorted.len()).into_par_iter().map(row).collect();

        #[cfg(not(feature = "parallel"))]
        let rows: Vec<(usize, BTreeMap<usize, f64>)> = (0..sorted.len()).map(row).collect();

        let mut matrix = Self::default();
        for (id, entries) in rows {
            if !entries.is_empty() {
                matrix.rows.insert(id, entries);
                matrix.rescan_row(id);
            }
        }
        matrix
    }

    fn rescan_row(&mut self, id: usize) {
        let min = self.rows.get(&id).and_then(|row| {
            row.iter().fold(None, |best: Option<(usize, f64)>, (&j, &d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((j, d)),
            })
        });
        match min {
            Some(m) => {
                self.row_min.insert(id, m);
            }
            None => {
                self.row_min.remove(&id);
            }
        }
    }

    /// Score for the pair `(i, j)`, in either order.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        self.rows.get(&lo)?.get(&hi).copied()
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Whether no pairs are stored.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Lowest-scoring pair `(i, j, score)` with `i < j`. Ties go to the smallest `(i, j)`.
    pub fn min_pair(&self) -> Option<(usize, usize, f64)> {
        self.row_min
            .iter()
            .fold(None, |best: Option<(usize, usize, f64)>, (&i, &(j, d))| match best {
                Some((_, _, bd)) if bd <= d => best,
                _ => Some((i, j, d)),
            })
    }

    /// Drop two clusters and add the scores from every survivor to `merged`.
    ///
    /// `merged` must be larger than every surviving id, and `scores` must hold
    /// one `(survivor, dist(survivor, merged))` entry per survivor.
    pub fn replace(&mut self, removed: [usize; 2], merged: usize, scores: &[(usize, f64)]) {
        for id in removed {
            self.rows.remove(&id);
            self.row_min.remove(&id);
        }

        for &(i, d) in scores {
            debug_assert!(i < merged);
            let row = self.rows.entry(i).or_default();
            for id in removed {
                row.remove(&id);
            }
            row.insert(merged, d);

            match self.row_min.get(&i) {
                Some(&(j, _)) if removed.contains(&j) => self.rescan_row(i),
                Some(&(_, best)) if best <= d => {}
                _ => {
                    self.row_min.insert(i, (merged, d));
                }
            }
        }
    }
}

/// Merges clusters of an existing partition down to a target count.
#[derive(Debug, Clone)]
pub struct Merger {
    target: usize,
}

impl Merger {
    /// Merge down to at most `target` clusters.
    pub fn new(target: usize) -> Self {
        Self { target }
    }

    /// Agglomerate `labels` (one per row of `data`) until at most `target`
    /// clusters remain. Labels need not be contiguous.
    pub fn merge(&self, data: ArrayView2<'_, f64>, labels: &[usize]) -> Result<MergeOutcome> {
        if self.target == 0 {
            return Err(Error::InvalidClusterCount {
                requested: 0,
                n_items: labels.len(),
            });
        }
        if labels.is_empty() {
            return Err(Error::EmptyInput);
        }
        if labels.len() != data.nrows() {
            return Err(Error::DimensionMismatch {
                expected: data.nrows(),
                found: labels.len(),
            });
        }

        let (mut arena, mut membership) = Arena::from_labels(data, labels)?;
        let initial_clusters = arena.live.len();
        let mut steps = Vec::with_capacity(initial_clusters.saturating_sub(self.target));

        if initial_clusters <= self.target {
            if initial_clusters < self.target {
                warn!(
                    target = self.target,
                    available = initial_clusters,
                    "fewer clusters than requested; nothing to merge"
                );
            }
            return Ok(MergeOutcome {
                labels: renumber_by_first_appearance(&membership),
                initial_clusters,
                steps,
            });
        }

        let mut matrix = {
            let live: Vec<(usize, &SpreadStats)> = arena
                .live
                .iter()
                .filter_map(|&id| arena.stats(id).map(|s| (id, s)))
                .collect();
            DistanceMatrix::build(&live)
        };
        debug!(clusters = initial_clusters, pairs = matrix.len(), "distance matrix built");

        while arena.live.len() > self.target {
            let Some((a, b, distance)) = matrix.min_pair() else {
                break;
            };

            let merged = arena.merge(data, a, b)?;
            for &i in arena.members(merged) {
                membership[i] = merged;
            }

            let merged_stats = arena.stats(merged).ok_or(Error::EmptyCluster { id: merged })?;
            let scores: Vec<(usize, f64)> = arena
                .live
                .iter()
                .filter(|&&id| id != merged)
                .filter_map(|&id| arena.stats(id).map(|s| (id, s.distance_to(merged_stats))))
                .collect();
            matrix.replace([a, b], merged, &scores);

            let step = MergeStep {
                left: a,
                right: b,
                merged,
                distance,
                size: arena.members(merged).len(),
                live_after: arena.live.len(),
            };
            debug!(
                left = a,
                right = b,
                merged,
                distance,
                size = step.size,
                live = step.live_after,
                "merged clusters"
            );
            steps.push(step);
        }

        Ok(MergeOutcome {
            labels: renumber_by_first_appearance(&membership),
            initial_clusters,
            steps,
        })
    }
}

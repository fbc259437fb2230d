//! Event matrices: validated N x D flow-cytometry measurements.
//!
//! Every clustering entry point accepts `&[Vec<f64>]`, one `Vec` per captured
//! event, and converts it once into an [`EventMatrix`] backed by
//! `ndarray::Array2<f64>`. Conversion is where malformed input is rejected, so
//! the algorithms themselves can index rows without re-checking shapes.

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use std::collections::BTreeMap;

/// Dense, row-major matrix of events (rows) by channels (columns).
#[derive(Debug, Clone, PartialEq)]
pub struct EventMatrix {
    data: Array2<f64>,
}

impl EventMatrix {
    /// Validate and copy a slice of rows.
    ///
    /// Fails on zero rows, zero columns, ragged rows or non-finite values.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::EmptyInput);
        }

        let n = rows.len();
        let d = rows[0].len();
        if d == 0 {
            return Err(Error::InvalidParameter {
                name: "data",
                message: "events must have at least one channel",
            });
        }

        let mut flat: Vec<f64> = Vec::with_capacity(n * d);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != d {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    found: row.len(),
                });
            }
            if let Some(j) = row.iter().position(|x| !x.is_finite()) {
                return Err(Error::NonFiniteValue { row: i, col: j });
            }
            flat.extend_from_slice(row);
        }

        let data = Array2::from_shape_vec((n, d), flat).map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self { data })
    }

    /// Wrap an existing array, applying the same validation as [`Self::from_rows`].
    pub fn from_array(data: Array2<f64>) -> Result<Self> {
        if data.nrows() == 0 {
            return Err(Error::EmptyInput);
        }
        if data.ncols() == 0 {
            return Err(Error::InvalidParameter {
                name: "data",
                message: "events must have at least one channel",
            });
        }
        for ((row, col), x) in data.indexed_iter() {
            if !x.is_finite() {
                return Err(Error::NonFiniteValue { row, col });
            }
        }
        Ok(Self { data })
    }

    /// Number of events.
    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of channels.
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// One event.
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    /// Borrow the underlying array.
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Consume into the underlying array.
    pub fn into_inner(self) -> Array2<f64> {
        self.data
    }

    /// Copy the rows at `indices` into a new array, in the given order.
    pub fn select(&self, indices: &[usize]) -> Array2<f64> {
        self.data.select(Axis(0), indices)
    }

    /// Check that a membership vector has one label per event.
    pub fn check_labels(&self, labels: &[usize]) -> Result<()> {
        if labels.len() != self.nrows() {
            return Err(Error::DimensionMismatch {
                expected: self.nrows(),
                found: labels.len(),
            });
        }
        Ok(())
    }

    /// Row indices per label, in ascending label order.
    pub fn group_indices(&self, labels: &[usize]) -> Result<BTreeMap<usize, Vec<usize>>> {
        self.check_labels(labels)?;
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &label) in labels.iter().enumerate() {
            groups.entry(label).or_default().push(i);
        }
        Ok(groups)
    }

    /// Split the events into one owned sub-matrix per label, in ascending label order.
    pub fn separate(&self, labels: &[usize]) -> Result<Vec<(usize, Array2<f64>)>> {
        Ok(self
            .group_indices(labels)?
            .into_iter()
            .map(|(label, rows)| (label, self.select(&rows)))
            .collect())
    }

    /// Build a new event matrix from the events whose label is in `selection`.
    ///
    /// Event order is preserved.
    pub fn isolate(&self, labels: &[usize], selection: &[usize]) -> Result<EventMatrix> {
        self.check_labels(labels)?;
        let rows: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| selection.contains(l))
            .map(|(i, _)| i)
            .collect();
        if rows.is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(Self {
            data: self.select(&rows),
        })
    }
}

impl TryFrom<&[Vec<f64>]> for EventMatrix {
    type Error = Error;

    fn try_from(rows: &[Vec<f64>]) -> Result<Self> {
        Self::from_rows(rows)
    }
}

/// Renumber labels to `0..m` in order of first appearance.
pub fn renumber_by_first_appearance(labels: &[usize]) -> Vec<usize> {
    let mut seen: BTreeMap<usize, usize> = BTreeMap::new();
    labels
        .iter()
        .map(|&l| {
            let next = seen.len();
            *seen.entry(l).or_insert(next)
        })
        .collect()
}

/// Number of distinct labels.
pub fn count_distinct(labels: &[usize]) -> usize {
    let mut unique: Vec<usize> = labels.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_shape() {
        let m = EventMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 2);
        assert_eq!(m.row(1)[0], 3.0);
    }

    #[test]
    fn test_from_rows_rejects_bad_input() {
        assert_eq!(EventMatrix::from_rows(&[]), Err(Error::EmptyInput));
        assert_eq!(
            EventMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            EventMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, f64::NAN]]),
            Err(Error::NonFiniteValue { row: 1, col: 1 })
        );
        assert!(EventMatrix::from_rows(&[vec![], vec![]]).is_err());
    }

    #[test]
    fn test_separate_groups_by_label() {
        let m = EventMatrix::from_rows(&[vec![0.0], vec![10.0], vec![1.0], vec![11.0]]).unwrap();
        let parts = m.separate(&[5, 2, 5, 2]).unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, 2);
        assert_eq!(parts[0].1.column(0).to_vec(), vec![10.0, 11.0]);
        assert_eq!(parts[1].0, 5);
        assert_eq!(parts[1].1.column(0).to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_separate_label_length_mismatch() {
        let m = EventMatrix::from_rows(&[vec![0.0], vec![1.0]]).unwrap();
        assert!(m.separate(&[0]).is_err());
    }

    #[test]
    fn test_isolate_keeps_selected_clusters() {
        let m = EventMatrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let sub = m.isolate(&[0, 1, 2, 1], &[1, 2]).unwrap();
        assert_eq!(sub.view().column(0).to_vec(), vec![1.0, 2.0, 3.0]);

        assert_eq!(m.isolate(&[0, 1, 2, 1], &[7]), Err(Error::EmptyInput));
    }

    #[test]
    fn test_renumber_first_appearance() {
        assert_eq!(renumber_by_first_appearance(&[7, 7, 3, 9, 3]), vec![0, 0, 1, 2, 1]);
        assert_eq!(count_distinct(&[7, 7, 3, 9, 3]), 3);
    }
}

use thiserror::Error;

/// Result alias for `flowclust`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the clustering primitives.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Row or center dimensionality does not match the data.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Invalid number of clusters requested.
    #[error("cannot create {requested} clusters from {n_items} items")]
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of items (rows or centers) available.
        n_items: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// A NaN or infinite measurement was found in the event data.
    #[error("non-finite value at row {row}, column {col}")]
    NonFiniteValue {
        /// Row index of the offending event.
        row: usize,
        /// Channel index.
        col: usize,
    },

    /// A cluster with no rows reached a routine that needs at least one.
    ///
    /// This signals broken partition bookkeeping, not bad user input.
    #[error("cluster {id} is empty")]
    EmptyCluster {
        /// Label of the empty cluster.
        id: usize,
    },

    /// No clustering method is registered under the requested key.
    #[error("unknown clustering method '{0}'")]
    UnknownMethod(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

//! Catalog of available clustering methods.
//!
//! A [`MethodRegistry`] is an ordinary value owned by the host application.
//! Build it once at startup (usually with [`MethodRegistry::builtin`]), add
//! any extra methods with [`MethodRegistry::register`], and pass it by
//! reference to whatever needs to list or run methods.
//!
//! Methods are keyed by [`MethodId`], a stable string key. The descriptors
//! carry enough about each method's options for a UI to render a form.

use crate::cluster::{Assignment, Clustering, Unicluster};
use crate::config::ClusterOptions;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a clustering method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodId(&'static str);

impl MethodId {
    /// Standard k-means.
    pub const KMEANS: MethodId = MethodId("kmeans");
    /// Bakker Schut over-segment-and-merge.
    pub const BAKKER_SCHUT: MethodId = MethodId("bakker-schut");
    /// Everything in one cluster.
    pub const UNICLUSTER: MethodId = MethodId("unicluster");

    /// Define a new key, for methods registered by the host.
    pub const fn new(key: &'static str) -> Self {
        MethodId(key)
    }

    /// The key.
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl FromStr for MethodId {
    type Err = Error;

    /// Parse a built-in key. Use [`MethodRegistry::lookup`] for host-registered ones.
    fn from_str(s: &str) -> Result<Self> {
        [MethodId::KMEANS, MethodId::BAKKER_SCHUT, MethodId::UNICLUSTER]
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownMethod(s.to_string()))
    }
}

/// Kind of value an option takes, for rendering option forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Positive integer.
    Count {
        /// Smallest accepted value.
        min: usize,
        /// Pre-filled value.
        default: usize,
    },
    /// One of a fixed set of keys.
    Choice {
        /// Accepted keys.
        choices: &'static [&'static str],
        /// Pre-selected key.
        default: &'static str,
    },
    /// A list of points picked by the user.
    Points,
}

/// One option a method reads from [`ClusterOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    /// Field name in [`ClusterOptions`].
    pub key: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Value kind.
    pub kind: OptionKind,
}

/// Display metadata for a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Key.
    pub id: MethodId,
    /// Short display name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Options the method reads.
    pub options: &'static [OptionSpec],
}

/// Entry point of a registered method.
pub type RunFn = fn(&[Vec<f64>], &ClusterOptions) -> Result<Assignment>;

const KMEANS_OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        key: "n_clusters",
        label: "Number of clusters",
        kind: OptionKind::Count { min: 1, default: 1 },
    },
    OptionSpec {
        key: "center",
        label: "Center calculation",
        kind: OptionKind::Choice {
            choices: &["mean", "median"],
            default: "mean",
        },
    },
    OptionSpec {
        key: "n_passes",
        label: "Number of passes",
        kind: OptionKind::Count { min: 1, default: 1 },
    },
    OptionSpec {
        key: "initial_centers",
        label: "Manually chosen centers",
        kind: OptionKind::Points,
    },
    OptionSpec {
        key: "transform",
        label: "Data scale",
        kind: OptionKind::Choice {
            choices: &["log", "linear"],
            default: "log",
        },
    },
];

const BAKKER_SCHUT_OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        key: "n_clusters",
        label: "Number of final clusters",
        kind: OptionKind::Count { min: 1, default: 1 },
    },
    OptionSpec {
        key: "init_clusters",
        label: "Number of starting clusters",
        kind: OptionKind::Count {
            min: 10,
            default: crate::cluster::DEFAULT_INIT_CLUSTERS,
        },
    },
];

fn run_kmeans(data: &[Vec<f64>], options: &ClusterOptions) -> Result<Assignment> {
    options.kmeans().fit(data)
}

fn run_bakker_schut(data: &[Vec<f64>], options: &ClusterOptions) -> Result<Assignment> {
    options.bakker_schut().fit(data)
}

fn run_unicluster(data: &[Vec<f64>], _options: &ClusterOptions) -> Result<Assignment> {
    Unicluster.fit(data)
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    descriptor: MethodDescriptor,
    run: RunFn,
}

/// Clustering methods available to a host application.
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    entries: BTreeMap<MethodId, Entry>,
}

impl MethodRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding k-means, Bakker Schut and unicluster.
    pub fn builtin() -> Self {
        let mut r = Self::new();
        r.register(
            MethodDescriptor {
                id: MethodId::KMEANS,
                name: "k-means",
                description: "Cluster the data using the k-means algorithm",
                options: KMEANS_OPTIONS,
            },
            run_kmeans,
        );
        r.register(
            MethodDescriptor {
                id: MethodId::BAKKER_SCHUT,
                name: "Bakker Schut k-means",
                description: "Over-segment with k-means, then merge clusters with a spread-based score",
                options: BAKKER_SCHUT_OPTIONS,
            },
            run_bakker_schut,
        );
        r.register(
            MethodDescriptor {
                id: MethodId::UNICLUSTER,
                name: "Unicluster",
                description: "Place all events in a single cluster",
                options: &[],
            },
            run_unicluster,
        );
        r
    }

    /// Add a method, returning the descriptor it replaced, if any.
    pub fn register(&mut self, descriptor: MethodDescriptor, run: RunFn) -> Option<MethodDescriptor> {
        self.entries
            .insert(descriptor.id, Entry { descriptor, run })
            .map(|e| e.descriptor)
    }

    /// Descriptor for `id`.
    pub fn get(&self, id: MethodId) -> Option<&MethodDescriptor> {
        self.entries.get(&id).map(|e| &e.descriptor)
    }

    /// Find a registered id by its key.
    pub fn lookup(&self, key: &str) -> Result<MethodId> {
        self.entries
            .keys()
            .find(|id| id.as_str() == key)
            .copied()
            .ok_or_else(|| Error::UnknownMethod(key.to_string()))
    }

    /// All descriptors, ordered by key.
    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.entries.values().map(|e| &e.descriptor)
    }

    /// Run method `id` on `data`.
    pub fn cluster(&self, id: MethodId, data: &[Vec<f64>], options: &ClusterOptions) -> Result<Assignment> {
        let entry = self
            .entries
            .get(&id)
            .ok_or_else(|| Error::UnknownMethod(id.to_string()))?;
        (entry.run)(data, options)
    }
}

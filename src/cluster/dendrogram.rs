//! Dendrogram produced by agglomerative clustering.
//!
//! Cluster ids follow the SciPy/kodama convention: leaves are `0..n`, and
//! merge `i` creates cluster `n + i`.

use crate::error::{Error, Result};

/// A dendrogram representing hierarchical cluster merges.
#[derive(Debug, Clone)]
pub struct Dendrogram {
    merges: Vec<Merge>,
    n_items: usize,
}

/// A single merge operation in the dendrogram.
#[derive(Debug, Clone, Copy)]
pub struct Merge {
    /// First cluster being merged.
    pub cluster_a: usize,
    /// Second cluster being merged.
    pub cluster_b: usize,
    /// Linkage distance at which the merge occurred.
    pub distance: f64,
    /// Size of the resulting cluster.
    pub size: usize,
}

impl Dendrogram {
    /// Create an empty dendrogram over n items.
    pub fn new(n_items: usize) -> Self {
        Self {
            merges: Vec::with_capacity(n_items.saturating_sub(1)),
            n_items,
        }
    }

    /// Record a merge operation.
    pub fn add_merge(&mut self, cluster_a: usize, cluster_b: usize, distance: f64, size: usize) {
        self.merges.push(Merge {
            cluster_a,
            cluster_b,
            distance,
            size,
        });
    }

    /// Flat assignment with exactly `k` clusters.
    ///
    /// Applies the first `n - k` merges. Labels are numbered by first
    /// appearance in item order, so item 0 is always in cluster 0.
    pub fn cut_to_k(&self, k: usize) -> Result<Vec<usize>> {
        if k == 0 || k > self.n_items {
            return Err(Error::InvalidClusterCount {
                requested: k,
                n_items: self.n_items,
            });
        }
        let n_merges = self.n_items - k;
        if n_merges > self.merges.len() {
            return Err(Error::InvalidClusterCount {
                requested: k,
                n_items: self.n_items,
            });
        }

        // Union-find over leaves + merge nodes.
        let total = self.n_items + n_merges;
        let mut parent: Vec<usize> = (0..total).collect();
        for (i, merge) in self.merges.iter().take(n_merges).enumerate() {
            let node = self.n_items + i;
            parent[merge.cluster_a] = node;
            parent[merge.cluster_b] = node;
        }

        let root = |mut x: usize| {
            while parent[x] != x {
                x = parent[x];
            }
            x
        };

        let mut relabel: Vec<Option<usize>> = vec![None; total];
        let mut next = 0;
        let labels = (0..self.n_items)
            .map(|item| {
                let r = root(item);
                *relabel[r].get_or_insert_with(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();
        Ok(labels)
    }

    /// Number of original items.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of merges recorded.
    pub fn n_merges(&self) -> usize {
        self.merges.len()
    }

    /// Iterate over merges.
    pub fn merges(&self) -> impl Iterator<Item = &Merge> {
        self.merges.iter()
    }
}

//! Clustering traits.

use ndarray::Array2;

use crate::error::Result;

/// Trait for partitioning algorithms that assign every row to a cluster.
///
/// Density-based algorithms that can leave points unassigned (DBSCAN)
/// expose their own noise-aware entry point instead.
pub trait Clustering {
    /// Fit the model to the rows of `data` and return one cluster index per row.
    fn fit_predict(&self, data: &Array2<f64>) -> Result<Vec<usize>>;

    /// Target number of clusters, or `None` when the count is emergent.
    fn n_clusters(&self) -> Option<usize>;
}

//! DBSCAN: Density-Based Spatial Clustering of Applications with Noise.
//!
//! # The Algorithm (Ester et al., 1996)
//!
//! DBSCAN groups points by neighborhood density. Unlike k-means, it:
//!
//! - Discovers clusters of arbitrary shape
//! - Determines the number of clusters itself
//! - Identifies noise points (outliers)
//!
//! ## Core Concepts
//!
//! - **Epsilon (ε)**: Maximum distance between two points to be neighbors.
//! - **MinPts**: Minimum neighborhood size (the point itself included) for
//!   a point to be "core".
//! - **Border point**: Within ε of a core point but not core itself.
//! - **Noise point**: Neither core nor border.
//!
//! ## Complexity
//!
//! O(n²) distance evaluations with the naive region query used here, which
//! is fine for food tables of a few thousand rows.
//!
//! ## References
//!
//! Ester et al. (1996). "A Density-Based Algorithm for Discovering Clusters
//! in Large Spatial Databases with Noise." KDD-96.

use ndarray::Array2;
use tracing::debug;

use super::kmeans::squared_distance;
use crate::error::{Error, Result};

/// DBSCAN clustering algorithm.
///
/// Does not implement [`Clustering`](super::Clustering): its labels are
/// `Option<usize>` with `None` marking noise.
#[derive(Debug, Clone)]
pub struct Dbscan {
    /// Epsilon: maximum distance for neighborhood.
    epsilon: f64,
    /// Minimum points for core point classification.
    min_pts: usize,
}

impl Dbscan {
    /// Create a new DBSCAN clusterer.
    ///
    /// # Arguments
    ///
    /// * `epsilon` - Maximum distance between two points to be neighbors.
    /// * `min_pts` - Minimum number of points to form a dense region.
    pub fn new(epsilon: f64, min_pts: usize) -> Self {
        Self { epsilon, min_pts }
    }

    /// Set epsilon (neighborhood radius).
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set minimum points for core classification.
    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.min_pts = min_pts;
        self
    }

    /// All points within epsilon of `point_idx`, itself included.
    fn region_query(&self, data: &Array2<f64>, point_idx: usize) -> Vec<usize> {
        let eps_sq = self.epsilon * self.epsilon;
        let point = data.row(point_idx);
        data.outer_iter()
            .enumerate()
            .filter(|(_, other)| squared_distance(&point, other) <= eps_sq)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Fit and return labels, `None` for noise.
    ///
    /// Cluster ids are numbered in discovery order starting at 0.
    pub fn fit_predict(&self, data: &Array2<f64>) -> Result<Vec<Option<usize>>> {
        let n = data.nrows();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if self.epsilon.is_nan() || self.epsilon <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must be positive",
            });
        }
        if self.min_pts == 0 {
            return Err(Error::InvalidParameter {
                name: "min_pts",
                message: "must be at least 1",
            });
        }

        let mut labels: Vec<Option<usize>> = vec![None; n];
        let mut visited = vec![false; n];
        let mut cluster_id = 0;

        for point_idx in 0..n {
            if visited[point_idx] {
                continue;
            }
            visited[point_idx] = true;

            let neighbors = self.region_query(data, point_idx);
            if neighbors.len() < self.min_pts {
                // Noise for now; may become a border point of a later cluster.
                continue;
            }

            labels[point_idx] = Some(cluster_id);
            let mut queue = neighbors;
            while let Some(idx) = queue.pop() {
                if labels[idx].is_none() {
                    labels[idx] = Some(cluster_id);
                }
                if visited[idx] {
                    continue;
                }
                visited[idx] = true;

                let expansion = self.region_query(data, idx);
                if expansion.len() < self.min_pts {
                    continue;
                }
                for nn in expansion {
                    // Border points claimed as noise earlier join this cluster.
                    if labels[nn].is_none() {
                        labels[nn] = Some(cluster_id);
                    }
                    if !visited[nn] {
                        queue.push(nn);
                    }
                }
            }
            cluster_id += 1;
        }

        let noise = labels.iter().filter(|l| l.is_none()).count();
        debug!(clusters = cluster_id, noise, "dbscan finished");
        Ok(labels)
    }
}

impl Default for Dbscan {
    fn default() -> Self {
        Self::new(0.5, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_dbscan_two_clusters() {
        let data = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [0.1, 0.1],
            [0.05, 0.05],
            [5.0, 5.0],
            [5.1, 5.0],
            [5.0, 5.1],
            [5.1, 5.1],
            [5.05, 5.05],
        ];

        let labels = Dbscan::new(0.3, 3).fit_predict(&data).unwrap();

        assert!(labels[..5].iter().all(|&l| l == Some(0)));
        assert!(labels[5..].iter().all(|&l| l == Some(1)));
    }

    #[test]
    fn test_dbscan_with_noise() {
        let data = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [0.1, 0.1],
            [100.0, 100.0],
            [5.0, 5.0],
            [5.1, 5.0],
            [5.0, 5.1],
            [5.1, 5.1],
        ];

        let labels = Dbscan::new(0.3, 3).fit_predict(&data).unwrap();

        assert!(labels[4].is_none());
        for (i, label) in labels.iter().enumerate() {
            if i != 4 {
                assert!(label.is_some());
            }
        }
    }

    #[test]
    fn test_dbscan_all_noise() {
        let data = array![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]];
        let labels = Dbscan::new(0.5, 3).fit_predict(&data).unwrap();
        assert!(labels.iter().all(Option::is_none));
    }

    #[test]
    fn test_border_point_visited_before_core() {
        // Point 0 is a border point (only one neighbor besides itself) and is
        // visited first; it must still join the cluster of the core at 1.
        let data = array![[0.0, 0.0], [1.0, 0.0], [1.5, 0.0], [1.5, 0.5], [1.5, -0.5]];

        let labels = Dbscan::new(1.0, 4).fit_predict(&data).unwrap();

        assert_eq!(labels, vec![Some(0); 5]);
    }

    #[test]
    fn test_border_point_reached_through_expansion() {
        // x=0 is checked first and is not core. It is only reachable from the
        // core at x=1, which is found while expanding from x=2.
        let data = array![[0.0], [2.0], [1.0], [3.0]];

        let labels = Dbscan::new(1.0, 3).fit_predict(&data).unwrap();

        assert_eq!(labels, vec![Some(0); 4]);
    }

    #[test]
    fn test_epsilon_is_inclusive() {
        let data = array![[0.0, 0.0], [1.0, 0.0]];
        let labels = Dbscan::new(1.0, 2).fit_predict(&data).unwrap();
        assert_eq!(labels, vec![Some(0), Some(0)]);
    }

    #[test]
    fn test_dbscan_chain() {
        let data =
            Array2::from_shape_fn((10, 2), |(i, j)| if j == 0 { i as f64 * 0.3 } else { 0.0 });
        let labels = Dbscan::new(0.5, 2).fit_predict(&data).unwrap();
        assert!(labels.iter().all(|&l| l == Some(0)));
    }

    #[test]
    fn test_dbscan_invalid_params() {
        let data = array![[0.0, 0.0]];
        assert!(Dbscan::new(0.0, 3).fit_predict(&data).is_err());
        assert!(Dbscan::new(-1.0, 3).fit_predict(&data).is_err());
        assert!(Dbscan::new(0.5, 0).fit_predict(&data).is_err());
        assert!(matches!(
            Dbscan::new(0.5, 3).fit_predict(&Array2::zeros((0, 2))),
            Err(Error::EmptyInput)
        ));
    }
}

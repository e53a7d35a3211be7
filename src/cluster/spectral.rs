//! Spectral clustering via graph Laplacian eigenvectors.
//!
//! Spectral clustering works by:
//! 1. Build a k-nearest-neighbor connectivity graph from points
//! 2. Compute the normalized Laplacian
//! 3. Find the k smallest eigenvectors
//! 4. Discretize the embedding into hard labels
//!
//! # Trade-offs
//!
//! | Aspect | Spectral | K-means |
//! |--------|----------|---------|
//! | Shape | Any | Convex |
//! | Complexity | O(n³) eigendecomp | O(nkd × iter) |
//! | Memory | O(n²) affinity | O(nd) |
//! | Scalability | < 10k points | Millions |
//!
//! # Algorithm
//!
//! ```text
//! 1. C[i, j] = 1 if j is among the n_neighbors nearest points of i (i itself included)
//! 2. A = (C + Cᵀ) / 2
//! 3. L_sym = I - D^{-1/2} A D^{-1/2}   (self loops ignored in D)
//! 4. U = k smallest eigenvectors of L_sym, each divided by sqrt(degree)
//! 5. Flip each eigenvector so its largest-magnitude entry is positive
//! 6. Discretize U (Yu & Shi): alternate between the best one-hot
//!    labeling for a rotation and the best rotation (via SVD) for a labeling
//! ```
//!
//! Discretization only draws randomness for the first row of the initial
//! rotation, so a fixed seed gives a fixed labeling.
//!
//! # References
//!
//! - Ng, Jordan, Weiss (2001). "On Spectral Clustering"
//! - Yu & Shi (2003). "Multiclass Spectral Clustering"
//! - von Luxburg (2007). "A Tutorial on Spectral Clustering"

use faer::{Mat, Side};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use tracing::debug;

use super::kmeans::squared_distance;
use super::traits::Clustering;
use crate::error::{Error, Result};

const MAX_SVD_RESTARTS: usize = 30;
const MAX_DISCRETIZE_ITER: usize = 20;

/// Spectral clustering configuration and runner.
#[derive(Debug, Clone)]
pub struct SpectralClustering {
    /// Number of clusters
    k: usize,
    /// Number of neighbors for the kNN affinity
    n_neighbors: usize,
    /// Seed for the initial discretization rotation
    seed: u64,
}

impl SpectralClustering {
    /// Create new spectral clustering with k clusters.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            n_neighbors: 10,
            seed: 0,
        }
    }

    /// Set number of neighbors for kNN affinity.
    pub fn n_neighbors(mut self, n: usize) -> Self {
        self.n_neighbors = n;
        self
    }

    /// Set the discretization seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit spectral clustering to points.
    ///
    /// # Arguments
    ///
    /// * `points` - n × d matrix of n points in d dimensions
    ///
    /// # Returns
    ///
    /// Cluster assignments in `0..k` for each point. Not every id in
    /// `0..k` is guaranteed to be used.
    pub fn fit(&self, points: &Array2<f64>) -> Result<Vec<usize>> {
        let n = points.nrows();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if self.k == 0 || n < self.k {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }
        if self.n_neighbors == 0 {
            return Err(Error::InvalidParameter {
                name: "n_neighbors",
                message: "must be at least 1",
            });
        }
        if self.k == 1 {
            return Ok(vec![0; n]);
        }

        let affinity = self.knn_affinity(points);
        let embedding = self.embed(&affinity)?;
        self.discretize(embedding)
    }

    /// Symmetrized kNN connectivity, each point counted as its own neighbor.
    fn knn_affinity(&self, points: &Array2<f64>) -> Array2<f64> {
        let n = points.nrows();
        let n_neighbors = self.n_neighbors.min(n);
        let mut connectivity = Array2::<f64>::zeros((n, n));

        for i in 0..n {
            let row = points.row(i);
            let mut others: Vec<(f64, usize)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (squared_distance(&row, &points.row(j)), j))
                .collect();
            others.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            connectivity[[i, i]] = 1.0;
            for &(_, j) in others.iter().take(n_neighbors - 1) {
                connectivity[[i, j]] = 1.0;
            }
        }

        let transposed = connectivity.t().to_owned();
        (connectivity + transposed) * 0.5
    }

    /// n × k spectral embedding.
    fn embed(&self, affinity: &Array2<f64>) -> Result<Array2<f64>> {
        let n = affinity.nrows();
        let degree: Vec<f64> = (0..n)
            .map(|i| (0..n).filter(|&j| j != i).map(|j| affinity[[i, j]]).sum())
            .collect();
        let dd: Vec<f64> = degree
            .iter()
            .map(|&d| if d > 0.0 { d.sqrt() } else { 1.0 })
            .collect();

        let laplacian = Mat::<f64>::from_fn(n, n, |i, j| {
            if i == j {
                if degree[i] > 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else {
                -affinity[[i, j]] / (dd[i] * dd[j])
            }
        });

        let evd = laplacian
            .self_adjoint_eigen(Side::Lower)
            .map_err(|e| {
                Error::LinearAlgebra(format!("laplacian eigendecomposition failed: {e:?}"))
            })?;
        let values = evd.S().column_vector();
        let vectors = evd.U();

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

        let mut embedding = Array2::<f64>::zeros((n, self.k));
        for (c, &idx) in order.iter().take(self.k).enumerate() {
            let mut column = embedding.column_mut(c);
            for i in 0..n {
                column[i] = vectors[(i, idx)] / dd[i];
            }
            let pivot = column
                .iter()
                .copied()
                .fold(0.0f64, |best, v| if v.abs() > best.abs() { v } else { best });
            if pivot < 0.0 {
                column.mapv_inplace(|v| -v);
            }
        }

        debug!(
            n,
            k = self.k,
            smallest = values[order[0]],
            "spectral embedding computed"
        );
        Ok(embedding)
    }

    fn discretize(&self, mut vectors: Array2<f64>) -> Result<Vec<usize>> {
        let (n, k) = vectors.dim();

        // Columns to norm sqrt(n), first entry non-positive.
        let norm_ones = (n as f64).sqrt();
        for mut column in vectors.columns_mut() {
            let norm = column.dot(&column).sqrt();
            if norm > 0.0 {
                column.mapv_inplace(|v| v / norm * norm_ones);
            }
            let first = column[0];
            if first != 0.0 {
                column.mapv_inplace(|v| -v * first.signum());
            }
        }
        for mut row in vectors.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row /= norm;
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        for restart in 0..MAX_SVD_RESTARTS {
            // Initial rotation: a random row, then rows as orthogonal as
            // possible to the ones already picked.
            let mut rotation = Array2::<f64>::zeros((k, k));
            rotation
                .column_mut(0)
                .assign(&vectors.row(rng.random_range(0..n)));
            let mut c = Array1::<f64>::zeros(n);
            for j in 1..k {
                let projection = vectors.dot(&rotation.column(j - 1));
                c.zip_mut_with(&projection, |acc, &p| *acc += p.abs());
                let pick = argmin(c.view());
                rotation.column_mut(j).assign(&vectors.row(pick));
            }

            match refine(&vectors, rotation) {
                Ok(labels) => return Ok(labels),
                Err(err) => debug!(restart, %err, "discretization restart"),
            }
        }

        Err(Error::ConvergenceFailure {
            iterations: MAX_SVD_RESTARTS,
        })
    }
}

/// Alternate labeling and rotation updates until the ncut objective settles.
fn refine(vectors: &Array2<f64>, mut rotation: Array2<f64>) -> Result<Vec<usize>> {
    let (n, k) = vectors.dim();
    let mut last_objective = 0.0;
    let mut n_iter = 0;

    loop {
        n_iter += 1;
        let labels: Vec<usize> = vectors.dot(&rotation).outer_iter().map(argmax).collect();

        // onehot(labels)ᵀ · vectors
        let mut t_svd = Mat::<f64>::zeros(k, k);
        for (i, &label) in labels.iter().enumerate() {
            for j in 0..k {
                t_svd[(label, j)] += vectors[[i, j]];
            }
        }

        let svd = t_svd
            .svd()
            .map_err(|e| Error::LinearAlgebra(format!("svd did not converge: {e:?}")))?;
        let singular = svd.S().column_vector();
        let ncut = 2.0 * (n as f64 - (0..k).map(|i| singular[i]).sum::<f64>());

        if (ncut - last_objective).abs() < f64::EPSILON || n_iter > MAX_DISCRETIZE_ITER {
            return Ok(labels);
        }
        last_objective = ncut;

        // rotation = V · Uᵀ
        let (u, v) = (svd.U(), svd.V());
        rotation = Array2::from_shape_fn((k, k), |(i, j)| {
            (0..k).map(|m| v[(i, m)] * u[(j, m)]).sum()
        });
    }
}

/// First index of the maximum.
fn argmax(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

/// First index of the minimum.
fn argmin(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v < row[best] {
            best = i;
        }
    }
    best
}

impl Clustering for SpectralClustering {
    fn fit_predict(&self, data: &Array2<f64>) -> Result<Vec<usize>> {
        self.fit(data)
    }

    fn n_clusters(&self) -> Option<usize> {
        Some(self.k)
    }
}

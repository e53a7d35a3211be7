//! K-means clustering.
//!
//! Partitions data into k clusters by minimizing **within-cluster sum of squares**
//! (WCSS, also called inertia).
//!
//! # Lloyd's Algorithm
//!
//! 1. Initialize k centroids via k-means++
//! 2. **Assign**: Each point → nearest centroid
//! 3. **Update**: Each centroid → mean of assigned points
//! 4. Repeat until the total centroid shift drops below `tol`
//!
//! ## K-means++ Initialization
//!
//! Spreads initial centroids:
//! 1. Choose first centroid uniformly at random
//! 2. Choose next centroid with probability proportional to D(x)²
//!    (squared distance to nearest existing centroid)
//!
//! # Restarts
//!
//! Lloyd only finds a local minimum. With `n_init > 1` the whole procedure
//! is repeated from fresh k-means++ seeds drawn from one seeded generator,
//! and the run with the lowest inertia wins. A fixed seed therefore makes
//! the full multi-restart fit reproducible.

use ndarray::{Array2, ArrayView1};
use rand::prelude::*;
use tracing::debug;

use super::traits::Clustering;
use crate::error::{Error, Result};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// K-means clustering algorithm.
#[derive(Debug, Clone)]
pub struct Kmeans {
    /// Number of clusters.
    k: usize,
    /// Maximum Lloyd iterations per restart.
    max_iter: usize,
    /// Convergence tolerance on total squared centroid shift.
    tol: f64,
    /// Number of k-means++ restarts.
    n_init: usize,
    /// Random seed.
    seed: Option<u64>,
}

/// Result of a single fit: labels, centroids and inertia.
#[derive(Debug, Clone)]
pub struct KmeansFit {
    /// Cluster index per row.
    pub labels: Vec<usize>,
    /// k × d centroid matrix.
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares.
    pub inertia: f64,
}

impl Kmeans {
    /// Create a new K-means clusterer with a single restart.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 300,
            tol: 1e-4,
            n_init: 1,
            seed: None,
        }
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the number of restarts.
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fit and keep the best restart.
    pub fn fit(&self, data: &Array2<f64>) -> Result<KmeansFit> {
        validate_input(data, self.k)?;

        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };

        let mut best: Option<KmeansFit> = None;
        for restart in 0..self.n_init {
            let fit = self.lloyd(data, &mut rng);
            debug!(restart, inertia = fit.inertia, "k-means restart");
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best.ok_or(Error::EmptyInput)
    }

    fn lloyd(&self, data: &Array2<f64>, rng: &mut impl Rng) -> KmeansFit {
        let (n, d) = data.dim();
        let mut centroids = kmeans_plus_plus(data, self.k, rng);
        let mut labels = vec![0usize; n];

        for _iter in 0..self.max_iter {
            assign_nearest(data, &centroids, &mut labels);

            // Update step
            let mut new_centroids = Array2::zeros((self.k, d));
            let mut counts = vec![0usize; self.k];

            for (i, &k) in labels.iter().enumerate() {
                for j in 0..d {
                    new_centroids[[k, j]] += data[[i, j]];
                }
                counts[k] += 1;
            }

            for (k, &count) in counts.iter().enumerate() {
                if count > 0 {
                    for j in 0..d {
                        new_centroids[[k, j]] /= count as f64;
                    }
                } else {
                    // Empty cluster: reinitialize randomly
                    let idx = rng.random_range(0..n);
                    new_centroids.row_mut(k).assign(&data.row(idx));
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(new_centroids.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();

            centroids = new_centroids;

            if shift < self.tol {
                break;
            }
        }

        let inertia = assign_nearest(data, &centroids, &mut labels);
        KmeansFit {
            labels,
            centroids,
            inertia,
        }
    }
}

impl Clustering for Kmeans {
    fn fit_predict(&self, data: &Array2<f64>) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.labels)
    }

    fn n_clusters(&self) -> Option<usize> {
        Some(self.k)
    }
}

/// Reject empty input and k outside `1..=n`.
pub(crate) fn validate_input(data: &Array2<f64>, k: usize) -> Result<()> {
    let n = data.nrows();
    if n == 0 {
        return Err(Error::EmptyInput);
    }
    if k == 0 || k > n {
        return Err(Error::InvalidClusterCount {
            requested: k,
            n_items: n,
        });
    }
    Ok(())
}

/// Squared Euclidean distance.
#[inline]
pub(crate) fn squared_distance(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Index of the nearest centroid and its squared distance; ties go to the lower index.
#[inline]
pub(crate) fn nearest(point: &ArrayView1<'_, f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best_cluster = 0;
    let mut best_dist = f64::MAX;
    for (k, centroid) in centroids.outer_iter().enumerate() {
        let dist = squared_distance(point, &centroid);
        if dist < best_dist {
            best_dist = dist;
            best_cluster = k;
        }
    }
    (best_cluster, best_dist)
}

/// Assign every row to its nearest centroid; returns the resulting inertia.
pub(crate) fn assign_nearest(
    data: &Array2<f64>,
    centroids: &Array2<f64>,
    labels: &mut [usize],
) -> f64 {
    #[cfg(feature = "parallel")]
    {
        let dists: Vec<f64> = labels
            .par_iter_mut()
            .enumerate()
            .map(|(i, label)| {
                let (k, dist) = nearest(&data.row(i), centroids);
                *label = k;
                dist
            })
            .collect();
        dists.iter().sum()
    }

    #[cfg(not(feature = "parallel"))]
    {
        let mut inertia = 0.0;
        for (i, label) in labels.iter_mut().enumerate() {
            let (k, dist) = nearest(&data.row(i), centroids);
            *label = k;
            inertia += dist;
        }
        inertia
    }
}

/// k-means++ seeding over the rows of `data`.
pub(crate) fn kmeans_plus_plus(data: &Array2<f64>, k: usize, rng: &mut impl Rng) -> Array2<f64> {
    let (n, d) = data.dim();
    let mut centroids = Array2::zeros((k, d));

    // First centroid: random point
    let first = rng.random_range(0..n);
    centroids.row_mut(0).assign(&data.row(first));

    // Running D(x)² to the nearest chosen centroid
    let mut distances: Vec<f64> = data
        .outer_iter()
        .map(|p| squared_distance(&p, &centroids.row(0)))
        .collect();

    for i in 1..k {
        let total: f64 = distances.iter().sum();
        let selected = if total <= 0.0 {
            rng.random_range(0..n)
        } else {
            let threshold = rng.random::<f64>() * total;
            let mut cumsum = 0.0;
            let mut selected = n - 1;
            for (j, &dist) in distances.iter().enumerate() {
                cumsum += dist;
                if cumsum >= threshold && dist > 0.0 {
                    selected = j;
                    break;
                }
            }
            selected
        };

        centroids.row_mut(i).assign(&data.row(selected));
        for (j, slot) in distances.iter_mut().enumerate() {
            let dist = squared_distance(&data.row(j), &centroids.row(i));
            if dist < *slot {
                *slot = dist;
            }
        }
    }

    centroids
}

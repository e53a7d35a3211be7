//! Mini-batch K-means (Sculley, 2010).
//!
//! Trades a little inertia for speed: each step draws a small random batch,
//! assigns it to the nearest centers and moves each touched center toward its
//! batch members with a per-center learning rate `1 / count`.
//!
//! Stops after `max_iter` passes worth of batches, or earlier once the
//! smoothed batch inertia has not improved for `max_no_improvement`
//! consecutive batches. Final labels come from a full nearest-center pass.

use ndarray::Array2;
use rand::prelude::*;
use tracing::debug;

use super::kmeans::{assign_nearest, kmeans_plus_plus, nearest, validate_input};
use super::traits::Clustering;
use crate::error::Result;

/// Mini-batch K-means clustering.
#[derive(Debug, Clone)]
pub struct MiniBatchKmeans {
    k: usize,
    batch_size: usize,
    max_iter: usize,
    max_no_improvement: usize,
    seed: Option<u64>,
}

impl MiniBatchKmeans {
    /// Create a mini-batch clusterer with batches of 16.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            batch_size: 16,
            max_iter: 100,
            max_no_improvement: 10,
            seed: None,
        }
    }

    /// Set batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the number of full-data passes.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fit and return the final k × d centers.
    pub fn fit_centroids(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        validate_input(data, self.k)?;
        let n = data.nrows();

        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };

        // Seed centers from a random sample of at least 3 × max(k, batch) rows.
        let init_size = (3 * self.batch_size.max(self.k)).min(n);
        let sample_idx = rand::seq::index::sample(&mut rng, n, init_size).into_vec();
        let sample = data.select(ndarray::Axis(0), &sample_idx);
        let mut centroids = kmeans_plus_plus(&sample, self.k, &mut rng);

        let mut counts = vec![0usize; self.k];
        let n_steps = (self.max_iter * n).div_ceil(self.batch_size);
        let alpha = (2.0 * self.batch_size as f64 / (n as f64 + 1.0)).min(1.0);
        let mut ewa_inertia: Option<f64> = None;
        let mut best_inertia = f64::INFINITY;
        let mut no_improvement = 0;

        for step in 0..n_steps {
            let mut batch_inertia = 0.0;
            for _ in 0..self.batch_size {
                let i = rng.random_range(0..n);
                let point = data.row(i);
                let (k, dist) = nearest(&point, &centroids);
                batch_inertia += dist;

                counts[k] += 1;
                let eta = 1.0 / counts[k] as f64;
                let mut centroid = centroids.row_mut(k);
                centroid.zip_mut_with(&point, |c, &x| *c += eta * (x - *c));
            }
            batch_inertia /= self.batch_size as f64;

            let smoothed = match ewa_inertia {
                Some(prev) => prev * (1.0 - alpha) + batch_inertia * alpha,
                None => batch_inertia,
            };
            ewa_inertia = Some(smoothed);

            if smoothed < best_inertia {
                best_inertia = smoothed;
                no_improvement = 0;
            } else {
                no_improvement += 1;
                if no_improvement >= self.max_no_improvement {
                    debug!(step, smoothed, "mini-batch k-means stopped early");
                    break;
                }
            }
        }

        Ok(centroids)
    }
}

impl Clustering for MiniBatchKmeans {
    fn fit_predict(&self, data: &Array2<f64>) -> Result<Vec<usize>> {
        let centroids = self.fit_centroids(data)?;
        let mut labels = vec![0usize; data.nrows()];
        assign_nearest(data, &centroids, &mut labels);
        Ok(labels)
    }

    fn n_clusters(&self) -> Option<usize> {
        Some(self.k)
    }
}

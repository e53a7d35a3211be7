//! Hierarchical (agglomerative) clustering.
//!
//! Bottom-up clustering that builds a **dendrogram** by iteratively
//! merging the closest clusters, then cuts it to the requested k.
//!
//! # Linkage Methods
//!
//! | Linkage | Formula | Effect |
//! |---------|---------|--------|
//! | Single | min(d(a,b)) for a∈A, b∈B | Chaining; elongated clusters |
//! | Complete | max(d(a,b)) | Compact clusters, resists chaining |
//! | Average | mean(d(a,b)) | Balanced compromise |
//!
//! # Metrics
//!
//! Macronutrient axes have very different spreads (carbohydrates dominate
//! grams per 100 g), so the food pipeline pairs complete linkage with the
//! Manhattan (L1) metric rather than Euclidean.

use kodama::{linkage as kodama_linkage, Method as KodamaMethod};
use ndarray::{Array2, ArrayView1};

use super::dendrogram::Dendrogram;
use super::traits::Clustering;
use crate::error::{Error, Result};

/// Linkage method for hierarchical clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Single linkage: minimum distance between clusters.
    Single,
    /// Complete linkage: maximum distance between clusters.
    Complete,
    /// Average linkage: mean distance between clusters.
    Average,
}

/// Pairwise point metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// L2 distance.
    Euclidean,
    /// L1 distance.
    Manhattan,
}

impl Metric {
    fn distance(self, a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
        let pairs = a.iter().zip(b.iter());
        match self {
            Metric::Euclidean => pairs.map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt(),
            Metric::Manhattan => pairs.map(|(x, y)| (x - y).abs()).sum(),
        }
    }
}

/// Hierarchical (agglomerative) clustering.
#[derive(Debug, Clone)]
pub struct HierarchicalClustering {
    n_clusters: usize,
    linkage: Linkage,
    metric: Metric,
}

impl HierarchicalClustering {
    /// Create a new hierarchical clusterer (average linkage, Euclidean).
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            linkage: Linkage::Average,
            metric: Metric::Euclidean,
        }
    }

    /// Set linkage method.
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Set the pairwise metric.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Fit and return the full dendrogram.
    pub fn fit_dendrogram(&self, data: &Array2<f64>) -> Result<Dendrogram> {
        let n = data.nrows();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        let mut dendro = Dendrogram::new(n);
        if n == 1 {
            return Ok(dendro);
        }

        // Condensed dissimilarity matrix (upper triangle, row-major), length N-choose-2.
        let mut condensed = Vec::with_capacity((n * (n - 1)) / 2);
        for row in 0..(n - 1) {
            for col in (row + 1)..n {
                condensed.push(self.metric.distance(&data.row(row), &data.row(col)));
            }
        }

        let method = match self.linkage {
            Linkage::Single => KodamaMethod::Single,
            Linkage::Complete => KodamaMethod::Complete,
            Linkage::Average => KodamaMethod::Average,
        };

        let dend = kodama_linkage(&mut condensed, n, method);
        for step in dend.steps() {
            dendro.add_merge(step.cluster1, step.cluster2, step.dissimilarity, step.size);
        }

        Ok(dendro)
    }
}

impl Clustering for HierarchicalClustering {
    fn fit_predict(&self, data: &Array2<f64>) -> Result<Vec<usize>> {
        if self.n_clusters > data.nrows() {
            return Err(Error::InvalidClusterCount {
                requested: self.n_clusters,
                n_items: data.nrows(),
            });
        }
        let dendro = self.fit_dendrogram(data)?;
        dendro.cut_to_k(self.n_clusters)
    }

    fn n_clusters(&self) -> Option<usize> {
        Some(self.n_clusters)
    }
}

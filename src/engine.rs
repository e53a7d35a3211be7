//! Algorithm selection and dispatch.
//!
//! [`ClusteringEngine::fit`] turns a feature matrix into a
//! [`ClusterAssignment`] with signed cluster ids, so density-based noise can
//! be carried as [`NOISE`] next to ordinary ids.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cluster::{
    Clustering, Dbscan, HierarchicalClustering, Kmeans, Linkage, MeanShift, Metric,
    MiniBatchKmeans, SpectralClustering,
};
use crate::config::ClusteringConfig;
use crate::error::{Error, Result};

/// Cluster id as stored in assignments. Non-negative except for [`NOISE`].
pub type ClusterId = i64;

/// Sentinel id for points a density-based algorithm left unassigned.
pub const NOISE: ClusterId = -1;

/// Clustering algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    /// k-means++ with restarts, best inertia kept.
    Kmeans,
    /// Mini-batch k-means.
    MiniBatchKmeans,
    /// Complete-linkage agglomerative clustering over L1 distances.
    Hierarchical,
    /// DBSCAN; may emit [`NOISE`].
    Dbscan,
    /// Flat-kernel mean shift; cluster count is emergent.
    MeanShift,
    /// kNN-graph spectral clustering with discretized labels.
    Spectral,
    /// Plain single-run k-means used when a lenient selector is not recognized.
    FallbackKmeans,
}

impl Algorithm {
    /// Every selectable algorithm, in canonical order.
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Kmeans,
        Algorithm::MiniBatchKmeans,
        Algorithm::Hierarchical,
        Algorithm::Dbscan,
        Algorithm::MeanShift,
        Algorithm::Spectral,
    ];

    /// Default evaluation set.
    pub const EVALUATED: [Algorithm; 4] = [
        Algorithm::Kmeans,
        Algorithm::Hierarchical,
        Algorithm::Dbscan,
        Algorithm::Spectral,
    ];

    /// Selector name, also used in output file names.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Kmeans => "kmeans",
            Algorithm::MiniBatchKmeans => "minibatch_kmeans",
            Algorithm::Hierarchical => "hierarchical",
            Algorithm::Dbscan => "dbscan",
            Algorithm::MeanShift => "mean_shift",
            Algorithm::Spectral => "spectral",
            Algorithm::FallbackKmeans => "fallback_kmeans",
        }
    }

    /// True for algorithms whose cluster count follows from the data rather than K.
    pub fn is_emergent(self) -> bool {
        matches!(self, Algorithm::Dbscan | Algorithm::MeanShift)
    }

    /// Resolve a user-supplied selector.
    ///
    /// Strict mode rejects unknown names with [`Error::UnknownAlgorithm`].
    /// Lenient mode maps them to [`Algorithm::FallbackKmeans`] and logs a warning.
    pub fn resolve(selector: &str, strict: bool) -> Result<Self> {
        match selector.parse() {
            Ok(algorithm) => Ok(algorithm),
            Err(err) if strict => Err(err),
            Err(_) => {
                warn!(selector, "unknown clustering algorithm, falling back to plain k-means");
                Ok(Algorithm::FallbackKmeans)
            }
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name() == normalized)
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
    }
}

impl TryFrom<String> for Algorithm {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(algorithm: Algorithm) -> Self {
        algorithm.name().to_string()
    }
}

/// Cluster id per feature row, produced by one algorithm run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    algorithm: Algorithm,
    labels: Vec<ClusterId>,
}

impl ClusterAssignment {
    /// Wrap row-aligned labels.
    pub fn new(algorithm: Algorithm, labels: Vec<ClusterId>) -> Self {
        Self { algorithm, labels }
    }

    /// Algorithm that produced the labels.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Cluster id per row.
    pub fn labels(&self) -> &[ClusterId] {
        &self.labels
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when no row was clustered.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Distinct ids present, ascending (noise first when present).
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        let mut ids = self.labels.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Number of distinct non-noise clusters.
    pub fn n_clusters(&self) -> usize {
        self.cluster_ids().into_iter().filter(|&c| c != NOISE).count()
    }

    /// Rows labeled [`NOISE`].
    pub fn n_noise(&self) -> usize {
        self.labels.iter().filter(|&&c| c == NOISE).count()
    }
}

/// Runs any [`Algorithm`] with parameters from a [`ClusteringConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClusteringEngine {
    config: ClusteringConfig,
}

impl ClusteringEngine {
    /// Create an engine.
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    /// Parameters in use.
    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Cluster the rows of `features`.
    ///
    /// Seeded algorithms are deterministic for a fixed config and input.
    pub fn fit(&self, algorithm: Algorithm, features: &Array2<f64>) -> Result<ClusterAssignment> {
        let cfg = &self.config;
        let k = cfg.n_clusters;

        let labels = match algorithm {
            Algorithm::Kmeans => partition(
                &Kmeans::new(k)
                    .with_n_init(cfg.kmeans_restarts)
                    .with_max_iter(cfg.max_iter)
                    .with_tol(cfg.tol)
                    .with_seed(cfg.seed),
                features,
            )?,
            Algorithm::MiniBatchKmeans => partition(
                &MiniBatchKmeans::new(k)
                    .with_batch_size(cfg.batch_size)
                    .with_seed(cfg.seed),
                features,
            )?,
            Algorithm::Hierarchical => partition(
                &HierarchicalClustering::new(k)
                    .with_linkage(Linkage::Complete)
                    .with_metric(Metric::Manhattan),
                features,
            )?,
            Algorithm::Dbscan => Dbscan::new(cfg.dbscan_eps, cfg.dbscan_min_samples)
                .fit_predict(features)?
                .into_iter()
                .map(|label| label.map_or(NOISE, |c| c as ClusterId))
                .collect(),
            Algorithm::MeanShift => partition(
                &MeanShift::new(cfg.mean_shift_bandwidth).with_max_iter(cfg.max_iter),
                features,
            )?,
            Algorithm::Spectral => partition(
                &SpectralClustering::new(k)
                    .n_neighbors(cfg.spectral_neighbors)
                    .seed(cfg.seed),
                features,
            )?,
            Algorithm::FallbackKmeans => partition(&Kmeans::new(k).with_seed(cfg.seed), features)?,
        };

        let assignment = ClusterAssignment::new(algorithm, labels);
        info!(
            %algorithm,
            rows = assignment.len(),
            clusters = assignment.n_clusters(),
            noise = assignment.n_noise(),
            "clustering finished"
        );
        Ok(assignment)
    }

    /// Resolve `selector` using the configured strictness, then [`fit`](Self::fit).
    pub fn fit_selector(
        &self,
        selector: &str,
        features: &Array2<f64>,
    ) -> Result<ClusterAssignment> {
        let algorithm = Algorithm::resolve(selector, self.config.strict_selector)?;
        self.fit(algorithm, features)
    }
}

fn partition(model: &impl Clustering, data: &Array2<f64>) -> Result<Vec<ClusterId>> {
    Ok(model
        .fit_predict(data)?
        .into_iter()
        .map(|c| c as ClusterId)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two tight blobs of six foods each, far apart on every axis.
    fn blobs() -> Array2<f64> {
        Array2::from_shape_fn((12, 4), |(i, j)| {
            let base = if i < 6 { 1.0 } else { 30.0 };
            base + ((i % 6) as f64) * 0.1 + j as f64 * 0.01
        })
    }

    fn config() -> ClusteringConfig {
        ClusteringConfig {
            n_clusters: 2,
            kmeans_restarts: 5,
            dbscan_eps: 1.0,
            dbscan_min_samples: 3,
            spectral_neighbors: 4,
            batch_size: 4,
            ..ClusteringConfig::default()
        }
    }

    #[test]
    fn test_parse_selectors() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.name().parse::<Algorithm>().unwrap(), algorithm);
        }
        assert_eq!(" KMeans ".parse::<Algorithm>().unwrap(), Algorithm::Kmeans);
        assert!(matches!(
            "birch".parse::<Algorithm>(),
            Err(Error::UnknownAlgorithm(name)) if name == "birch"
        ));
        assert!("fallback_kmeans".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_resolve_strict_and_lenient() {
        assert!(matches!(
            Algorithm::resolve("affinity_propagation", true),
            Err(Error::UnknownAlgorithm(_))
        ));
        assert_eq!(
            Algorithm::resolve("affinity_propagation", false).unwrap(),
            Algorithm::FallbackKmeans
        );
        assert_eq!(Algorithm::resolve("dbscan", false).unwrap(), Algorithm::Dbscan);
    }

    #[test]
    fn test_every_algorithm_separates_blobs() {
        let engine = ClusteringEngine::new(config());
        let data = blobs();

        for algorithm in Algorithm::ALL.into_iter().chain([Algorithm::FallbackKmeans]) {
            let assignment = engine.fit(algorithm, &data).unwrap();
            let labels = assignment.labels();
            assert_eq!(labels.len(), 12, "{algorithm}");
            assert!(labels[..6].iter().all(|&l| l == labels[0]), "{algorithm}");
            assert!(labels[6..].iter().all(|&l| l == labels[6]), "{algorithm}");
            assert_ne!(labels[0], labels[6], "{algorithm}");
            assert_eq!(assignment.n_clusters(), 2, "{algorithm}");
        }
    }

    #[test]
    fn test_target_k_algorithms_stay_in_range() {
        let engine = ClusteringEngine::new(ClusteringConfig {
            n_clusters: 3,
            ..config()
        });
        let data = blobs();
        for algorithm in Algorithm::ALL.into_iter().filter(|a| !a.is_emergent()) {
            let assignment = engine.fit(algorithm, &data).unwrap();
            assert!(
                assignment.labels().iter().all(|&l| (0..3).contains(&l)),
                "{algorithm}"
            );
        }
    }

    #[test]
    fn test_seeded_runs_are_deterministic() {
        let engine = ClusteringEngine::new(config());
        let data = Array2::from_shape_fn((40, 4), |(i, j)| ((i * 13 + j * 7) % 17) as f64);
        for algorithm in [
            Algorithm::Kmeans,
            Algorithm::MiniBatchKmeans,
            Algorithm::Hierarchical,
            Algorithm::Spectral,
        ] {
            let a = engine.fit(algorithm, &data).unwrap();
            let b = engine.fit(algorithm, &data).unwrap();
            assert_eq!(a, b, "{algorithm}");
        }
    }

    #[test]
    fn test_dbscan_noise_sentinel() {
        let mut data = blobs();
        data.row_mut(11).fill(500.0);

        let assignment = ClusteringEngine::new(config())
            .fit(Algorithm::Dbscan, &data)
            .unwrap();

        assert_eq!(assignment.labels()[11], NOISE);
        assert_eq!(assignment.n_noise(), 1);
        assert_eq!(assignment.cluster_ids(), vec![NOISE, 0, 1]);
        assert_eq!(assignment.n_clusters(), 2);
    }

    #[test]
    fn test_fit_selector_respects_strictness() {
        let data = blobs();
        let strict = ClusteringEngine::new(config());
        assert!(strict.fit_selector("birch", &data).is_err());

        let lenient = ClusteringEngine::new(ClusteringConfig {
            strict_selector: false,
            ..config()
        });
        let assignment = lenient.fit_selector("birch", &data).unwrap();
        assert_eq!(assignment.algorithm(), Algorithm::FallbackKmeans);
        assert_eq!(assignment.n_clusters(), 2);
    }
}

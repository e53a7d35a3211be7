//! Extrinsic evaluation of clustering runs against ground truth.
//!
//! [`evaluate`] clusters the labeled dataset once per algorithm and scores
//! each run with four partition-agreement metrics. Scores are reported in
//! the order the algorithms were given; ranking is left to the caller.

use serde::Serialize;
use tracing::info;

use crate::engine::{Algorithm, ClusterAssignment, ClusteringEngine};
use crate::error::{Error, Result};
use crate::features::GroundTruth;
use crate::metrics::{ami, ari, encode_labels, fowlkes_mallows, v_measure};

/// Agreement scores of one algorithm run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    /// Algorithm that produced the predicted partition.
    pub algorithm: Algorithm,
    /// Adjusted Rand Index.
    pub ari: f64,
    /// Fowlkes-Mallows index.
    pub fowlkes_mallows: f64,
    /// Adjusted mutual information.
    pub ami: f64,
    /// V-measure.
    pub v_measure: f64,
}

/// Score one assignment against row-aligned truth labels.
///
/// Noise is scored as one more predicted cluster.
///
/// # Errors
///
/// - [`Error::EmptyInput`] when there is nothing to score.
/// - [`Error::DimensionMismatch`] when the two sides differ in length.
pub fn score(predicted: &ClusterAssignment, truth: &[String]) -> Result<ScoreRecord> {
    if predicted.is_empty() {
        return Err(Error::EmptyInput);
    }
    if predicted.len() != truth.len() {
        return Err(Error::DimensionMismatch {
            expected: truth.len(),
            found: predicted.len(),
        });
    }

    let pred = encode_labels(predicted.labels());
    let truth = encode_labels(truth);

    Ok(ScoreRecord {
        algorithm: predicted.algorithm(),
        ari: ari(&pred, &truth),
        fowlkes_mallows: fowlkes_mallows(&pred, &truth),
        ami: ami(&pred, &truth),
        v_measure: v_measure(&pred, &truth),
    })
}

/// Cluster `truth`'s features with each algorithm in turn and score it.
pub fn evaluate(
    engine: &ClusteringEngine,
    algorithms: &[Algorithm],
    truth: &GroundTruth,
) -> Result<Vec<ScoreRecord>> {
    algorithms
        .iter()
        .map(|&algorithm| {
            let assignment = engine.fit(algorithm, truth.features())?;
            let record = score(&assignment, truth.labels())?;
            info!(
                %algorithm,
                ari = record.ari,
                fowlkes_mallows = record.fowlkes_mallows,
                ami = record.ami,
                v_measure = record.v_measure,
                "scored"
            );
            Ok(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusteringConfig;
    use ndarray::Array2;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_perfect_scores() {
        let predicted = ClusterAssignment::new(Algorithm::Kmeans, vec![0, 0, 1, 1]);
        let record = score(&predicted, &labels(&["0", "0", "1", "1"])).unwrap();

        assert_eq!(record.algorithm, Algorithm::Kmeans);
        assert!((record.ari - 1.0).abs() < 1e-10);
        assert!((record.fowlkes_mallows - 1.0).abs() < 1e-10);
        assert!((record.ami - 1.0).abs() < 1e-10);
        assert!((record.v_measure - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_noise_counts_as_a_cluster() {
        let predicted = ClusterAssignment::new(Algorithm::Dbscan, vec![-1, -1, 0, 0]);
        let record = score(&predicted, &labels(&["a", "a", "b", "b"])).unwrap();
        assert!((record.ari - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_score_length_mismatch() {
        let predicted = ClusterAssignment::new(Algorithm::Kmeans, vec![0, 1, 1]);
        assert!(matches!(
            score(&predicted, &labels(&["a", "b"])),
            Err(Error::DimensionMismatch { expected: 2, found: 3 })
        ));
        let empty = ClusterAssignment::new(Algorithm::Kmeans, vec![]);
        assert!(matches!(score(&empty, &[]), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_evaluate_preserves_order() {
        let features = Array2::from_shape_fn((8, 4), |(i, j)| {
            if i < 4 {
                i as f64 * 0.1 + j as f64
            } else {
                50.0 + i as f64 * 0.1 + j as f64
            }
        });
        let truth = GroundTruth::new(
            features,
            labels(&["x", "x", "x", "x", "y", "y", "y", "y"]),
        )
        .unwrap();
        let engine = ClusteringEngine::new(ClusteringConfig {
            n_clusters: 2,
            dbscan_eps: 1.0,
            dbscan_min_samples: 2,
            spectral_neighbors: 3,
            ..ClusteringConfig::default()
        });
        let order = [
            Algorithm::Spectral,
            Algorithm::Kmeans,
            Algorithm::Dbscan,
            Algorithm::Hierarchical,
        ];

        let records = evaluate(&engine, &order, &truth).unwrap();

        let got: Vec<Algorithm> = records.iter().map(|r| r.algorithm).collect();
        assert_eq!(got, order.to_vec());
        for record in &records {
            assert!((record.ari - 1.0).abs() < 1e-10, "{}", record.algorithm);
        }
    }
}

//! Run context tying loading, clustering, reconciliation and output together.
//!
//! A [`Pipeline`] owns a validated [`PipelineConfig`]. Inputs are loaded
//! explicitly and passed back in, so one dataset and taxonomy can be labeled
//! by several algorithms without re-reading files.
//!
//! ```no_run
//! use foodcluster::{Algorithm, Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(PipelineConfig::from_file("foodcluster.toml")?)?;
//! let features = pipeline.load_features()?;
//! let taxonomy = pipeline.load_taxonomy()?;
//! let labeling = pipeline.label(&features, &taxonomy, Algorithm::Kmeans)?;
//! pipeline.write_labeling(&labeling)?;
//! # Ok::<(), foodcluster::Error>(())
//! ```

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::PipelineConfig;
use crate::engine::{Algorithm, ClusterAssignment, ClusteringEngine};
use crate::error::Result;
use crate::evaluation::{self, ScoreRecord};
use crate::features::{self, FeatureTable, GroundTruth, RawTable};
use crate::reconciliation::{reconcile, Reconciliation};
use crate::report;
use crate::summary::{profile_clusters, ClusterProfile, KeywordSummarizer};
use crate::taxonomy::Taxonomy;

/// Output of one labeling run.
#[derive(Debug, Clone)]
pub struct Labeling {
    /// Raw cluster assignment.
    pub assignment: ClusterAssignment,
    /// Names and membership resolved from the assignment.
    pub reconciliation: Reconciliation,
}

impl Labeling {
    /// Algorithm that produced the assignment.
    pub fn algorithm(&self) -> Algorithm {
        self.assignment.algorithm()
    }
}

/// Configured run context.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    engine: ClusteringEngine,
}

impl Pipeline {
    /// Validate `config` and build the clustering engine.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let engine = ClusteringEngine::new(config.clustering.clone());
        Ok(Self { config, engine })
    }

    /// Configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Engine used for every run.
    pub fn engine(&self) -> &ClusteringEngine {
        &self.engine
    }

    /// Read and extract the nutrition dataset.
    pub fn load_features(&self) -> Result<FeatureTable> {
        let table = RawTable::from_path(&self.config.data.dataset)?;
        features::extract(&table, &self.config.schema)
    }

    /// Read the reference taxonomy.
    pub fn load_taxonomy(&self) -> Result<Taxonomy> {
        Taxonomy::from_path(&self.config.data.taxonomy, &self.config.schema)
    }

    /// Read and extract the labeled evaluation dataset.
    pub fn load_ground_truth(&self) -> Result<GroundTruth> {
        let table = RawTable::from_path(&self.config.data.labeled_dataset)?;
        features::extract_ground_truth(&table, &self.config.schema)
    }

    /// Cluster `features` with `algorithm` and resolve group names.
    pub fn label(
        &self,
        features: &FeatureTable,
        taxonomy: &Taxonomy,
        algorithm: Algorithm,
    ) -> Result<Labeling> {
        let assignment = self.engine.fit(algorithm, &features.matrix())?;
        self.reconcile(features, taxonomy, assignment)
    }

    /// Like [`label`](Self::label), resolving `selector` with the configured
    /// strictness.
    pub fn label_selector(
        &self,
        features: &FeatureTable,
        taxonomy: &Taxonomy,
        selector: &str,
    ) -> Result<Labeling> {
        let assignment = self.engine.fit_selector(selector, &features.matrix())?;
        self.reconcile(features, taxonomy, assignment)
    }

    fn reconcile(
        &self,
        features: &FeatureTable,
        taxonomy: &Taxonomy,
        assignment: ClusterAssignment,
    ) -> Result<Labeling> {
        let reconciliation = reconcile(
            features,
            &assignment,
            taxonomy,
            &self.config.report.unclassified_label,
        )?;
        info!(
            algorithm = %assignment.algorithm(),
            clusters = reconciliation.cluster_names().len(),
            unplaced = reconciliation.unplaced().len(),
            "labeled dataset"
        );
        Ok(Labeling {
            assignment,
            reconciliation,
        })
    }

    /// Score every configured evaluation algorithm against `truth`.
    pub fn evaluate(&self, truth: &GroundTruth) -> Result<Vec<ScoreRecord>> {
        evaluation::evaluate(&self.engine, &self.config.evaluation.algorithms, truth)
    }

    /// Per-cluster profiles with keyword summaries.
    pub fn profile(&self, labeling: &Labeling) -> Vec<ClusterProfile> {
        let summarizer = KeywordSummarizer::new(self.config.report.top_keywords)
            .with_stop_words(self.config.report.stop_words.iter().cloned());
        profile_clusters(&labeling.reconciliation, &summarizer)
    }

    /// Write `labeled_<algo>.csv` and `food_groups_<algo>.csv`.
    pub fn write_labeling(&self, labeling: &Labeling) -> Result<Vec<PathBuf>> {
        let algorithm = labeling.algorithm();
        let labeled = self.output_path("labeled", algorithm);
        report::to_file(&labeled, |f| {
            report::write_labeled(f, labeling.reconciliation.records())
        })?;

        let groups = self.output_path("food_groups", algorithm);
        let report_cfg = &self.config.report;
        report::to_file(&groups, |f| {
            report::write_membership(
                f,
                labeling.reconciliation.matrix(),
                &report_cfg.member_marker,
                &report_cfg.non_member_marker,
            )
        })?;

        info!(labeled = %labeled.display(), groups = %groups.display(), "wrote labeling");
        Ok(vec![labeled, groups])
    }

    /// Write `profiles_<algo>.csv`.
    pub fn write_profiles(
        &self,
        algorithm: Algorithm,
        profiles: &[ClusterProfile],
    ) -> Result<PathBuf> {
        let path = self.output_path("profiles", algorithm);
        report::to_file(&path, |f| report::write_profiles(f, profiles))?;
        info!(path = %path.display(), "wrote profiles");
        Ok(path)
    }

    /// Write `scores.csv`.
    pub fn write_scores(&self, scores: &[ScoreRecord]) -> Result<PathBuf> {
        let path = self.config.data.output_dir.join("scores.csv");
        report::to_file(&path, |f| report::write_scores(f, scores))?;
        info!(path = %path.display(), "wrote scores");
        Ok(path)
    }

    fn output_path(&self, stem: &str, algorithm: Algorithm) -> PathBuf {
        output_file(&self.config.data.output_dir, stem, algorithm)
    }
}

fn output_file(dir: &Path, stem: &str, algorithm: Algorithm) -> PathBuf {
    dir.join(format!("{stem}_{}.csv", algorithm.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PipelineConfig::default();
        config.clustering.n_clusters = 0;
        assert!(matches!(Pipeline::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_output_names() {
        let dir = Path::new("out");
        assert_eq!(
            output_file(dir, "labeled", Algorithm::MeanShift),
            PathBuf::from("out/labeled_mean_shift.csv")
        );
        assert_eq!(
            output_file(dir, "food_groups", Algorithm::FallbackKmeans),
            PathBuf::from("out/food_groups_fallback_kmeans.csv")
        );
    }

    #[test]
    fn test_missing_dataset_is_io_error() {
        let mut config = PipelineConfig::default();
        config.data.dataset = PathBuf::from("/nonexistent/foods.csv");
        let pipeline = Pipeline::new(config).unwrap();
        assert!(matches!(pipeline.load_features(), Err(Error::Io(_))));
    }
}

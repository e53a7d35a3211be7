//! Pipeline configuration.
//!
//! Every section has serde defaults matching the reference food-group setup
//! (32 groups, seed 0), so an empty TOML file is a valid configuration.
//!
//! ```toml
//! [data]
//! dataset = "data/foods.csv"
//! labeled_dataset = "data/foods_labeled.csv"
//! taxonomy = "data/food_groups.csv"
//! output_dir = "out"
//!
//! [clustering]
//! n_clusters = 32
//! seed = 0
//! dbscan_eps = 2.5
//!
//! [evaluation]
//! algorithms = ["kmeans", "hierarchical", "dbscan", "spectral"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::Algorithm;
use crate::error::{Error, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input and output locations.
    #[serde(default)]
    pub data: DataConfig,

    /// Column names of the input tables.
    #[serde(default)]
    pub schema: Schema,

    /// Clustering parameters shared by all algorithms.
    #[serde(default)]
    pub clustering: ClusteringConfig,

    /// Evaluation run settings.
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Output rendering.
    #[serde(default)]
    pub report: ReportConfig,
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `Error::Config` if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
            .map_err(|e| Error::Config(format!("'{}': {}", path.display(), e)))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(format!("invalid TOML: {e}")))
    }

    /// Validate all sections, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.clustering
            .validate()
            .map_err(|e| Error::Config(format!("[clustering] {e}")))?;
        self.evaluation
            .validate()
            .map_err(|e| Error::Config(format!("[evaluation] {e}")))?;
        self.report
            .validate()
            .map_err(|e| Error::Config(format!("[report] {e}")))?;
        Ok(())
    }
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Nutrition dataset to cluster and label.
    pub dataset: PathBuf,
    /// Ground-truth labeled dataset for evaluation.
    pub labeled_dataset: PathBuf,
    /// Reference taxonomy (id, name) CSV.
    pub taxonomy: PathBuf,
    /// Directory receiving CSV outputs.
    pub output_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data/foods.csv"),
            labeled_dataset: PathBuf::from("data/foods_labeled.csv"),
            taxonomy: PathBuf::from("data/food_groups.csv"),
            output_dir: PathBuf::from("out"),
        }
    }
}

/// Column names. Macronutrient columns are fixed (see [`crate::features::MACRONUTRIENTS`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// Record identifier column.
    pub id: String,
    /// Display name column.
    pub name: String,
    /// Food energy column.
    pub energy: String,
    /// Ground-truth group label column.
    pub label: String,
    /// Identifier column of the taxonomy file.
    pub taxonomy_id: String,
    /// Name column of the taxonomy file.
    pub taxonomy_name: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            id: "smlmitzrach".to_string(),
            name: "shmmitzrach".to_string(),
            energy: "food_energy".to_string(),
            label: "SubFoodGroupLabel".to_string(),
            taxonomy_id: "id".to_string(),
            taxonomy_name: "name".to_string(),
        }
    }
}

/// Clustering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Target group count K for partitional algorithms.
    pub n_clusters: usize,
    /// Seed for every randomized algorithm.
    pub seed: u64,
    /// k-means restarts; best inertia wins.
    pub kmeans_restarts: usize,
    /// Iteration cap for iterative algorithms.
    pub max_iter: usize,
    /// Centroid shift tolerance.
    pub tol: f64,
    /// Mini-batch size.
    pub batch_size: usize,
    /// DBSCAN neighborhood radius.
    pub dbscan_eps: f64,
    /// DBSCAN core-point neighbor count, the point itself included.
    pub dbscan_min_samples: usize,
    /// Mean shift flat-kernel bandwidth.
    pub mean_shift_bandwidth: f64,
    /// Neighbors in the spectral affinity graph.
    pub spectral_neighbors: usize,
    /// Reject unknown algorithm selectors instead of falling back to plain k-means.
    /// Applies to CLI and library selectors only; `[evaluation] algorithms` is
    /// always parsed strictly.
    pub strict_selector: bool,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            n_clusters: 32,
            seed: 0,
            kmeans_restarts: 25,
            max_iter: 300,
            tol: 1e-4,
            batch_size: 16,
            dbscan_eps: 2.5,
            dbscan_min_samples: 5,
            mean_shift_bandwidth: 2.0,
            spectral_neighbors: 10,
            strict_selector: true,
        }
    }
}

impl ClusteringConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.n_clusters == 0 {
            return Err("n_clusters must be at least 1".into());
        }
        if self.kmeans_restarts == 0 {
            return Err("kmeans_restarts must be at least 1".into());
        }
        if self.max_iter == 0 {
            return Err("max_iter must be at least 1".into());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".into());
        }
        if self.dbscan_eps.is_nan() || self.dbscan_eps <= 0.0 {
            return Err(format!("dbscan_eps must be positive, got {}", self.dbscan_eps));
        }
        if self.dbscan_min_samples == 0 {
            return Err("dbscan_min_samples must be at least 1".into());
        }
        if self.mean_shift_bandwidth.is_nan() || self.mean_shift_bandwidth <= 0.0 {
            return Err(format!(
                "mean_shift_bandwidth must be positive, got {}",
                self.mean_shift_bandwidth
            ));
        }
        if self.spectral_neighbors == 0 {
            return Err("spectral_neighbors must be at least 1".into());
        }
        Ok(())
    }
}

/// Evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Algorithms to score, in report order.
    ///
    /// Names are always resolved strictly: an unknown name fails config loading
    /// even when `strict_selector` is off.
    pub algorithms: Vec<Algorithm>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            algorithms: Algorithm::EVALUATED.to_vec(),
        }
    }
}

impl EvaluationConfig {
    /// Check the algorithm list.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.algorithms.is_empty() {
            return Err("algorithms must not be empty".into());
        }
        Ok(())
    }
}

/// Output rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Group name for clusters holding no taxonomy member.
    pub unclassified_label: String,
    /// Membership matrix cell for a member group.
    pub member_marker: String,
    /// Membership matrix cell for a non-member group.
    pub non_member_marker: String,
    /// Keywords kept per cluster profile.
    pub top_keywords: usize,
    /// Name tokens ignored by keyword summaries.
    pub stop_words: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            unclassified_label: crate::reconciliation::UNCLASSIFIED.to_string(),
            member_marker: "✅".to_string(),
            non_member_marker: "🕸️".to_string(),
            top_keywords: 10,
            stop_words: Vec::new(),
        }
    }
}

impl ReportConfig {
    /// Check label and marker values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.unclassified_label.trim().is_empty() {
            return Err("unclassified_label must not be empty".into());
        }
        if self.member_marker == self.non_member_marker {
            return Err("member_marker and non_member_marker must differ".into());
        }
        Ok(())
    }
}

//! # foodcluster
//!
//! Nutrition-based food clustering with food-group label reconciliation.
//!
//! Foods are clustered on four features (protein, total fat, carbohydrates,
//! alcohol). Each cluster is then named after the reference food groups whose
//! representative foods landed in it, and a group-by-cluster membership matrix
//! shows how well the clustering recovers the taxonomy. A separate evaluation
//! path scores each algorithm against an authoritatively labeled dataset.
//!
//! | Stage | Module |
//! |-------|--------|
//! | CSV to feature matrix | [`features`] |
//! | Algorithms | [`cluster`], dispatched by [`engine`] |
//! | Cluster naming | [`reconciliation`] with [`taxonomy`] |
//! | Scoring | [`evaluation`] over [`metrics`] |
//! | Profiles and output | [`summary`], [`report`] |
//!
//! [`Pipeline`] wires the stages together from a [`PipelineConfig`].

pub mod cluster;
pub mod config;
pub mod engine;
/// Error types used across `foodcluster`.
pub mod error;
pub mod evaluation;
pub mod features;
pub mod metrics;
pub mod pipeline;
pub mod reconciliation;
pub mod report;
pub mod summary;
pub mod taxonomy;


pub use config::PipelineConfig;
pub use engine::{Algorithm, ClusterAssignment, ClusterId, ClusteringEngine, NOISE};
pub use error::{Error, Result};
pub use evaluation::{evaluate, score, ScoreRecord};
pub use features::{FeatureTable, FoodRecord, GroundTruth};
pub use pipeline::{Labeling, Pipeline};
pub use reconciliation::{
    reconcile, GroupMembershipMatrix, LabeledRecord, MembershipRule, Reconciliation,
};
pub use summary::{ClusterProfile, Summarizer};
pub use taxonomy::Taxonomy;

pub use metrics::{ami, ari, completeness, fowlkes_mallows, homogeneity, v_measure};

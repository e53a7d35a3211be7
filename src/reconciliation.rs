//! Label reconciliation: naming clusters after reference food groups.
//!
//! Each taxonomy entry points at a representative food. The cluster that food
//! landed in is the entry's **home cluster**. A cluster takes the names of
//! every entry homed in it (joined with [`NAME_SEPARATOR`], in taxonomy
//! order); clusters with no entry are named with the unclassified label.
//! Several names on one cluster mean the algorithm merged reference groups.
//!
//! The [`GroupMembershipMatrix`] then records, for each reference group and
//! cluster, whether the cluster's name registers that group. How a name
//! "registers" a group is a [`MembershipRule`]:
//!
//! | Rule | Member when |
//! |------|-------------|
//! | [`SubstringMembership`] (default) | the group name occurs anywhere in the cluster name |
//! | [`ExactMembership`] | the group name equals one of the joined names |
//!
//! Substring matching over-reports when one group name contains another
//! ("milk" inside "milk products"). Use [`reconcile_with`] and
//! [`ExactMembership`] to avoid it.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::engine::{ClusterAssignment, ClusterId, NOISE};
use crate::error::{Error, Result};
use crate::features::{FeatureTable, FoodRecord};
use crate::taxonomy::Taxonomy;

/// Name of clusters that hold no taxonomy entry.
pub const UNCLASSIFIED: &str = "unclassified";

/// Joins group names that share a home cluster.
pub const NAME_SEPARATOR: &str = "\n";

/// Decides whether a cluster's (possibly joined) name registers a group.
pub trait MembershipRule {
    /// True if `cluster_name` registers `group`.
    fn is_member(&self, group: &str, cluster_name: &str) -> bool;
}

/// Substring test on the joined cluster name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMembership;

impl MembershipRule for SubstringMembership {
    fn is_member(&self, group: &str, cluster_name: &str) -> bool {
        cluster_name.contains(group)
    }
}

/// Exact match against the individual joined names.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMembership;

impl MembershipRule for ExactMembership {
    fn is_member(&self, group: &str, cluster_name: &str) -> bool {
        cluster_name.split(NAME_SEPARATOR).any(|name| name == group)
    }
}

/// A food record with its cluster and resolved group name.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    /// Source record.
    pub record: FoodRecord,
    /// Assigned cluster id; [`NOISE`] for density outliers.
    pub cluster: ClusterId,
    /// Resolved name, never empty.
    pub group_name: String,
}

/// Reference group × cluster membership table.
///
/// Rows are the distinct taxonomy group names in taxonomy order; columns are
/// the distinct cluster ids of the assignment, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMembershipMatrix {
    groups: Vec<String>,
    clusters: Vec<ClusterId>,
    cells: Vec<Vec<bool>>,
}

impl GroupMembershipMatrix {
    /// Row labels.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Column labels.
    pub fn clusters(&self) -> &[ClusterId] {
        &self.clusters
    }

    /// Cells, one row per group.
    pub fn cells(&self) -> &[Vec<bool>] {
        &self.cells
    }

    /// Membership of one cell; false for unknown groups or clusters.
    pub fn is_member(&self, group: &str, cluster: ClusterId) -> bool {
        let Some(row) = self.groups.iter().position(|g| g == group) else {
            return false;
        };
        let Ok(col) = self.clusters.binary_search(&cluster) else {
            return false;
        };
        self.cells[row][col]
    }

    /// Clusters registering `group`, ascending.
    pub fn clusters_for(&self, group: &str) -> Vec<ClusterId> {
        let Some(row) = self.groups.iter().position(|g| g == group) else {
            return Vec::new();
        };
        self.clusters
            .iter()
            .zip(&self.cells[row])
            .filter(|&(_, &member)| member)
            .map(|(&c, _)| c)
            .collect()
    }
}

/// Output of one reconciliation run.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    records: Vec<LabeledRecord>,
    cluster_names: BTreeMap<ClusterId, String>,
    matrix: GroupMembershipMatrix,
    unplaced: Vec<i64>,
}

impl Reconciliation {
    /// Labeled records in feature-table order.
    pub fn records(&self) -> &[LabeledRecord] {
        &self.records
    }

    /// Resolved name per cluster id present in the assignment.
    pub fn cluster_names(&self) -> &BTreeMap<ClusterId, String> {
        &self.cluster_names
    }

    /// Resolved name of one cluster.
    pub fn cluster_name(&self, cluster: ClusterId) -> Option<&str> {
        self.cluster_names.get(&cluster).map(String::as_str)
    }

    /// Membership matrix.
    pub fn matrix(&self) -> &GroupMembershipMatrix {
        &self.matrix
    }

    /// Taxonomy ids whose representative record was labeled noise.
    pub fn unplaced(&self) -> &[i64] {
        &self.unplaced
    }
}

/// Reconcile with [`SubstringMembership`].
pub fn reconcile(
    table: &FeatureTable,
    assignment: &ClusterAssignment,
    taxonomy: &Taxonomy,
    unclassified: &str,
) -> Result<Reconciliation> {
    reconcile_with(table, assignment, taxonomy, unclassified, &SubstringMembership)
}

/// Name every cluster of `assignment` and build the membership matrix.
///
/// The home cluster of a taxonomy entry is the cluster of the first record
/// (in table order) carrying the entry's id. Noise never takes a name.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `assignment` is not row-aligned with `table`.
/// - [`Error::MissingTaxonomyRecord`] if a taxonomy id matches no record.
pub fn reconcile_with(
    table: &FeatureTable,
    assignment: &ClusterAssignment,
    taxonomy: &Taxonomy,
    unclassified: &str,
    rule: &dyn MembershipRule,
) -> Result<Reconciliation> {
    let records = table.records();
    let labels = assignment.labels();
    if records.len() != labels.len() {
        return Err(Error::DimensionMismatch {
            expected: records.len(),
            found: labels.len(),
        });
    }

    // Home cluster per taxonomy entry.
    let mut homed: BTreeMap<ClusterId, Vec<&str>> = BTreeMap::new();
    let mut unplaced = Vec::new();
    for entry in taxonomy.entries() {
        let row = records
            .iter()
            .position(|r| r.id == entry.id)
            .ok_or(Error::MissingTaxonomyRecord { id: entry.id })?;
        let cluster = labels[row];
        if cluster == NOISE {
            warn!(
                id = entry.id,
                group = %entry.name,
                "taxonomy record is noise, group left unplaced"
            );
            unplaced.push(entry.id);
            continue;
        }
        debug!(id = entry.id, group = %entry.name, cluster, "home cluster");
        let names = homed.entry(cluster).or_default();
        if !names.contains(&entry.name.as_str()) {
            names.push(&entry.name);
        }
    }

    let clusters = assignment.cluster_ids();
    let cluster_names: BTreeMap<ClusterId, String> = clusters
        .iter()
        .map(|&c| {
            let name = match homed.get(&c) {
                Some(names) => names.join(NAME_SEPARATOR),
                None => unclassified.to_string(),
            };
            (c, name)
        })
        .collect();

    let labeled: Vec<LabeledRecord> = records
        .iter()
        .zip(labels)
        .map(|(record, &cluster)| LabeledRecord {
            record: record.clone(),
            cluster,
            group_name: cluster_names
                .get(&cluster)
                .cloned()
                .unwrap_or_else(|| unclassified.to_string()),
        })
        .collect();

    let groups: Vec<String> = taxonomy
        .unique_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let cells: Vec<Vec<bool>> = groups
        .iter()
        .map(|group| {
            clusters
                .iter()
                .map(|c| homed.contains_key(c) && rule.is_member(group, &cluster_names[c]))
                .collect()
        })
        .collect();

    let multi = homed.values().filter(|names| names.len() > 1).count();
    info!(
        algorithm = %assignment.algorithm(),
        clusters = clusters.len(),
        named = homed.len(),
        merged = multi,
        unplaced = unplaced.len(),
        "reconciled cluster labels"
    );

    Ok(Reconciliation {
        records: labeled,
        cluster_names,
        matrix: GroupMembershipMatrix {
            groups,
            clusters,
            cells,
        },
        unplaced,
    })
}

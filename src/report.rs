//! CSV output artifacts.
//!
//! | Writer | One row per | Columns |
//! |--------|-------------|---------|
//! | [`write_labeled`] | food record | id, name, nutrients, cluster, group_name |
//! | [`write_membership`] | reference group | group, then one column per cluster id |
//! | [`write_profiles`] | cluster | cluster, group_name, size, mean nutrients, keywords |
//! | [`write_scores`] | algorithm | algorithm, ari, fowlkes_mallows, ami, v_measure |
//!
//! All files have a header row. Group names that join several reference
//! groups contain line breaks and are quoted.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::engine::ClusterId;
use crate::error::Result;
use crate::evaluation::ScoreRecord;
use crate::reconciliation::{GroupMembershipMatrix, LabeledRecord};
use crate::summary::ClusterProfile;

#[derive(Serialize)]
struct LabeledRow<'a> {
    id: i64,
    name: &'a str,
    protein: f64,
    total_fat: f64,
    carbohydrates: f64,
    alcohol: f64,
    food_energy: Option<f64>,
    cluster: ClusterId,
    group_name: &'a str,
}

#[derive(Serialize)]
struct ProfileRow<'a> {
    cluster: ClusterId,
    group_name: &'a str,
    size: usize,
    protein: f64,
    total_fat: f64,
    carbohydrates: f64,
    alcohol: f64,
    food_energy: Option<f64>,
    keywords: String,
}

/// Labeled table.
pub fn write_labeled<W: Write>(writer: W, records: &[LabeledRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for labeled in records {
        let r = &labeled.record;
        csv.serialize(LabeledRow {
            id: r.id,
            name: &r.name,
            protein: r.protein,
            total_fat: r.total_fat,
            carbohydrates: r.carbohydrates,
            alcohol: r.alcohol,
            food_energy: r.food_energy,
            cluster: labeled.cluster,
            group_name: &labeled.group_name,
        })?;
    }
    csv.flush()?;
    Ok(())
}

/// Membership matrix with marker cells.
pub fn write_membership<W: Write>(
    writer: W,
    matrix: &GroupMembershipMatrix,
    member_marker: &str,
    non_member_marker: &str,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["group".to_string()];
    header.extend(matrix.clusters().iter().map(ClusterId::to_string));
    csv.write_record(&header)?;

    for (group, row) in matrix.groups().iter().zip(matrix.cells()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(group.as_str());
        record.extend(
            row.iter()
                .map(|&member| if member { member_marker } else { non_member_marker }),
        );
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}

/// Score table.
pub fn write_scores<W: Write>(writer: W, scores: &[ScoreRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in scores {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

/// Cluster profiles; keywords as space-separated `word:count`.
pub fn write_profiles<W: Write>(writer: W, profiles: &[ClusterProfile]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for p in profiles {
        let keywords = p
            .keywords
            .iter()
            .map(|k| format!("{}:{}", k.word, k.count))
            .collect::<Vec<_>>()
            .join(" ");
        csv.serialize(ProfileRow {
            cluster: p.cluster,
            group_name: &p.group_name,
            size: p.size,
            protein: p.protein,
            total_fat: p.total_fat,
            carbohydrates: p.carbohydrates,
            alcohol: p.alcohol,
            food_energy: p.food_energy,
            keywords,
        })?;
    }
    csv.flush()?;
    Ok(())
}

/// Create `path` (and its parent directory) and hand a writer to `write`.
pub fn to_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(File) -> Result<()>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write(File::create(path)?)
}

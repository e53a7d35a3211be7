//! Reference food-group taxonomy.
//!
//! An ordered list of (record id, group name) pairs. Each id names a
//! representative food whose cluster becomes the group's home cluster. Order
//! is significant: it decides how names concatenate when several groups share
//! a cluster.

use std::path::Path;

use tracing::info;

use crate::config::Schema;
use crate::error::{Error, Result};
use crate::features::{parse_id, RawTable};

/// One taxonomy entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyEntry {
    /// Identifier of the representative food record.
    pub id: i64,
    /// Canonical group name.
    pub name: String,
}

/// Immutable reference taxonomy.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    entries: Vec<TaxonomyEntry>,
}

impl Taxonomy {
    /// Build from (id, name) pairs, in order.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] on a repeated id or a blank name.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        let mut entries: Vec<TaxonomyEntry> = Vec::new();
        for (id, name) in pairs {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(Error::Config(format!("taxonomy id {id} has an empty name")));
            }
            if entries.iter().any(|e| e.id == id) {
                return Err(Error::Config(format!("taxonomy id {id} appears more than once")));
            }
            entries.push(TaxonomyEntry { id, name });
        }
        Ok(Self { entries })
    }

    /// Read from a raw table using the schema's taxonomy columns.
    pub fn from_table(table: &RawTable, schema: &Schema) -> Result<Self> {
        let cols = table.require(&[schema.taxonomy_id.as_str(), schema.taxonomy_name.as_str()])?;
        let (id_col, name_col) = (cols[0], cols[1]);

        let mut pairs = Vec::with_capacity(table.n_rows());
        for row in 0..table.n_rows() {
            let raw = table.cell(row, id_col);
            let id = parse_id(raw).ok_or_else(|| Error::InvalidValue {
                row: row + 1,
                column: schema.taxonomy_id.clone(),
                value: raw.to_string(),
            })?;
            pairs.push((id, table.cell(row, name_col).to_string()));
        }
        Self::from_pairs(pairs)
    }

    /// Read a taxonomy CSV file.
    pub fn from_path(path: impl AsRef<Path>, schema: &Schema) -> Result<Self> {
        let path = path.as_ref();
        let taxonomy = Self::from_table(&RawTable::from_path(path)?, schema)?;
        info!(path = %path.display(), entries = taxonomy.len(), "loaded taxonomy");
        Ok(taxonomy)
    }

    /// Entries in taxonomy order.
    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    /// Group names in taxonomy order, first occurrence of each.
    pub fn unique_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !names.contains(&entry.name.as_str()) {
                names.push(&entry.name);
            }
        }
        names
    }

    /// Name for an id, if present.
    pub fn name_of(&self, id: i64) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the taxonomy has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_keeps_order() {
        let taxonomy = Taxonomy::from_pairs([(3, "dairy"), (1, "bread"), (2, "dairy")]).unwrap();
        assert_eq!(taxonomy.len(), 3);
        assert_eq!(taxonomy.entries()[0].id, 3);
        assert_eq!(taxonomy.unique_names(), vec!["dairy", "bread"]);
        assert_eq!(taxonomy.name_of(1), Some("bread"));
        assert_eq!(taxonomy.name_of(9), None);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = Taxonomy::from_pairs([(1, "a"), (1, "b")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(Taxonomy::from_pairs([(1, "  ")]).is_err());
    }

    #[test]
    fn test_from_table_float_ids() {
        let text = "id,name\n56208068.0,fish\n50010,bread\n";
        let raw = RawTable::from_reader(text.as_bytes()).unwrap();
        let taxonomy = Taxonomy::from_table(&raw, &Schema::default()).unwrap();
        assert_eq!(taxonomy.entries()[0].id, 56208068);
        assert_eq!(taxonomy.entries()[1].name, "bread");
    }

    #[test]
    fn test_from_table_missing_column() {
        let raw = RawTable::from_reader("id,label\n1,x\n".as_bytes()).unwrap();
        let err = Taxonomy::from_table(&raw, &Schema::default()).unwrap_err();
        assert!(err.is_data_error());
    }
}

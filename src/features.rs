//! Feature extraction from raw nutrition tables.
//!
//! A raw table is any column-name-keyed CSV. Extraction keeps the three
//! macronutrients plus alcohol as the clustering input and carries the
//! identifier, display name and food energy alongside so that results can be
//! rejoined after clustering.
//!
//! # Missing values
//!
//! | Column | Missing cell |
//! |--------|--------------|
//! | `protein`, `total_fat`, `carbohydrates` | row dropped |
//! | `alcohol` | treated as `0.0` |
//! | energy | kept as `None` |
//!
//! A cell counts as missing when it is empty or one of `NaN`, `nan`, `NA`, `N/A`.
//! Present numeric cells must be finite and non-negative.

use std::io::Read;
use std::path::Path;

use ndarray::Array2;
use tracing::{debug, info};

use crate::config::Schema;
use crate::error::{Error, Result};

/// Macronutrient columns, in feature order.
pub const MACRONUTRIENTS: [&str; 3] = ["protein", "total_fat", "carbohydrates"];

/// Alcohol column; optional in the input schema.
pub const ALCOHOL: &str = "alcohol";

/// Number of clustering features per record.
pub const N_FEATURES: usize = 4;

/// A column-name-keyed table of raw string cells.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table from headers and rows.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Read a CSV with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    /// Read a CSV file with a header row.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        debug!(path = %path.display(), rows = table.n_rows(), "read raw table");
        Ok(table)
    }

    /// Column names.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by exact name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at (row, col); short rows read as empty.
    pub(crate) fn cell(&self, row: usize, col: usize) -> &str {
        self.rows[row].get(col).map(String::as_str).unwrap_or("")
    }

    pub(crate) fn require(&self, names: &[&str]) -> Result<Vec<usize>> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| self.column(n).is_none())
            .map(|n| n.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingColumns { columns: missing });
        }
        Ok(names.iter().filter_map(|n| self.column(n)).collect())
    }
}

/// One food item with its macronutrient profile.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodRecord {
    /// Domain identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Protein (g).
    pub protein: f64,
    /// Total fat (g).
    pub total_fat: f64,
    /// Carbohydrates (g).
    pub carbohydrates: f64,
    /// Alcohol (g), zero when absent from the source.
    pub alcohol: f64,
    /// Food energy, when present in the source.
    pub food_energy: Option<f64>,
}

impl FoodRecord {
    /// The clustering input for this record: protein, fat, carbohydrates, alcohol.
    pub fn features(&self) -> [f64; N_FEATURES] {
        [self.protein, self.total_fat, self.carbohydrates, self.alcohol]
    }
}

/// Extracted records, row-aligned with the feature matrix.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    records: Vec<FoodRecord>,
    dropped: usize,
}

impl FeatureTable {
    /// Build a table directly from records.
    pub fn from_records(records: Vec<FoodRecord>) -> Self {
        Self {
            records,
            dropped: 0,
        }
    }

    /// Records in input row order.
    pub fn records(&self) -> &[FoodRecord] {
        &self.records
    }

    /// Number of records kept.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no record survived extraction.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows dropped for missing macronutrients.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Identifier column.
    pub fn ids(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.id).collect()
    }

    /// n × 4 matrix of (protein, total_fat, carbohydrates, alcohol).
    pub fn matrix(&self) -> Array2<f64> {
        features_to_matrix(self.records.iter().map(FoodRecord::features))
    }
}

/// Ground-truth dataset for extrinsic evaluation.
#[derive(Debug, Clone)]
pub struct GroundTruth {
    features: Array2<f64>,
    labels: Vec<String>,
}

impl GroundTruth {
    /// Build from a feature matrix and its row-aligned labels.
    pub fn new(features: Array2<f64>, labels: Vec<String>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(Error::DimensionMismatch {
                expected: features.nrows(),
                found: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    /// n × 4 feature matrix.
    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    /// Authoritative group label per row.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labeled rows.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Extract clustering records from a raw nutrition table.
///
/// Rows missing any macronutrient are dropped; missing alcohol is imputed as
/// zero. The identifier column is required; name and energy columns are
/// optional and read as empty/`None` when absent.
///
/// # Errors
///
/// - [`Error::MissingColumns`] if a macronutrient or the identifier column is absent.
/// - [`Error::InvalidValue`] if a present, non-missing cell does not parse.
pub fn extract(table: &RawTable, schema: &Schema) -> Result<FeatureTable> {
    let mut required: Vec<&str> = MACRONUTRIENTS.to_vec();
    required.push(schema.id.as_str());
    let cols = table.require(&required)?;
    let (macro_cols, id_col) = (&cols[..3], cols[3]);
    let alcohol_col = table.column(ALCOHOL);
    let name_col = table.column(&schema.name);
    let energy_col = table.column(&schema.energy);

    let mut records = Vec::with_capacity(table.n_rows());
    let mut dropped = 0;

    for row in 0..table.n_rows() {
        let Some(macros) = read_macros(table, row, macro_cols)? else {
            dropped += 1;
            continue;
        };
        let id_raw = table.cell(row, id_col);
        let id = parse_id(id_raw).ok_or_else(|| Error::InvalidValue {
            row: row + 1,
            column: schema.id.clone(),
            value: id_raw.to_string(),
        })?;
        let alcohol = match alcohol_col {
            Some(c) => parse_number(table, row, c)?.unwrap_or(0.0),
            None => 0.0,
        };
        let food_energy = match energy_col {
            Some(c) => parse_number(table, row, c)?,
            None => None,
        };
        let name = name_col
            .map(|c| table.cell(row, c).to_string())
            .unwrap_or_default();

        records.push(FoodRecord {
            id,
            name,
            protein: macros[0],
            total_fat: macros[1],
            carbohydrates: macros[2],
            alcohol,
            food_energy,
        });
    }

    info!(
        kept = records.len(),
        dropped, "extracted nutrition records"
    );
    Ok(FeatureTable { records, dropped })
}

/// Extract the labeled evaluation dataset.
///
/// Same missing-value policy as [`extract`]; rows with an empty label are
/// dropped as well. No identifier column is needed.
pub fn extract_ground_truth(table: &RawTable, schema: &Schema) -> Result<GroundTruth> {
    let mut required: Vec<&str> = MACRONUTRIENTS.to_vec();
    required.push(schema.label.as_str());
    let cols = table.require(&required)?;
    let (macro_cols, label_col) = (&cols[..3], cols[3]);
    let alcohol_col = table.column(ALCOHOL);

    let mut rows = Vec::with_capacity(table.n_rows());
    let mut labels = Vec::with_capacity(table.n_rows());
    let mut dropped = 0usize;

    for row in 0..table.n_rows() {
        let label = table.cell(row, label_col);
        let macros = read_macros(table, row, macro_cols)?;
        let (Some(m), false) = (macros, is_missing(label)) else {
            dropped += 1;
            continue;
        };
        let alcohol = match alcohol_col {
            Some(c) => parse_number(table, row, c)?.unwrap_or(0.0),
            None => 0.0,
        };
        rows.push([m[0], m[1], m[2], alcohol]);
        labels.push(label.to_string());
    }

    info!(kept = labels.len(), dropped, "extracted ground truth");
    GroundTruth::new(features_to_matrix(rows.into_iter()), labels)
}

fn features_to_matrix(rows: impl Iterator<Item = [f64; N_FEATURES]>) -> Array2<f64> {
    let flat: Vec<f64> = rows.flatten().collect();
    let n = flat.len() / N_FEATURES;
    Array2::from_shape_vec((n, N_FEATURES), flat)
        .unwrap_or_else(|_| Array2::zeros((0, N_FEATURES)))
}

fn read_macros(table: &RawTable, row: usize, cols: &[usize]) -> Result<Option<[f64; 3]>> {
    let mut out = [0.0; 3];
    for (slot, &c) in out.iter_mut().zip(cols) {
        match parse_number(table, row, c)? {
            Some(v) => *slot = v,
            None => return Ok(None),
        }
    }
    Ok(Some(out))
}

fn parse_number(table: &RawTable, row: usize, col: usize) -> Result<Option<f64>> {
    let raw = table.cell(row, col);
    if is_missing(raw) {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
        _ => Err(Error::InvalidValue {
            row: row + 1,
            column: table.headers[col].clone(),
            value: raw.to_string(),
        }),
    }
}

/// Identifiers are integral but often exported as floats ("56208068.0").
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

fn is_missing(raw: &str) -> bool {
    matches!(raw, "" | "NaN" | "nan" | "NA" | "N/A")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> RawTable {
        RawTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_extract_drops_missing_macros_and_imputes_alcohol() {
        let raw = table(
            "smlmitzrach,shmmitzrach,protein,total_fat,carbohydrates,alcohol,food_energy\n\
             1,bread,8.0,1.0,50.0,,250\n\
             2,broken,,1.0,2.0,0,10\n\
             3,wine,0.1,0.0,2.6,10.6,83\n",
        );
        let features = extract(&raw, &Schema::default()).unwrap();

        assert_eq!(features.len(), 2);
        assert_eq!(features.dropped(), 1);
        assert_eq!(features.ids(), vec![1, 3]);
        assert_eq!(features.records()[0].alcohol, 0.0);
        assert_eq!(features.records()[1].alcohol, 10.6);
        assert_eq!(features.records()[1].name, "wine");
        assert_eq!(features.records()[0].food_energy, Some(250.0));
    }

    #[test]
    fn test_extract_matrix_alignment() {
        let raw = table(
            "smlmitzrach,protein,total_fat,carbohydrates\n\
             10,1,2,3\n\
             20,4,5,6\n",
        );
        let features = extract(&raw, &Schema::default()).unwrap();
        let m = features.matrix();

        assert_eq!(m.shape(), &[2, 4]);
        assert_eq!(m.row(1).to_vec(), vec![4.0, 5.0, 6.0, 0.0]);
        // name/energy columns absent
        assert_eq!(features.records()[0].name, "");
        assert_eq!(features.records()[0].food_energy, None);
    }

    #[test]
    fn test_extract_missing_macro_column_is_data_error() {
        let raw = table("smlmitzrach,protein,carbohydrates\n1,2,3\n");
        let err = extract(&raw, &Schema::default()).unwrap_err();

        assert!(err.is_data_error());
        match err {
            Error::MissingColumns { columns } => assert_eq!(columns, vec!["total_fat"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extract_unparseable_cell() {
        let raw = table("smlmitzrach,protein,total_fat,carbohydrates\n1,abc,2,3\n");
        let err = extract(&raw, &Schema::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { row: 1, .. }));
    }

    #[test]
    fn test_extract_rejects_infinite_and_negative_values() {
        let raw = table("smlmitzrach,protein,total_fat,carbohydrates\n1,1,inf,3\n");
        match extract(&raw, &Schema::default()).unwrap_err() {
            Error::InvalidValue { row, column, value } => {
                assert_eq!((row, column.as_str(), value.as_str()), (1, "total_fat", "inf"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let raw = table(
            "smlmitzrach,protein,total_fat,carbohydrates,alcohol\n\
             1,1,2,3,0\n\
             2,1,2,3,-0.5\n",
        );
        assert!(matches!(
            extract(&raw, &Schema::default()),
            Err(Error::InvalidValue { row: 2, .. })
        ));

        let raw = table("protein,total_fat,carbohydrates,SubFoodGroupLabel\n-1,2,3,a\n");
        assert!(extract_ground_truth(&raw, &Schema::default()).is_err());
    }

    #[test]
    fn test_float_formatted_ids() {
        assert_eq!(parse_id("56208068.0"), Some(56208068));
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id("4.5"), None);
    }

    #[test]
    fn test_ground_truth_extraction() {
        let raw = table(
            "protein,total_fat,carbohydrates,alcohol,SubFoodGroupLabel\n\
             1,1,1,,a\n\
             2,2,2,0,\n\
             3,3,3,1,b\n",
        );
        let truth = extract_ground_truth(&raw, &Schema::default()).unwrap();

        assert_eq!(truth.len(), 2);
        assert_eq!(truth.labels(), &["a".to_string(), "b".to_string()]);
        assert_eq!(truth.features()[[0, 3]], 0.0);
        assert_eq!(truth.features()[[1, 3]], 1.0);
    }
}

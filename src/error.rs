use thiserror::Error;

/// Result alias for `foodcluster`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by feature extraction, clustering, reconciliation and reporting.
#[derive(Debug, Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Matrix or label-array dimension mismatch.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Invalid number of clusters requested.
    #[error("cannot create {requested} clusters from {n_items} items")]
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of items.
        n_items: usize,
    },

    /// An iterative solver did not converge within its iteration limit.
    #[error("did not converge after {iterations} iterations")]
    ConvergenceFailure {
        /// Number of iterations attempted.
        iterations: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// Required columns are absent from the input schema.
    #[error("missing required columns: {}", columns.join(", "))]
    MissingColumns {
        /// Names of the absent columns.
        columns: Vec<String>,
    },

    /// A taxonomy entry references a record that is not in the feature table.
    #[error("taxonomy id {id} has no matching record in the feature table")]
    MissingTaxonomyRecord {
        /// The unmatched identifier.
        id: i64,
    },

    /// A non-empty cell could not be parsed.
    #[error("row {row}, column '{column}': cannot parse '{value}'")]
    InvalidValue {
        /// 1-based data row (header excluded).
        row: usize,
        /// Column name.
        column: String,
        /// Offending raw cell.
        value: String,
    },

    /// Strict algorithm selector did not name a known algorithm.
    #[error("unknown clustering algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// Configuration could not be read or failed validation.
    #[error("config error: {0}")]
    Config(String),

    /// Dense decomposition failed.
    #[error("linear algebra failure: {0}")]
    LinearAlgebra(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV read/write failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    /// True for the data-error family: bad schema, unparseable cells, or unmatched taxonomy ids.
    ///
    /// These are unrecoverable for the run and are never retried.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::MissingColumns { .. }
                | Error::MissingTaxonomyRecord { .. }
                | Error::InvalidValue { .. }
        )
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("Source '{source_name}' has no sheet or header row")]
    EmptySource { source_name: String },

    #[error("Missing required column '{column}' in '{source_name}'")]
    MissingColumn { source_name: String, column: String },

    #[error("Invalid value in '{source_name}' row {row}, column '{column}': {value}")]
    InvalidCell {
        source_name: String,
        row: usize,
        column: String,
        value: String,
    },
}

impl EtlError {
    /// True for failures raised by the relational engine itself.
    pub fn is_database(&self) -> bool {
        matches!(self, EtlError::Database(_))
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

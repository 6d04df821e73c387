use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaintenanceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Table '{0}' does not exist in the database")]
    MissingTable(String),

    #[error("Spreadsheet '{0}' has no usable worksheet")]
    EmptySheet(String),

    #[error("Header mismatch in column {column}: expected '{expected}', found '{found}'")]
    HeaderMismatch {
        column: usize,
        expected: String,
        found: String,
    },
}

pub type Result<T> = std::result::Result<T, MaintenanceError>;

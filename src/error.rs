use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Source '{source_name}' is missing expected column '{column}'")]
    MissingColumn { source_name: String, column: String },

    #[error("Shared column '{column}' is absent from source '{source_name}'")]
    SchemaMismatch { source_name: String, column: String },

    #[error("Shared column '{0}' is declared more than once")]
    DuplicateColumn(String),

    #[error("Header of '{}' does not match the shared layout: expected '{expected}', found '{found}'", path.display())]
    HeaderMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

pub type Result<T> = std::result::Result<T, EtlError>;

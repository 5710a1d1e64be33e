use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DocmergeError {
    #[error("data source is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("failed to read data source: {0}")]
    DataSource(String),

    #[error("invalid template document: {0}")]
    Template(String),

    #[error("malformed XML in '{part}': {reason}")]
    Xml { part: String, reason: String },

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid placeholder pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("unresolved placeholder(s): {}", .0.join(", "))]
    UnresolvedPlaceholders(Vec<String>),

    #[error("failed to load config from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

//! Filter document loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::FilterDocument;
use crate::config::validation::{validate_document, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate a filter document from a JSON file.
pub fn load_document(path: &Path) -> Result<FilterDocument, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_document(&content)
}

/// Parse and validate a filter document from its JSON text.
pub fn parse_document(content: &str) -> Result<FilterDocument, ConfigError> {
    let document: FilterDocument = serde_json::from_str(content)?;
    validate_document(&document).map_err(ConfigError::Validation)?;
    Ok(document)
}

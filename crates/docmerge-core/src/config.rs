use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DocmergeError;
use crate::naming::{CollisionPolicy, FilenamePolicy};

/// What happens to a placeholder that has no matching column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPlaceholderPolicy {
    /// Leave the marker in the output verbatim.
    #[default]
    Keep,
    /// Leave the marker and record a warning for the row.
    Warn,
    /// Fail the row.
    Fail,
}

/// Settings for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Columns the data source must have before any row is processed.
    pub required_columns: Vec<String>,
    pub filename: FilenamePolicy,
    /// Spreadsheet sheet to read; the first sheet when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub missing_placeholders: MissingPlaceholderPolicy,
    pub collisions: CollisionPolicy,
}

/// Load a batch config from a JSON file.
pub fn load_config(path: &Path) -> Result<BatchConfig, DocmergeError> {
    let content = std::fs::read_to_string(path).map_err(|e| DocmergeError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let config: BatchConfig =
        serde_json::from_str(&content).map_err(|e| DocmergeError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse a batch config from a JSON string (no file path context).
pub fn parse_config_str(json: &str) -> Result<BatchConfig, DocmergeError> {
    let config: BatchConfig = serde_json::from_str(json)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate that a config is usable.
pub fn validate_config(config: &BatchConfig) -> Result<(), DocmergeError> {
    if config.required_columns.iter().any(|c| c.trim().is_empty()) {
        return Err(DocmergeError::ConfigInvalid(
            "required column names must not be blank".into(),
        ));
    }

    match &config.filename {
        FilenamePolicy::Template { template } => {
            if template.trim().is_empty() {
                return Err(DocmergeError::ConfigInvalid(
                    "filename template must not be empty".into(),
                ));
            }
        }
        FilenamePolicy::Columns { columns } => {
            if columns.iter().any(|c| c.trim().is_empty()) {
                return Err(DocmergeError::ConfigInvalid(
                    "filename column names must not be blank".into(),
                ));
            }
        }
    }

    if let Some(sheet) = &config.sheet {
        if sheet.trim().is_empty() {
            return Err(DocmergeError::ConfigInvalid(
                "sheet name must not be blank".into(),
            ));
        }
    }

    Ok(())
}

/// Split a comma-separated column list into trimmed, non-empty names.
pub fn parse_column_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config = parse_config_str("{}").unwrap();
        assert_eq!(config, BatchConfig::default());
        assert_eq!(config.missing_placeholders, MissingPlaceholderPolicy::Keep);
        assert_eq!(config.collisions, CollisionPolicy::Suffix);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "required_columns": ["case", "client"],
            "filename": { "mode": "template", "template": "{{case}}-{{client}}" },
            "sheet": "Data",
            "missing_placeholders": "warn",
            "collisions": "overwrite"
        }"#;
        let config = parse_config_str(json).unwrap();
        assert_eq!(config.required_columns, vec!["case", "client"]);
        assert_eq!(config.sheet.as_deref(), Some("Data"));
        assert_eq!(config.missing_placeholders, MissingPlaceholderPolicy::Warn);
        assert_eq!(config.collisions, CollisionPolicy::Overwrite);
        assert!(matches!(config.filename, FilenamePolicy::Template { .. }));
    }

    #[test]
    fn test_empty_template_rejected() {
        let json = r#"{ "filename": { "mode": "template", "template": "  " } }"#;
        assert!(matches!(
            parse_config_str(json),
            Err(DocmergeError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_blank_required_column_rejected() {
        assert!(parse_config_str(r#"{ "required_columns": ["a", ""] }"#).is_err());
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(parse_config_str(r#"{ "missing_placeholders": "explode" }"#).is_err());
    }

    #[test]
    fn test_load_config_reports_path() {
        let err = load_config(Path::new("/nonexistent/docmerge.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/docmerge.json"));
    }

    #[test]
    fn test_parse_column_list() {
        assert_eq!(parse_column_list("a, b,,c ,"), vec!["a", "b", "c"]);
        assert!(parse_column_list("  ").is_empty());
    }
}

use std::collections::BTreeSet;

use serde::Serialize;

use crate::document::docx::DocxPackage;
use crate::error::DocmergeError;
use crate::placeholder::find_all;

/// Every placeholder name used anywhere the walker looks in `template`.
pub fn inspect_template(template: &[u8]) -> Result<BTreeSet<String>, DocmergeError> {
    let package = DocxPackage::open(template)?;
    let names = package
        .document()
        .blocks()
        .into_iter()
        .flat_map(|block| find_all(&block.text()))
        .collect();
    Ok(names)
}

/// How a template's placeholders line up with a data source's columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateComparison {
    /// Placeholders no column will fill; they stay in the output verbatim.
    pub unresolved: Vec<String>,
    /// Columns the template never mentions.
    pub unused_columns: Vec<String>,
}

impl TemplateComparison {
    pub fn is_exact(&self) -> bool {
        self.unresolved.is_empty() && self.unused_columns.is_empty()
    }
}

pub fn compare_with_columns(
    placeholders: &BTreeSet<String>,
    columns: &[String],
) -> TemplateComparison {
    TemplateComparison {
        unresolved: placeholders
            .iter()
            .filter(|name| !columns.contains(name))
            .cloned()
            .collect(),
        unused_columns: columns
            .iter()
            .filter(|col| !placeholders.contains(*col))
            .cloned()
            .collect(),
    }
}

//! Output file names.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::DocmergeError;
use crate::model::RowRecord;
use crate::substitute::Replacements;

/// Extension of every generated document.
pub const OUTPUT_EXTENSION: &str = "docx";

/// Name used when a row yields nothing usable.
pub const DEFAULT_STEM: &str = "generated_document";

/// Longest stem kept, in characters, before the extension is added.
pub const MAX_STEM_CHARS: usize = 100;

const ILLEGAL_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];
const PART_SEPARATOR: &str = "_";
const FALLBACK_PARTS: usize = 3;
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// How a row's output file is named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum FilenamePolicy {
    /// Substitute the row into a template using the placeholder syntaxes,
    /// then append the generation time.
    Template { template: String },
    /// Join the values of these columns.
    Columns {
        #[serde(default)]
        columns: Vec<String>,
    },
}

impl Default for FilenamePolicy {
    fn default() -> Self {
        FilenamePolicy::Columns {
            columns: Vec::new(),
        }
    }
}

/// What to do when two rows produce the same file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// `name.docx`, `name_2.docx`, `name_3.docx`, ... in row order.
    #[default]
    Suffix,
    /// Reuse the name; the later document replaces the earlier one.
    Overwrite,
}

/// Build the sanitized stem (no extension) for one row.
pub fn synthesize_stem(
    policy: &FilenamePolicy,
    row: &RowRecord,
    generated_at: NaiveDateTime,
) -> Result<String, DocmergeError> {
    let raw = match policy {
        FilenamePolicy::Template { template } => {
            let substituted = Replacements::from_row(row)?.apply(template);
            format!("{substituted}_{}", generated_at.format(TIMESTAMP_FORMAT))
        }
        FilenamePolicy::Columns { columns } => column_stem(columns, row),
    };
    Ok(sanitize(&raw))
}

fn column_stem(columns: &[String], row: &RowRecord) -> String {
    let mut parts: Vec<&str> = columns
        .iter()
        .filter_map(|col| row.get(col))
        .filter(|value| !value.trim().is_empty())
        .collect();

    if parts.is_empty() {
        parts = row
            .iter()
            .map(|(_, value)| value)
            .filter(|value| !value.trim().is_empty())
            .take(FALLBACK_PARTS)
            .collect();
    }

    if parts.is_empty() {
        return DEFAULT_STEM.to_string();
    }
    parts.join(PART_SEPARATOR)
}

/// Strip characters illegal in common filesystems, trim, and cap the length.
///
/// Control characters are stripped as well. An input that sanitizes to
/// nothing becomes [`DEFAULT_STEM`].
pub fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect();
    let stem: String = cleaned.trim().chars().take(MAX_STEM_CHARS).collect();
    let stem = stem.trim_end();
    if stem.is_empty() {
        DEFAULT_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// Hands out final file names for a batch, applying the collision policy.
///
/// Names are compared case-insensitively so the result is safe on
/// case-insensitive filesystems too.
#[derive(Debug, Default)]
pub struct NameRegistry {
    policy: CollisionPolicy,
    taken: HashMap<String, usize>,
}

impl NameRegistry {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            taken: HashMap::new(),
        }
    }

    /// Final file name for `stem`, extension included, reserved at once.
    pub fn claim(&mut self, stem: &str) -> String {
        let claim = self.propose(stem);
        self.commit(&claim);
        claim.filename()
    }

    /// The name `stem` would get next, without reserving it.
    pub fn propose(&self, stem: &str) -> NameClaim {
        let key = stem.to_lowercase();
        if self.policy == CollisionPolicy::Overwrite {
            return NameClaim {
                key,
                candidate: stem.to_string(),
                count: 0,
            };
        }

        let mut candidate = stem.to_string();
        let mut count = self.taken.get(&key).copied().unwrap_or(0);
        while self.taken.contains_key(&candidate.to_lowercase()) {
            count += 1;
            let suffix = format!("_{}", count + 1);
            let room = MAX_STEM_CHARS.saturating_sub(suffix.chars().count());
            let base: String = stem.chars().take(room).collect();
            candidate = format!("{base}{suffix}");
        }
        NameClaim {
            key,
            candidate,
            count,
        }
    }

    /// Reserve a proposed name.
    pub fn commit(&mut self, claim: &NameClaim) {
        if self.policy == CollisionPolicy::Overwrite {
            return;
        }
        self.taken.insert(claim.key.clone(), claim.count);
        self.taken
            .entry(claim.candidate.to_lowercase())
            .or_insert(0);
    }
}

/// A file name proposed by [`NameRegistry::propose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameClaim {
    key: String,
    candidate: String,
    count: usize,
}

impl NameClaim {
    pub fn filename(&self) -> String {
        with_extension(&self.candidate)
    }
}

pub fn with_extension(stem: &str) -> String {
    format!("{stem}.{OUTPUT_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    fn row(pairs: &[(&str, &str)]) -> RowRecord {
        pairs.iter().copied().collect()
    }

    #[test]
    fn template_policy_substitutes_and_timestamps() {
        let policy = FilenamePolicy::Template {
            template: "Invoice-{{id}}-${client}".into(),
        };
        let stem = synthesize_stem(&policy, &row(&[("id", "7"), ("client", "ACME")]), at()).unwrap();
        assert_eq!(stem, "Invoice-7-ACME_20240309_140507");
    }

    #[test]
    fn template_policy_strips_illegal_characters() {
        let policy = FilenamePolicy::Template {
            template: "Invoice/<{{id}}>".into(),
        };
        let stem = synthesize_stem(&policy, &row(&[("id", "7")]), at()).unwrap();
        let name = with_extension(&stem);
        assert!(!name.contains(['/', '<', '>']));
        assert!(name.ends_with(".docx"));
        assert!(name.chars().count() <= MAX_STEM_CHARS + ".docx".len());
        assert_eq!(stem, "Invoice7_20240309_140507");
    }

    #[test]
    fn columns_policy_joins_values() {
        let policy = FilenamePolicy::Columns {
            columns: vec!["case".into(), "missing".into(), "client".into()],
        };
        let r = row(&[("client", "ACME"), ("case", "C-1"), ("x", "y")]);
        assert_eq!(synthesize_stem(&policy, &r, at()).unwrap(), "C-1_ACME");
    }

    #[test]
    fn columns_policy_falls_back_to_first_non_empty_values() {
        let policy = FilenamePolicy::default();
        let r = row(&[("a", ""), ("b", "one"), ("c", "two"), ("d", " "), ("e", "three"), ("f", "four")]);
        assert_eq!(synthesize_stem(&policy, &r, at()).unwrap(), "one_two_three");
    }

    #[test]
    fn columns_policy_falls_back_when_listed_columns_are_empty() {
        let policy = FilenamePolicy::Columns {
            columns: vec!["a".into()],
        };
        let r = row(&[("a", ""), ("b", "x")]);
        assert_eq!(synthesize_stem(&policy, &r, at()).unwrap(), "x");
    }

    #[test]
    fn columns_policy_default_name() {
        let policy = FilenamePolicy::default();
        assert_eq!(
            synthesize_stem(&policy, &row(&[("a", "")]), at()).unwrap(),
            DEFAULT_STEM
        );
    }

    #[test]
    fn sanitize_truncates_before_extension() {
        let long = "x".repeat(250);
        let stem = sanitize(&long);
        assert_eq!(stem.chars().count(), MAX_STEM_CHARS);
        assert!(with_extension(&stem).ends_with(".docx"));
    }

    #[test]
    fn sanitize_counts_characters_not_bytes() {
        let stem = sanitize(&"案".repeat(120));
        assert_eq!(stem.chars().count(), MAX_STEM_CHARS);
    }

    #[test]
    fn sanitize_trims_and_defaults() {
        assert_eq!(sanitize("  a:b  "), "ab");
        assert_eq!(sanitize("???"), DEFAULT_STEM);
    }

    #[test]
    fn registry_suffixes_collisions_in_order() {
        let mut names = NameRegistry::new(CollisionPolicy::Suffix);
        assert_eq!(names.claim("report"), "report.docx");
        assert_eq!(names.claim("Report"), "Report_2.docx");
        assert_eq!(names.claim("report"), "report_3.docx");
        assert_eq!(names.claim("other"), "other.docx");
    }

    #[test]
    fn registry_skips_names_already_taken_by_suffixing() {
        let mut names = NameRegistry::new(CollisionPolicy::Suffix);
        assert_eq!(names.claim("a_2"), "a_2.docx");
        assert_eq!(names.claim("a"), "a.docx");
        assert_eq!(names.claim("a"), "a_3.docx");
    }

    #[test]
    fn registry_propose_does_not_reserve() {
        let mut names = NameRegistry::new(CollisionPolicy::Suffix);
        let first = names.propose("a");
        assert_eq!(first.filename(), "a.docx");
        assert_eq!(names.propose("a").filename(), "a.docx");
        names.commit(&first);
        assert_eq!(names.propose("A").filename(), "A_2.docx");
    }

    #[test]
    fn registry_overwrite_reuses_names() {
        let mut names = NameRegistry::new(CollisionPolicy::Overwrite);
        assert_eq!(names.claim("a"), "a.docx");
        assert_eq!(names.claim("a"), "a.docx");
    }

    #[test]
    fn policy_deserializes_from_tagged_json() {
        let p: FilenamePolicy =
            serde_json::from_str(r#"{"mode": "template", "template": "{{id}}"}"#).unwrap();
        assert_eq!(p, FilenamePolicy::Template { template: "{{id}}".into() });
        let p: FilenamePolicy = serde_json::from_str(r#"{"mode": "columns"}"#).unwrap();
        assert_eq!(p, FilenamePolicy::default());
    }
}

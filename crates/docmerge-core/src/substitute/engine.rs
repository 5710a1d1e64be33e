use crate::document::TextBlock;
use crate::error::DocmergeError;
use crate::model::RowRecord;
use crate::placeholder::{substitution_order, NameMatcher};

/// One column's value with its compiled matchers.
#[derive(Debug, Clone)]
struct Replacement {
    matcher: NameMatcher,
    value: String,
}

/// A row's values prepared for substitution.
///
/// Matchers are compiled once per row and kept in substitution order, so
/// the result never depends on the row's column order.
#[derive(Debug, Clone)]
pub struct Replacements {
    entries: Vec<Replacement>,
}

impl Replacements {
    pub fn from_row(row: &RowRecord) -> Result<Self, DocmergeError> {
        let mut entries = row
            .iter()
            .map(|(name, value)| {
                Ok(Replacement {
                    matcher: NameMatcher::new(name)?,
                    value: value.to_string(),
                })
            })
            .collect::<Result<Vec<_>, DocmergeError>>()?;
        entries.sort_by(|a, b| substitution_order(a.matcher.name(), b.matcher.name()));
        Ok(Self { entries })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.matcher.name() == name)
    }

    /// Names, in substitution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.matcher.name())
    }

    /// Names present in `text` in at least one syntax, in substitution order.
    pub fn present_in(&self, text: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.matcher.is_present(text))
            .map(|e| e.matcher.name())
            .collect()
    }

    /// Replace every known name in `text`, without a presence check.
    pub fn apply(&self, text: &str) -> String {
        apply_entries(text, self.entries.iter())
    }
}

fn apply_entries<'a>(text: &str, entries: impl Iterator<Item = &'a Replacement>) -> String {
    let mut out = text.to_string();
    for entry in entries {
        out = entry.matcher.replace_all(&out, &entry.value).into_owned();
    }
    out
}

/// Outcome of substituting one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    /// Nothing matched; the block was not touched.
    Unchanged,
    /// The block was rewritten into its first run.
    Rewritten,
}

/// Substitute every placeholder of `block` that `values` knows about.
///
/// A block without any known placeholder is left exactly as it was, runs
/// and all. Otherwise the runs' text is flattened, substituted and put back
/// with [`TextBlock::collapse_to_single_style`]. Markers naming unknown
/// columns stay in the text verbatim.
pub fn substitute_block(block: &mut TextBlock, values: &Replacements) -> Substitution {
    let text = block.text();
    let present: Vec<&Replacement> = values
        .entries
        .iter()
        .filter(|e| e.matcher.is_present(&text))
        .collect();
    if present.is_empty() {
        return Substitution::Unchanged;
    }

    let substituted = apply_entries(&text, present.into_iter());
    block.collapse_to_single_style(substituted);
    Substitution::Rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Run, RunStyle};

    fn row(pairs: &[(&str, &str)]) -> Replacements {
        Replacements::from_row(&pairs.iter().copied().collect()).unwrap()
    }

    #[test]
    fn block_without_known_names_is_untouched() {
        let original = TextBlock::new(vec![
            Run::new(RunStyle::new("<w:rPr><w:b/></w:rPr>"), "Hello "),
            Run::plain("{{other}}"),
        ]);
        let mut block = original.clone();
        let outcome = substitute_block(&mut block, &row(&[("name", "Alice")]));
        assert_eq!(outcome, Substitution::Unchanged);
        assert_eq!(block, original);
        assert!(!block.is_rewritten());
    }

    #[test]
    fn substitutes_mixed_syntaxes_into_single_run() {
        let mut block = TextBlock::new(vec![
            Run::plain("Hello {{na"),
            Run::plain("me}}, total "),
            Run::plain("${amt}"),
        ]);
        let outcome = substitute_block(&mut block, &row(&[("name", "Alice"), ("amt", "42")]));
        assert_eq!(outcome, Substitution::Rewritten);
        assert_eq!(block.text(), "Hello Alice, total 42");
        let non_empty = block.runs().iter().filter(|r| !r.text.is_empty()).count();
        assert_eq!(non_empty, 1);
        assert_eq!(block.runs().len(), 3);
    }

    #[test]
    fn result_independent_of_column_order() {
        for values in [row(&[("a", "X"), ("ab", "Y")]), row(&[("ab", "Y"), ("a", "X")])] {
            let mut block = TextBlock::new(vec![Run::plain("{{ab}}{{a}}")]);
            substitute_block(&mut block, &values);
            assert_eq!(block.text(), "YX");
        }
    }

    #[test]
    fn unknown_markers_stay_verbatim() {
        let mut block = TextBlock::new(vec![Run::plain("{{name}} owes [[debt]]")]);
        substitute_block(&mut block, &row(&[("name", "Bob")]));
        assert_eq!(block.text(), "Bob owes [[debt]]");
    }

    #[test]
    fn tolerates_padding_inside_markers() {
        let mut block = TextBlock::new(vec![Run::plain("{{  id }} / [[ id]]")]);
        substitute_block(&mut block, &row(&[("id", "7")]));
        assert_eq!(block.text(), "7 / 7");
    }

    #[test]
    fn block_without_runs_is_untouched() {
        let mut block = TextBlock::default();
        assert_eq!(substitute_block(&mut block, &row(&[("a", "1")])), Substitution::Unchanged);
        assert!(block.runs().is_empty());
    }

    #[test]
    fn apply_replaces_without_presence_check() {
        let values = row(&[("id", "7"), ("client", "ACME")]);
        assert_eq!(values.apply("Invoice-{{id}}-{client}"), "Invoice-7-ACME");
        assert_eq!(values.apply("plain"), "plain");
    }

    #[test]
    fn present_in_lists_only_matching_names() {
        let values = row(&[("id", "7"), ("client", "ACME")]);
        assert_eq!(values.present_in("for ${client}"), vec!["client"]);
        assert!(values.contains("id"));
    }
}

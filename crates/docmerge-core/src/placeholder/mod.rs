//! Placeholder grammar.
//!
//! Four marker syntaxes are recognized, always tried in this order:
//! `{{name}}`, `${name}`, `{name}`, `[[name]]`. Whitespace just inside the
//! markers is ignored, so `{{ name }}` names the same placeholder.

use regex::{NoExpand, Regex};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::error::DocmergeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
    DoubleBrace,
    DollarBrace,
    SingleBrace,
    DoubleBracket,
}

impl Syntax {
    /// Every syntax, in priority order.
    pub const ALL: [Syntax; 4] = [
        Syntax::DoubleBrace,
        Syntax::DollarBrace,
        Syntax::SingleBrace,
        Syntax::DoubleBracket,
    ];

    pub fn open(self) -> &'static str {
        match self {
            Syntax::DoubleBrace => "{{",
            Syntax::DollarBrace => "${",
            Syntax::SingleBrace => "{",
            Syntax::DoubleBracket => "[[",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            Syntax::DoubleBrace => "}}",
            Syntax::DollarBrace | Syntax::SingleBrace => "}",
            Syntax::DoubleBracket => "]]",
        }
    }

    /// Render `name` in this syntax.
    pub fn wrap(self, name: &str) -> String {
        format!("{}{}{}", self.open(), name, self.close())
    }

    fn pattern_with(self, interior: &str) -> String {
        format!(
            r"{}\s*{}\s*{}",
            regex::escape(self.open()),
            interior,
            regex::escape(self.close())
        )
    }

    fn detector(self) -> &'static Regex {
        static DETECTORS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
            Syntax::ALL.map(|syntax| {
                Regex::new(&syntax.pattern_with("(.*?)")).expect("invalid placeholder pattern")
            })
        });
        &DETECTORS[self as usize]
    }

    /// Names of every occurrence of this syntax in `text`.
    ///
    /// Empty interiors and interiors that start with an opening marker
    /// character are discarded; the latter are artifacts of a shorter
    /// syntax matching inside a longer one (`{name` out of `{{name}}`).
    pub fn detect(self, text: &str) -> impl Iterator<Item = &str> {
        self.detector()
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|name| is_plain_name(name))
    }

    /// Matcher for exactly `name` in this syntax.
    pub fn literal(self, name: &str) -> Result<Regex, DocmergeError> {
        Ok(Regex::new(&self.pattern_with(&regex::escape(name)))?)
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with(['{', '['])
}

/// Every placeholder name appearing in `text`, across all syntaxes.
pub fn find_all(text: &str) -> BTreeSet<String> {
    Syntax::ALL
        .iter()
        .flat_map(|syntax| syntax.detect(text))
        .map(str::to_string)
        .collect()
}

/// Matchers for one placeholder name, one per syntax.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    name: String,
    literals: Vec<Regex>,
}

impl NameMatcher {
    pub fn new(name: &str) -> Result<Self, DocmergeError> {
        let literals = Syntax::ALL
            .iter()
            .map(|syntax| syntax.literal(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.to_string(),
            literals,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if any syntax wraps this name somewhere in `text`.
    pub fn is_present(&self, text: &str) -> bool {
        self.literals.iter().any(|re| re.is_match(text))
    }

    /// Replace every occurrence, syntax by syntax in priority order.
    ///
    /// `value` is inserted literally; `$` has no special meaning.
    pub fn replace_all<'t>(&self, text: &'t str, value: &str) -> Cow<'t, str> {
        let mut out = Cow::Borrowed(text);
        for re in &self.literals {
            let replaced = match re.replace_all(&out, NoExpand(value)) {
                Cow::Owned(s) => Some(s),
                Cow::Borrowed(_) => None,
            };
            if let Some(s) = replaced {
                out = Cow::Owned(s);
            }
        }
        out
    }
}

/// Deterministic substitution order: longer names first, then lexicographic.
pub fn substitution_order(a: &str, b: &str) -> std::cmp::Ordering {
    b.chars()
        .count()
        .cmp(&a.chars().count())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_all_covers_every_syntax() {
        let found = find_all("{{alpha}} ${beta} {gamma} [[delta]]");
        for name in ["alpha", "beta", "gamma", "delta"] {
            assert!(found.contains(name), "missing {name}");
        }
    }

    #[test]
    fn find_all_trims_interior_whitespace() {
        let found = find_all("Dear {{  client name }},");
        assert!(found.contains("client name"));
    }

    #[test]
    fn find_all_discards_empty_and_nested_artifacts() {
        let found = find_all("{{}} {  } {{x}}");
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn find_all_keeps_names_with_inner_brackets() {
        let found = find_all("{{amount [EUR]}} {{x}} [[ rate (pct) ]]");
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec!["amount [EUR]", "rate (pct)", "x"]
        );
    }

    #[test]
    fn find_all_deduplicates() {
        let found = find_all("{{id}} and ${id} and [[id]]");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn literal_escapes_meta_characters() {
        let m = NameMatcher::new("amount (EUR)").unwrap();
        assert!(m.is_present("Total: {{ amount (EUR) }}"));
        assert!(!m.is_present("Total: {{ amount EUR }}"));
    }

    #[test]
    fn literal_requires_outer_markers() {
        let m = NameMatcher::new("x").unwrap();
        assert!(!m.is_present("x and {y}"));
        assert!(m.is_present("[[ x ]]"));
    }

    #[test]
    fn replace_all_handles_every_syntax() {
        let m = NameMatcher::new("n").unwrap();
        let out = m.replace_all("{{n}}-${ n }-{n}-[[n]]", "7");
        assert_eq!(out, "7-7-7-7");
    }

    #[test]
    fn replace_all_double_brace_before_single() {
        let m = NameMatcher::new("n").unwrap();
        assert_eq!(m.replace_all("{{n}}", "v"), "v");
    }

    #[test]
    fn replace_all_inserts_value_literally() {
        let m = NameMatcher::new("price").unwrap();
        assert_eq!(m.replace_all("{{price}}", "$1.00"), "$1.00");
    }

    #[test]
    fn replace_all_borrows_when_absent() {
        let m = NameMatcher::new("price").unwrap();
        assert!(matches!(m.replace_all("no markers", "1"), Cow::Borrowed(_)));
    }

    #[test]
    fn substitution_order_longest_first() {
        let mut names = vec!["a", "abc", "ab", "b"];
        names.sort_by(|a, b| substitution_order(a, b));
        assert_eq!(names, vec!["abc", "ab", "a", "b"]);
    }

    #[test]
    fn wrap_renders_markers() {
        assert_eq!(Syntax::DollarBrace.wrap("x"), "${x}");
        assert_eq!(Syntax::DoubleBracket.wrap("x"), "[[x]]");
    }
}

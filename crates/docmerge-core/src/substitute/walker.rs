use std::collections::BTreeSet;

use crate::document::{DocumentTree, Story, Table, TextBlock};
use crate::placeholder::find_all;
use crate::substitute::engine::{substitute_block, Replacements, Substitution};

/// What a walk over one document did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkReport {
    pub blocks_visited: usize,
    pub blocks_rewritten: usize,
    /// Placeholder names found in the document with no matching value.
    pub unresolved: BTreeSet<String>,
}

/// Substitute every text block of `document`.
///
/// Order: body paragraphs, body tables (row, cell, paragraph, then nested
/// tables), then per section its headers and footers.
pub fn apply(document: &mut DocumentTree, values: &Replacements) -> WalkReport {
    let mut walker = Walker {
        values,
        report: WalkReport::default(),
    };
    walker.story(&mut document.body);
    for section in &mut document.sections {
        for story in section.headers.iter_mut().chain(section.footers.iter_mut()) {
            walker.story(story);
        }
    }
    walker.report
}

struct Walker<'a> {
    values: &'a Replacements,
    report: WalkReport,
}

impl Walker<'_> {
    fn story(&mut self, story: &mut Story) {
        for block in &mut story.paragraphs {
            self.block(block);
        }
        for table in &mut story.tables {
            self.table(table);
        }
    }

    fn table(&mut self, table: &mut Table) {
        for row in &mut table.rows {
            for cell in &mut row.cells {
                for block in &mut cell.paragraphs {
                    self.block(block);
                }
                for nested in &mut cell.tables {
                    self.table(nested);
                }
            }
        }
    }

    fn block(&mut self, block: &mut TextBlock) {
        self.report.blocks_visited += 1;
        let text = block.text();
        for name in find_all(&text) {
            if !self.values.contains(&name) {
                self.report.unresolved.insert(name);
            }
        }
        if substitute_block(block, self.values) == Substitution::Rewritten {
            self.report.blocks_rewritten += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Run, Section, TableCell, TableRow};
    use crate::model::RowRecord;

    fn para(text: &str) -> TextBlock {
        TextBlock::new(vec![Run::plain(text)])
    }

    fn values(pairs: &[(&str, &str)]) -> Replacements {
        let row: RowRecord = pairs.iter().copied().collect();
        Replacements::from_row(&row).unwrap()
    }

    #[test]
    fn walks_body_tables_headers_and_footers() {
        let mut doc = DocumentTree {
            body: Story {
                paragraphs: vec![para("Dear {{name}}"), para("no markers")],
                tables: vec![Table {
                    rows: vec![TableRow {
                        cells: vec![TableCell {
                            paragraphs: vec![para("[[id]]")],
                            tables: vec![Table {
                                rows: vec![TableRow {
                                    cells: vec![TableCell {
                                        paragraphs: vec![para("${id}")],
                                        tables: vec![],
                                    }],
                                }],
                            }],
                        }],
                    }],
                }],
            },
            sections: vec![Section {
                headers: vec![Story {
                    paragraphs: vec![para("Ref {id}")],
                    tables: vec![],
                }],
                footers: vec![Story {
                    paragraphs: vec![para("{{name}} / {{missing}}")],
                    tables: vec![],
                }],
            }],
        };

        let report = apply(&mut doc, &values(&[("name", "Ada"), ("id", "42")]));

        let texts: Vec<String> = doc.blocks().iter().map(|b| b.text()).collect();
        assert_eq!(
            texts,
            vec!["Dear Ada", "no markers", "42", "42", "Ref 42", "Ada / {{missing}}"]
        );
        assert_eq!(report.blocks_visited, 6);
        assert_eq!(report.blocks_rewritten, 5);
        assert_eq!(report.unresolved.into_iter().collect::<Vec<_>>(), vec!["missing"]);
    }

    #[test]
    fn sections_are_substituted_independently() {
        let mut doc = DocumentTree {
            body: Story::default(),
            sections: vec![
                Section {
                    headers: vec![Story {
                        paragraphs: vec![para("{{client}}")],
                        tables: vec![],
                    }],
                    footers: vec![],
                },
                Section {
                    headers: vec![],
                    footers: vec![Story {
                        paragraphs: vec![para("footer {{client}}")],
                        tables: vec![],
                    }],
                },
            ],
        };
        apply(&mut doc, &values(&[("client", "ACME")]));
        assert_eq!(doc.sections[0].headers[0].paragraphs[0].text(), "ACME");
        assert_eq!(doc.sections[1].footers[0].paragraphs[0].text(), "footer ACME");
    }
}

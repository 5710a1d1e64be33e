//! Format-independent document model: styled text blocks organized into
//! body, tables and per-section header/footer stories.

pub mod docx;

/// Style attributes of a run, kept as the container's raw property markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub raw: Option<String>,
}

impl RunStyle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
        }
    }
}

/// Position of a run inside its container part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunAnchor {
    pub start: usize,
    pub end: usize,
}

/// Position of a block inside its container part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockAnchor {
    pub part: usize,
    pub end: usize,
}

/// A contiguous span of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub style: RunStyle,
    pub text: String,
    pub(crate) anchor: Option<RunAnchor>,
}

impl Run {
    pub fn new(style: RunStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
            anchor: None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(RunStyle::default(), text)
    }
}

/// One paragraph's worth of styled text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlock {
    runs: Vec<Run>,
    rewritten: bool,
    pub(crate) anchor: Option<BlockAnchor>,
}

impl TextBlock {
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs,
            rewritten: false,
            anchor: None,
        }
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Logical text: every run's fragment, concatenated.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// True once [`collapse_to_single_style`](Self::collapse_to_single_style)
    /// has run on this block.
    pub fn is_rewritten(&self) -> bool {
        self.rewritten
    }

    /// Put all of `text` into the first run and empty every other run.
    ///
    /// Lossy: the first run's style now covers the whole text and the
    /// styles of later runs no longer apply to anything. Runs are never
    /// removed; a block without runs gets one unstyled run.
    pub fn collapse_to_single_style(&mut self, text: String) {
        match self.runs.split_first_mut() {
            Some((first, rest)) => {
                first.text = text;
                for run in rest {
                    run.text.clear();
                }
            }
            None => self.runs.push(Run::plain(text)),
        }
        self.rewritten = true;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCell {
    pub paragraphs: Vec<TextBlock>,
    /// Tables nested inside the cell.
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

/// A flow of paragraphs and tables: the body, a header or a footer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Story {
    pub paragraphs: Vec<TextBlock>,
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub headers: Vec<Story>,
    pub footers: Vec<Story>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentTree {
    pub body: Story,
    pub sections: Vec<Section>,
}

impl DocumentTree {
    /// Every block, in walk order.
    pub fn blocks(&self) -> Vec<&TextBlock> {
        let mut out = Vec::new();
        collect_story(&self.body, &mut out);
        for section in &self.sections {
            for story in section.headers.iter().chain(&section.footers) {
                collect_story(story, &mut out);
            }
        }
        out
    }
}

fn collect_story<'a>(story: &'a Story, out: &mut Vec<&'a TextBlock>) {
    out.extend(&story.paragraphs);
    for table in &story.tables {
        collect_table(table, out);
    }
}

fn collect_table<'a>(table: &'a Table, out: &mut Vec<&'a TextBlock>) {
    for row in &table.rows {
        for cell in &row.cells {
            out.extend(&cell.paragraphs);
            for nested in &cell.tables {
                collect_table(nested, out);
            }
        }
    }
}

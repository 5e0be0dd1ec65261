//! Rich-text document model shared by the template codec and the
//! substitution engine.
//!
//! A document is a tree of [`Block`]s. Paragraphs hold an ordered list of
//! [`Run`]s (text fragments with uniform formatting); tables hold rows of
//! cells, and every cell holds further blocks, so tables may nest.
//!
//! The concatenation of a paragraph's run texts is its *logical text*; the
//! substitution engine reasons about logical text only and writes results
//! back into the runs.

use std::ops::Range;

/// Opaque formatting attached to a run.
///
/// For `.docx` templates this is the raw `w:rPr` markup. The engine never
/// interprets it; it only decides which run keeps its formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFormat(Option<String>);

impl RunFormat {
    /// Formatting captured verbatim from the source document.
    pub fn from_markup(markup: impl Into<String>) -> Self {
        Self(Some(markup.into()))
    }

    /// Run with no explicit formatting.
    pub fn plain() -> Self {
        Self(None)
    }

    pub fn markup(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// A contiguous span of text carrying uniform formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub format: RunFormat,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: RunFormat::plain(),
        }
    }

    pub fn with_format(text: impl Into<String>, format: RunFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

/// Where the runs of a parsed paragraph live in the source markup.
///
/// Only the `.docx` codec fills this in; paragraphs built by hand carry
/// `None` and are never written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParagraphOrigin {
    pub(crate) runs: Vec<RunOrigin>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunOrigin {
    /// Byte ranges of the run's text, tab and line-break elements, in document order.
    pub(crate) text_spans: Vec<Range<usize>>,
    /// Byte offset just before the run's closing tag, if it has one.
    pub(crate) insert_at: Option<usize>,
    /// Element name prefix used by the run, e.g. `w`.
    pub(crate) prefix: String,
    /// Run text as it was parsed.
    pub(crate) original: String,
}

/// A text block: an ordered sequence of runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub(crate) origin: Option<ParagraphOrigin>,
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self { runs, origin: None }
    }

    /// Concatenated text of every run, in order.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCell {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

/// The body of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichTextDocument {
    pub blocks: Vec<Block>,
}

impl RichTextDocument {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Visit every paragraph exactly once: top-level paragraphs and tables
    /// in document order, descending into table rows, cells, and nested
    /// blocks.
    pub fn for_each_paragraph<'a>(&'a self, mut f: impl FnMut(&'a Paragraph)) {
        fn walk<'a>(blocks: &'a [Block], f: &mut impl FnMut(&'a Paragraph)) {
            for block in blocks {
                match block {
                    Block::Paragraph(p) => f(p),
                    Block::Table(t) => {
                        for row in &t.rows {
                            for cell in &row.cells {
                                walk(&cell.blocks, f);
                            }
                        }
                    }
                }
            }
        }
        walk(&self.blocks, &mut f);
    }

    /// Mutable counterpart of [`Self::for_each_paragraph`].
    pub fn for_each_paragraph_mut(&mut self, mut f: impl FnMut(&mut Paragraph)) {
        fn walk(blocks: &mut [Block], f: &mut impl FnMut(&mut Paragraph)) {
            for block in blocks {
                match block {
                    Block::Paragraph(p) => f(p),
                    Block::Table(t) => {
                        for row in &mut t.rows {
                            for cell in &mut row.cells {
                                walk(&mut cell.blocks, f);
                            }
                        }
                    }
                }
            }
        }
        walk(&mut self.blocks, &mut f);
    }

    /// Logical text of every paragraph, in visiting order.
    pub fn paragraph_texts(&self) -> Vec<String> {
        let mut texts = Vec::new();
        self.for_each_paragraph(|p| texts.push(p.text()));
        texts
    }

    /// Whether `needle` occurs inside a single paragraph's logical text.
    ///
    /// Occurrences split across paragraphs do not count.
    pub fn contains(&self, needle: &str) -> bool {
        let mut found = false;
        self.for_each_paragraph(|p| {
            if !found && p.text().contains(needle) {
                found = true;
            }
        });
        found
    }
}

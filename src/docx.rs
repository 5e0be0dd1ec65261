//! `.docx` template codec.
//!
//! [`DocxTemplate::from_bytes`] opens the package, locates the main document
//! part, and parses its body into a [`RichTextDocument`]. Each row gets its
//! own [`DocxDocument`] via [`DocxTemplate::instantiate`]; the package bytes
//! are shared, the body tree is an owned copy.
//!
//! A run's text covers its `w:t` elements plus tabs (`\t`) and line breaks
//! (`\n`, from `w:br` and `w:cr`). Page and column breaks are not text.
//!
//! Writing a row back does not re-serialise the XML tree. Only the text
//! content of runs whose text changed is rewritten in the original markup,
//! so everything the model does not capture (section properties, drawings,
//! fields, bookmarks) is carried over untouched.

use crate::document::{
    Block, Paragraph, ParagraphOrigin, RichTextDocument, Run, RunFormat, RunOrigin, Table,
    TableCell, TableRow,
};
use crate::error::BolError;
use crate::opc::{escape_text, Package, OFFICE_DOCUMENT_REL};
use roxmltree::Node;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, warn};

/// WordprocessingML main namespace.
const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug)]
struct TemplateSource {
    package: Package,
    document_part: String,
    document_xml: String,
}

/// A parsed Word template.
#[derive(Debug, Clone)]
pub struct DocxTemplate {
    source: Arc<TemplateSource>,
    body: RichTextDocument,
}

impl DocxTemplate {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BolError> {
        let invalid = |detail: String| BolError::InvalidTemplate { detail };

        let package = Package::from_bytes(bytes).map_err(invalid)?;
        let document_part = package
            .relationship_target("_rels/.rels", "", |_, ty| ty == OFFICE_DOCUMENT_REL)
            .map_err(invalid)?
            .unwrap_or_else(|| DEFAULT_DOCUMENT_PART.to_string());

        let document_xml = package
            .part_str(&document_part)
            .map_err(invalid)?
            .ok_or_else(|| invalid(format!("package has no '{document_part}' part")))?
            .to_string();

        let body = parse_body(&document_xml).map_err(invalid)?;
        debug!(
            "Template '{}': {} top-level blocks",
            document_part,
            body.blocks.len()
        );

        Ok(Self {
            source: Arc::new(TemplateSource {
                package,
                document_part,
                document_xml,
            }),
            body,
        })
    }

    pub fn body(&self) -> &RichTextDocument {
        &self.body
    }

    /// A fresh, independent copy of the template for one row.
    pub fn instantiate(&self) -> DocxDocument {
        DocxDocument {
            source: Arc::clone(&self.source),
            body: self.body.clone(),
        }
    }
}

/// One row's copy of the template.
#[derive(Debug, Clone)]
pub struct DocxDocument {
    source: Arc<TemplateSource>,
    pub body: RichTextDocument,
}

impl DocxDocument {
    /// Serialise as a `.docx` package.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BolError> {
        let xml = render_document_xml(&self.source.document_xml, &self.body);
        self.source
            .package
            .to_bytes_with(&[(self.source.document_part.as_str(), xml.as_bytes())])
            .map_err(|e| BolError::Internal(format!("failed to write .docx: {e}")))
    }
}

// ── Parsing ──────────────────────────────────────────────────────────────

fn is_w(node: &Node, name: &str) -> bool {
    node.is_element() && node.has_tag_name((W_NS, name))
}

fn parse_body(xml: &str) -> Result<RichTextDocument, String> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| format!("document part: {e}"))?;
    let body = doc
        .descendants()
        .find(|n| is_w(n, "body"))
        .ok_or_else(|| "document part has no w:body".to_string())?;
    Ok(RichTextDocument::new(parse_blocks(body, xml)))
}

fn parse_blocks(parent: Node, xml: &str) -> Vec<Block> {
    parent
        .children()
        .filter_map(|n| {
            if is_w(&n, "p") {
                Some(Block::Paragraph(parse_paragraph(n, xml)))
            } else if is_w(&n, "tbl") {
                Some(Block::Table(parse_table(n, xml)))
            } else {
                None
            }
        })
        .collect()
}

fn parse_table(tbl: Node, xml: &str) -> Table {
    let rows = tbl
        .children()
        .filter(|n| is_w(n, "tr"))
        .map(|tr| TableRow {
            cells: tr
                .children()
                .filter(|n| is_w(n, "tc"))
                .map(|tc| TableCell {
                    blocks: parse_blocks(tc, xml),
                })
                .collect(),
        })
        .collect();
    Table { rows }
}

fn parse_paragraph(p: Node, xml: &str) -> Paragraph {
    let mut runs = Vec::new();
    let mut origins = Vec::new();

    for r in p.children().filter(|n| is_w(n, "r")) {
        let format = r
            .children()
            .find(|n| is_w(n, "rPr"))
            .map(|n| RunFormat::from_markup(&xml[n.range()]))
            .unwrap_or_default();

        let mut text = String::new();
        let mut text_spans = Vec::new();
        for child in r.children().filter(|n| n.is_element()) {
            if let Some(content) = text_content(&child) {
                text.push_str(content);
                text_spans.push(child.range());
            }
        }

        let run_xml = &xml[r.range()];
        origins.push(RunOrigin {
            text_spans,
            insert_at: closing_tag_offset(run_xml).map(|off| r.range().start + off),
            prefix: element_prefix(run_xml).to_string(),
            original: text.clone(),
        });
        runs.push(Run::with_format(text, format));
    }

    Paragraph {
        runs,
        origin: Some(ParagraphOrigin { runs: origins }),
    }
}

/// Text contributed by one run child, `None` for non-text children.
fn text_content<'a>(child: &Node<'a, '_>) -> Option<&'a str> {
    if is_w(child, "t") {
        Some(child.text().unwrap_or(""))
    } else if is_w(child, "tab") {
        Some("\t")
    } else if is_w(child, "cr") {
        Some("\n")
    } else if is_w(child, "br") {
        // Only text-wrapping breaks are line breaks.
        match child.attribute((W_NS, "type")) {
            None | Some("textWrapping") => Some("\n"),
            Some(_) => None,
        }
    } else {
        None
    }
}

/// Offset of the closing tag inside an element's markup; `None` when
/// self-closing.
fn closing_tag_offset(element: &str) -> Option<usize> {
    if element.ends_with("/>") {
        None
    } else {
        element.rfind("</")
    }
}

/// Prefix of an element's qualified name (`w` in `<w:r ...>`), empty when
/// the element is unprefixed.
fn element_prefix(element: &str) -> &str {
    let name_end = element
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(element.len());
    let qname = element.get(1..name_end).unwrap_or("");
    qname.split_once(':').map(|(p, _)| p).unwrap_or("")
}

// ── Writing ──────────────────────────────────────────────────────────────

fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{prefix}:{local}")
    }
}

/// Run content markup for `text`: text elements with `\t` as `w:tab` and
/// `\n` as `w:br`.
fn run_content(prefix: &str, text: &str) -> String {
    let t = qualified(prefix, "t");
    let mut out = String::new();
    let mut segment = String::new();
    let flush = |segment: &mut String, out: &mut String| {
        if !segment.is_empty() {
            out.push_str(&format!(
                "<{t} xml:space=\"preserve\">{}</{t}>",
                escape_text(segment)
            ));
            segment.clear();
        }
    };
    for c in text.chars() {
        match c {
            '\t' => {
                flush(&mut segment, &mut out);
                out.push_str(&format!("<{}/>", qualified(prefix, "tab")));
            }
            '\n' => {
                flush(&mut segment, &mut out);
                out.push_str(&format!("<{}/>", qualified(prefix, "br")));
            }
            _ => segment.push(c),
        }
    }
    flush(&mut segment, &mut out);
    out
}

fn collect_edits(paragraph: &Paragraph, edits: &mut Vec<(Range<usize>, String)>) {
    let Some(origin) = &paragraph.origin else {
        return;
    };
    if paragraph.runs.len() > origin.runs.len() {
        warn!(
            "Paragraph gained {} runs after parsing; extra runs are not written",
            paragraph.runs.len() - origin.runs.len()
        );
    }

    for (i, run_origin) in origin.runs.iter().enumerate() {
        // Runs dropped from the model keep their element but lose their text.
        let text = paragraph.runs.get(i).map(|r| r.text.as_str()).unwrap_or("");
        if text == run_origin.original {
            continue;
        }

        match run_origin.text_spans.split_first() {
            Some((first, rest)) => {
                edits.push((first.clone(), run_content(&run_origin.prefix, text)));
                for span in rest {
                    edits.push((span.clone(), String::new()));
                }
            }
            None => match run_origin.insert_at {
                Some(at) => edits.push((at..at, run_content(&run_origin.prefix, text))),
                None => warn!(
                    "Run has no room for text; dropping {} characters",
                    text.chars().count()
                ),
            },
        }
    }
}

fn render_document_xml(xml: &str, body: &RichTextDocument) -> String {
    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    body.for_each_paragraph(|p| collect_edits(p, &mut edits));
    if edits.is_empty() {
        return xml.to_string();
    }
    edits.sort_by_key(|(range, _)| range.start);

    let mut out = String::with_capacity(xml.len() + 256);
    let mut cursor = 0;
    for (range, replacement) in edits {
        out.push_str(&xml[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&xml[cursor..]);
    out
}

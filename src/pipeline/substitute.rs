//! Placeholder substitution over run-fragmented paragraphs.
//!
//! Word splits text into runs wherever formatting (or an editor's undo
//! history) changes, so a marker like `Ship_date` may arrive as `Ship` +
//! `_date`. Matching therefore happens on each paragraph's logical text.
//!
//! When a paragraph contains at least one marker, its fully substituted text
//! is written into the first run and the remaining runs are dropped: the
//! whole paragraph takes the first run's formatting. Paragraphs without a
//! marker are not touched at all, so their run split and formatting survive
//! byte for byte.
//!
//! Each paragraph is matched on its own. A marker that straddles two
//! paragraphs is never replaced.

use crate::document::{Paragraph, RichTextDocument};
use crate::pipeline::placeholders::PlaceholderSet;

/// Replace every marker in every paragraph of `document`.
///
/// Returns the number of paragraphs that were rewritten.
pub fn substitute(document: &mut RichTextDocument, placeholders: &PlaceholderSet) -> usize {
    let mut rewritten = 0;
    document.for_each_paragraph_mut(|paragraph| {
        if substitute_paragraph(paragraph, placeholders) {
            rewritten += 1;
        }
    });
    rewritten
}

/// Apply all tokens to one paragraph. Returns whether it was rewritten.
pub fn substitute_paragraph(paragraph: &mut Paragraph, placeholders: &PlaceholderSet) -> bool {
    let mut text = paragraph.text();
    let mut replaced = false;

    for (token, value) in placeholders.iter() {
        if text.contains(token) {
            text = text.replace(token, value);
            replaced = true;
        }
    }

    if !replaced {
        return false;
    }

    // Zero runs: nothing to write into.
    if let Some(first) = paragraph.runs.first_mut() {
        first.text = text;
        paragraph.runs.truncate(1);
    }
    true
}

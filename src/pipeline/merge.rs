//! PDF concatenation: every rendered row, in sequence order, as one file.
//!
//! Merging is synchronous and CPU-bound; the batch pipeline runs it on the
//! blocking pool via `spawn_blocking`.

use crate::error::MergeError;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One row's rendered PDF, ready for merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunArtifact {
    pub sequence: usize,
    pub file_stem: String,
    #[serde(skip)]
    pub pdf: Vec<u8>,
}

/// Concatenates PDFs page-wise, preserving the order of `artifacts`.
pub trait PdfMerger: Send + Sync {
    fn merge(&self, artifacts: &[RunArtifact]) -> Result<Vec<u8>, MergeError>;
}

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Page-tree walks stop here; deeper chains are treated as broken.
const MAX_TREE_DEPTH: usize = 64;

/// Default merger backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfMerger;

impl PdfMerger for LopdfMerger {
    fn merge(&self, artifacts: &[RunArtifact]) -> Result<Vec<u8>, MergeError> {
        if artifacts.is_empty() {
            return Err(MergeError::Empty);
        }

        let mut merged = Document::with_version("1.7");
        let pages_id = merged.new_object_id();
        let mut kids: Vec<Object> = Vec::new();

        for artifact in artifacts {
            let unreadable = |detail: String| MergeError::Unreadable {
                sequence: artifact.sequence,
                detail,
            };
            let src = Document::load_mem(&artifact.pdf).map_err(|e| unreadable(e.to_string()))?;
            if src.is_encrypted() {
                return Err(MergeError::Encrypted {
                    sequence: artifact.sequence,
                });
            }

            let page_ids = import_pages(&mut merged, src).map_err(unreadable)?;
            if page_ids.is_empty() {
                return Err(unreadable("document has no pages".into()));
            }
            debug!(
                "Merging row {} ({}): {} page(s)",
                artifact.sequence,
                artifact.file_stem,
                page_ids.len()
            );

            for id in page_ids {
                let page = merged
                    .get_object_mut(id)
                    .and_then(Object::as_dict_mut)
                    .map_err(|e| unreadable(e.to_string()))?;
                page.set("Parent", pages_id);
                kids.push(Object::Reference(id));
            }
        }

        let count = kids.len() as i64;
        merged.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = merged.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        merged.trailer.set("Root", catalog_id);
        merged.prune_objects();
        merged.renumber_objects();
        merged.compress();

        let mut out = Vec::new();
        merged
            .save_to(&mut out)
            .map_err(|e| MergeError::WriteFailed {
                detail: e.to_string(),
            })?;
        Ok(out)
    }
}

/// Move every object of `src` into `dst` and return `src`'s page ids in
/// page order, renumbered into `dst`'s id space.
///
/// Inherited attributes are copied onto each page first, since pages are
/// re-parented under a single flat page tree.
fn import_pages(dst: &mut Document, mut src: Document) -> Result<Vec<ObjectId>, String> {
    flatten_inherited_attributes(&mut src)?;

    src.renumber_objects_with(dst.max_id + 1);
    let page_ids: Vec<ObjectId> = src.get_pages().values().copied().collect();
    if src.max_id > dst.max_id {
        dst.max_id = src.max_id;
    }
    dst.objects.extend(src.objects);
    Ok(page_ids)
}

fn flatten_inherited_attributes(doc: &mut Document) -> Result<(), String> {
    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    for page_id in page_ids {
        let page = doc.get_dictionary(page_id).map_err(|e| e.to_string())?;
        let inherited: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter(|key| page.get(key).is_err())
            .filter_map(|key| inherited_value(doc, page, key).map(|v| (*key, v)))
            .collect();
        if inherited.is_empty() {
            continue;
        }

        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| e.to_string())?;
        for (key, value) in inherited {
            page.set(key, value);
        }
    }
    Ok(())
}

fn inherited_value(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

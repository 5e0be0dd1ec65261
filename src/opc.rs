//! Minimal Open Packaging Conventions helpers: read and write the ZIP
//! container behind `.docx` / `.xlsx` files and follow relationships.

use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Relationship type of a package's main document part.
pub const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// Namespace of relationship part elements.
const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Every file part of a package, in archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(|e| e.to_string())?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| format!("{name}: {e}"))?;
            parts.push((name, data));
        }
        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_slice())
    }

    /// Part decoded as UTF-8 text.
    pub fn part_str(&self, name: &str) -> Result<Option<&str>, String> {
        self.part(name)
            .map(|d| std::str::from_utf8(d).map_err(|e| format!("{name}: {e}")))
            .transpose()
    }

    /// Re-zip the package, substituting `overrides` for the named parts.
    pub fn to_bytes_with(&self, overrides: &[(&str, &[u8])]) -> Result<Vec<u8>, String> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in &self.parts {
            let data = overrides
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, d)| *d)
                .unwrap_or(data.as_slice());
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| e.to_string())?;
            writer.write_all(data).map_err(|e| e.to_string())?;
        }
        let cursor = writer.finish().map_err(|e| e.to_string())?;
        Ok(cursor.into_inner())
    }

    /// Target of the first relationship of `rel_type` in `rels_part`,
    /// resolved against `base_dir` (e.g. `xl/`).
    pub fn relationship_target(
        &self,
        rels_part: &str,
        base_dir: &str,
        predicate: impl Fn(&str, &str) -> bool,
    ) -> Result<Option<String>, String> {
        let Some(xml) = self.part_str(rels_part)? else {
            return Ok(None);
        };
        let doc = roxmltree::Document::parse(xml).map_err(|e| format!("{rels_part}: {e}"))?;
        let target = doc
            .descendants()
            .filter(|n| n.has_tag_name((PACKAGE_REL_NS, "Relationship")))
            .find(|n| predicate(n.attribute("Id").unwrap_or(""), n.attribute("Type").unwrap_or("")))
            .and_then(|n| n.attribute("Target"))
            .map(|t| resolve_target(base_dir, t));
        Ok(target)
    }
}

/// Resolve a relationship target to a part name.
///
/// Absolute targets (`/xl/sheet1.xml`) drop the leading slash; relative ones
/// are joined to `base_dir` with `..` segments collapsed.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(abs) = target.strip_prefix('/') {
        return abs.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Escape character data for an XML text node.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

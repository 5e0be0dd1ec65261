//! `.xlsx` pickup-plan ingestion.
//!
//! Reads one worksheet into a [`RowSet`]: the first row with any non-empty
//! cell is the header, every later non-blank row is a record.

use crate::error::BolError;
use crate::opc::{Package, OFFICE_DOCUMENT_REL};
use crate::pipeline::rows::RowSet;
use roxmltree::Node;
use tracing::debug;

const DOC_REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const SHARED_STRINGS_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

/// Read the rows of `sheet_name` (or the first worksheet) from `.xlsx` bytes.
pub fn read_rows(bytes: &[u8], sheet_name: Option<&str>) -> Result<RowSet, BolError> {
    let package = Package::from_bytes(bytes).map_err(invalid)?;

    let workbook_part = package
        .relationship_target("_rels/.rels", "", |_, ty| ty == OFFICE_DOCUMENT_REL)
        .map_err(invalid)?
        .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string());
    let (base_dir, rels_part) = rels_location(&workbook_part);

    let workbook_xml = package
        .part_str(&workbook_part)
        .map_err(invalid)?
        .ok_or_else(|| invalid(format!("package has no '{workbook_part}' part")))?;
    let (name, rel_id) = pick_sheet(workbook_xml, sheet_name)?;

    let sheet_part = package
        .relationship_target(&rels_part, &base_dir, |id, _| id == rel_id)
        .map_err(invalid)?
        .ok_or_else(|| invalid(format!("worksheet '{name}' has no part")))?;

    let shared_part = package
        .relationship_target(&rels_part, &base_dir, |_, ty| ty == SHARED_STRINGS_REL)
        .map_err(invalid)?;
    let shared = match shared_part {
        Some(part) => match package.part_str(&part).map_err(invalid)? {
            Some(xml) => shared_strings(xml)?,
            None => Vec::new(),
        },
        None => Vec::new(),
    };

    let sheet_xml = package
        .part_str(&sheet_part)
        .map_err(invalid)?
        .ok_or_else(|| invalid(format!("package has no '{sheet_part}' part")))?;
    let grid = sheet_cells(sheet_xml, &shared)?;

    let mut rows = grid.into_iter().filter(|r| r.iter().any(|v| !v.is_empty()));
    let Some(header) = rows.next() else {
        debug!("Worksheet '{}' is empty", name);
        return Ok(RowSet::default());
    };

    let mut set = RowSet::new(header.into_iter().map(|h| h.trim().to_string()).collect());
    for values in rows {
        set.push_row(values);
    }
    debug!(
        "Worksheet '{}': {} columns, {} rows",
        name,
        set.columns().len(),
        set.len()
    );
    Ok(set)
}

fn invalid(detail: String) -> BolError {
    BolError::InvalidSpreadsheet { detail }
}

/// Directory of a part and the name of its relationships part.
fn rels_location(part: &str) -> (String, String) {
    match part.rsplit_once('/') {
        Some((dir, file)) => (format!("{dir}/"), format!("{dir}/_rels/{file}.rels")),
        None => (String::new(), format!("_rels/{part}.rels")),
    }
}

fn local(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// Worksheet name and relationship id of the requested (or first) sheet.
fn pick_sheet(workbook_xml: &str, wanted: Option<&str>) -> Result<(String, String), BolError> {
    let doc = roxmltree::Document::parse(workbook_xml)
        .map_err(|e| invalid(format!("workbook: {e}")))?;
    let mut sheets = doc.descendants().filter(|n| local(n, "sheet")).map(|n| {
        (
            n.attribute("name").unwrap_or("").to_string(),
            n.attribute((DOC_REL_NS, "id")).unwrap_or("").to_string(),
        )
    });

    match wanted {
        Some(wanted) => sheets
            .find(|(name, _)| name == wanted)
            .ok_or_else(|| invalid(format!("worksheet '{wanted}' not found"))),
        None => sheets
            .next()
            .ok_or_else(|| invalid("workbook has no worksheets".to_string())),
    }
}

fn shared_strings(xml: &str) -> Result<Vec<String>, BolError> {
    let doc =
        roxmltree::Document::parse(xml).map_err(|e| invalid(format!("shared strings: {e}")))?;
    Ok(doc
        .descendants()
        .filter(|n| local(n, "si"))
        .map(inline_text)
        .collect())
}

/// Text of a rich-text container (`si` or `is`): every `t` except phonetic
/// hints.
fn inline_text(node: Node) -> String {
    node.descendants()
        .filter(|n| local(n, "t"))
        .filter(|t| !t.ancestors().any(|a| local(&a, "rPh")))
        .filter_map(|t| t.text())
        .collect()
}

/// Columns in a worksheet (`A` through `XFD`).
const MAX_COLUMNS: usize = 16_384;

/// Zero-based column index of a cell reference such as `AB12`.
///
/// `Ok(None)` when the reference has no column letters; an error when the
/// column lies beyond `XFD`.
fn column_index(reference: &str) -> Result<Option<usize>, BolError> {
    let out_of_range = || invalid(format!("cell reference '{reference}' is beyond column XFD"));
    let mut n = 0usize;
    let mut letters = 0;
    for c in reference.chars().take_while(|c| c.is_ascii_alphabetic()) {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        n = n
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .filter(|v| *v <= MAX_COLUMNS)
            .ok_or_else(out_of_range)?;
        letters += 1;
    }
    Ok((letters > 0).then(|| n - 1))
}

/// Render a numeric cell the way it reads in the sheet: integral values
/// without a fractional part.
fn format_number(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Ok(v) => v.to_string(),
        Err(_) => raw.to_string(),
    }
}

fn cell_value(cell: Node, shared: &[String]) -> Result<String, BolError> {
    let v = cell
        .children()
        .find(|n| local(n, "v"))
        .and_then(|n| n.text())
        .unwrap_or("");

    let value = match cell.attribute("t").unwrap_or("n") {
        "s" => {
            if v.is_empty() {
                String::new()
            } else {
                let idx: usize = v
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("bad shared string index '{v}'")))?;
                shared
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| invalid(format!("shared string {idx} out of range")))?
            }
        }
        "inlineStr" => cell
            .children()
            .find(|n| local(n, "is"))
            .map(inline_text)
            .unwrap_or_default(),
        "b" => match v.trim() {
            "1" => "True".to_string(),
            "0" => "False".to_string(),
            other => other.to_string(),
        },
        "str" | "e" => v.to_string(),
        _ if v.is_empty() => String::new(),
        _ => format_number(v),
    };
    Ok(value)
}

/// Every row of the sheet as a dense vector of cell strings.
fn sheet_cells(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>, BolError> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| invalid(format!("worksheet: {e}")))?;
    let Some(sheet_data) = doc.descendants().find(|n| local(n, "sheetData")) else {
        return Ok(Vec::new());
    };

    let mut grid = Vec::new();
    for row in sheet_data.children().filter(|n| local(n, "row")) {
        let mut values: Vec<String> = Vec::new();
        for cell in row.children().filter(|n| local(n, "c")) {
            let col = match cell.attribute("r") {
                Some(r) => column_index(r)?,
                None => None,
            }
            .unwrap_or(values.len());
            if col >= MAX_COLUMNS {
                return Err(invalid(format!("row has more than {MAX_COLUMNS} cells")));
            }
            let value = cell_value(cell, shared)?;
            if values.len() <= col {
                values.resize(col + 1, String::new());
            }
            values[col] = value;
        }
        grid.push(values);
    }
    Ok(grid)
}

//! Shared fixtures: in-memory `.xlsx` and `.docx` packages and small PDFs.
#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};
use pickup_bol::RunContext;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub fn zip_parts(parts: &[(&str, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in parts {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub const ROOT_RELS_XLSX: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

/// Single-sheet workbook using inline strings.
pub fn xlsx(header: &[&str], rows: &[&[&str]]) -> Vec<u8> {
    let row_xml = |r: usize, values: &[&str]| {
        let cells: String = values
            .iter()
            .enumerate()
            .map(|(c, v)| {
                let col = (b'A' + c as u8) as char;
                format!(
                    r#"<c r="{col}{r}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    escape(v)
                )
            })
            .collect();
        format!(r#"<row r="{r}">{cells}</row>"#)
    };
    let mut sheet_rows = row_xml(1, header);
    for (i, values) in rows.iter().enumerate() {
        sheet_rows.push_str(&row_xml(i + 2, values));
    }

    zip_parts(&[
        ("_rels/.rels", ROOT_RELS_XLSX.to_string()),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Pickups" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
            ),
        ),
    ])
}

pub const CONTENT_TYPES_DOCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

pub const HEADER: [&str; 4] = ["Address", "Phone", "Note", "DSP"];

pub fn three_rows() -> Vec<u8> {
    xlsx(
        &HEADER,
        &[
            &["123 Main St", "555-1234", "Leave at door", "Acme/Logistics"],
            &["9 Elm Ave", "555-0000", "Gate code 42", "Beta"],
            &["1 Pier Rd", "555-9999", "", "Gamma\\East"],
        ],
    )
}

/// Template with every marker: the ship date split across two runs, the
/// pickup line inside a table cell.
pub fn template() -> Vec<u8> {
    let body = r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Ship date: Ship</w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t>_date</w:t></w:r></w:p><w:p><w:r><w:t xml:space="preserve">BOL#: </w:t></w:r><w:r><w:t>UNI-SEA-PICKUP-MM/DD/YYYY-SEQ</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>SEA-[pickup address]+TEPHONE+NOTE</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Carrier Name: GN GREENWHEELS INC.</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:r><w:rPr><w:u/></w:rPr><w:t>Static </w:t></w:r><w:r><w:t>footer</w:t></w:r></w:p>"#;
    zip_parts(&[
        ("[Content_Types].xml", CONTENT_TYPES_DOCX.to_string()),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#.to_string(),
        ),
        (
            "word/document.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
            ),
        ),
    ])
}

pub fn context() -> RunContext {
    RunContext::new("06/01/2024", "06/01/24")
}

pub fn one_page_pdf(width: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"0 0 m".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {},
        "MediaBox" => vec![0.into(), 0.into(), width.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

pub fn page_widths(pdf: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|id| {
            let page = doc.get_dictionary(*id).unwrap();
            page.get(b"MediaBox")
                .and_then(Object::as_array)
                .unwrap()[2]
                .as_i64()
                .unwrap()
        })
        .collect()
}


pub fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf).unwrap().get_pages().len()
}

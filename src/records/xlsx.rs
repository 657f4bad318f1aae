use std::io::{Read, Seek};
use std::path::Path;

use super::RecordSet;
use crate::error::Error;

const SML_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn sml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(SML_NS))
}

fn sml_children<'a>(
    node: roxmltree::Node<'a, 'a>,
    name: &'static str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'a>> {
    node.children()
        .filter(move |n| n.tag_name().name() == name && n.tag_name().namespace() == Some(SML_NS))
}

fn read_zip_text<R: Read + Seek>(zip: &mut zip::ZipArchive<R>, name: &str) -> Option<String> {
    let mut content = String::new();
    zip.by_name(name).ok()?.read_to_string(&mut content).ok()?;
    Some(content)
}

/// Read the first worksheet of an `.xlsx` workbook: row 1 is the header, every
/// following non-empty row is a record.
pub fn read_xlsx(path: &Path) -> Result<RecordSet, Error> {
    let file = std::fs::File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
    })?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|_| Error::Data(format!("{} is not an .xlsx workbook", path.display())))?;

    let rows = read_rows(&mut zip)?;
    let mut rows = rows.into_iter();
    let header = rows
        .next()
        .ok_or_else(|| Error::Data(format!("no data found in {}", path.display())))?;
    RecordSet::from_rows(header, rows.collect())
}

fn read_rows<R: Read + Seek>(
    zip: &mut zip::ZipArchive<R>,
) -> Result<Vec<Vec<String>>, Error> {
    let sheet_path = first_sheet_path(zip);
    let shared = read_shared_strings(zip);

    let xml_content = read_zip_text(zip, &sheet_path)
        .ok_or_else(|| Error::Data(format!("workbook has no worksheet at {sheet_path}")))?;
    let xml = roxmltree::Document::parse(&xml_content)?;
    let Some(sheet_data) = sml(xml.root_element(), "sheetData") else {
        return Ok(Vec::new());
    };

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut next_row = 1usize;
    for row in sml_children(sheet_data, "row") {
        let row_number = row
            .attribute("r")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(next_row);
        next_row = row_number + 1;

        let mut cells: Vec<String> = Vec::new();
        let mut next_col = 0usize;
        for c in sml_children(row, "c") {
            let col = c
                .attribute("r")
                .and_then(column_index)
                .unwrap_or(next_col);
            next_col = col + 1;
            let value = cell_value(c, &shared);
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value;
        }

        if cells.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        if rows.is_empty() && row_number != 1 {
            log::debug!("First non-empty worksheet row is {row_number}; using it as the header");
        }
        rows.push(cells);
    }
    Ok(rows)
}

fn first_sheet_path<R: Read + Seek>(zip: &mut zip::ZipArchive<R>) -> String {
    let fallback = "xl/worksheets/sheet1.xml".to_string();
    let Some(workbook) = read_zip_text(zip, "xl/workbook.xml") else {
        return fallback;
    };
    let Ok(xml) = roxmltree::Document::parse(&workbook) else {
        return fallback;
    };
    let Some(rid) = sml(xml.root_element(), "sheets")
        .and_then(|sheets| sml(sheets, "sheet"))
        .and_then(|sheet| sheet.attribute((REL_NS, "id")))
    else {
        return fallback;
    };
    let Some(rels) = read_zip_text(zip, "xl/_rels/workbook.xml.rels") else {
        return fallback;
    };
    let Ok(rels_xml) = roxmltree::Document::parse(&rels) else {
        return fallback;
    };
    rels_xml
        .root_element()
        .children()
        .find(|n| n.tag_name().name() == "Relationship" && n.attribute("Id") == Some(rid))
        .and_then(|n| n.attribute("Target"))
        .map(|target| match target.strip_prefix('/') {
            Some(abs) => abs.to_string(),
            None => format!("xl/{target}"),
        })
        .unwrap_or(fallback)
}

fn read_shared_strings<R: Read + Seek>(zip: &mut zip::ZipArchive<R>) -> Vec<String> {
    let Some(content) = read_zip_text(zip, "xl/sharedStrings.xml") else {
        return Vec::new();
    };
    let Ok(xml) = roxmltree::Document::parse(&content) else {
        return Vec::new();
    };
    sml_children(xml.root_element(), "si")
        .map(string_item_text)
        .collect()
}

/// Text of an `si`/`is` element: plain `t` or rich-text runs, phonetic hints skipped.
fn string_item_text(item: roxmltree::Node) -> String {
    let mut text = String::new();
    for child in item.children() {
        if child.tag_name().namespace() != Some(SML_NS) {
            continue;
        }
        match child.tag_name().name() {
            "t" => text.push_str(child.text().unwrap_or("")),
            "r" => {
                if let Some(t) = sml(child, "t") {
                    text.push_str(t.text().unwrap_or(""));
                }
            }
            _ => {}
        }
    }
    text
}

fn cell_value(c: roxmltree::Node, shared: &[String]) -> String {
    let raw = sml(c, "v").and_then(|v| v.text()).unwrap_or("");
    match c.attribute("t").unwrap_or("n") {
        "s" => raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared.get(i))
            .cloned()
            .unwrap_or_default(),
        "inlineStr" => sml(c, "is").map(string_item_text).unwrap_or_default(),
        "b" => if raw.trim() == "1" { "TRUE" } else { "FALSE" }.to_string(),
        "n" => format_number(raw),
        _ => raw.to_string(),
    }
}

/// Integral numbers print without a fractional part ("12", not "12.0").
fn format_number(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Ok(v) => format!("{v}"),
        Err(_) => raw.to_string(),
    }
}

/// Columns past XFD are not valid cell references.
const MAX_COLUMNS: usize = 16_384;

/// "C7" -> 2
fn column_index(reference: &str) -> Option<usize> {
    let letters: String = reference
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for ch in letters.chars() {
        let digit = ch.to_ascii_uppercase() as usize - 'A' as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1).filter(|&i| i < MAX_COLUMNS)
}

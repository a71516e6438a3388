use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use crate::error::ScanError;
use crate::model::PageText;
use crate::options::PageSelection;
use crate::table_parse::split_line_into_cells;

fn split_text_into_pages(raw_text: &str) -> Vec<String> {
    let mut pages = raw_text
        .split('\u{000C}')
        .map(str::to_string)
        .collect::<Vec<_>>();
    if pages.last().is_some_and(String::is_empty) {
        pages.pop();
    }
    pages
}

fn looks_decoding_broken(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }

    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();

    text.contains("?Identity-H Unimplemented?") || replacement * 8 > total || control * 5 > total
}

/// Prefers candidates that read as text and split into table cells.
fn extraction_quality_score(text: &str) -> i64 {
    if text.trim().is_empty() {
        return i64::MIN / 4;
    }

    let mut non_empty_lines = 0_i64;
    let mut multi_cell_lines = 0_i64;
    let mut cyrillic_lines = 0_i64;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        non_empty_lines += 1;
        if split_line_into_cells(line).len() >= 2 {
            multi_cell_lines += 1;
        }
        if line.chars().any(|ch| ('\u{0400}'..='\u{04FF}').contains(&ch)) {
            cyrillic_lines += 1;
        }
    }

    let broken_penalty = if looks_decoding_broken(text) { 800 } else { 0 };
    multi_cell_lines * 50 + cyrillic_lines * 10 + non_empty_lines - broken_penalty
}

fn choose_best_text(candidates: Vec<String>) -> String {
    candidates
        .into_iter()
        .max_by_key(|text| extraction_quality_score(text))
        .unwrap_or_default()
}

/// Rebuilds lines from the text operators of a page content stream.
fn extract_text_from_page_content(document: &Document, page_id: ObjectId) -> Option<String> {
    fn collect_text(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => text.push_str(&Document::decode_text(encoding, bytes)),
                Object::Array(items) => {
                    collect_text(text, encoding, items);
                    text.push(' ');
                }
                Object::Integer(value) if *value < -100 => text.push(' '),
                _ => {}
            }
        }
    }

    let raw_content = document.get_page_content(page_id).ok()?;
    let content = Content::decode(&raw_content).ok()?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_encoding = None;
    for operation in content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                current_encoding = operation
                    .operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                    .and_then(|font_name| encodings.get(font_name).copied());
            }
            "Tj" | "TJ" | "'" | "\"" => {
                collect_text(&mut current, current_encoding, &operation.operands);
            }
            "T*" | "Td" | "TD" | "ET" => {
                if !current.trim().is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
            }
            _ => {}
        }
    }

    if !current.trim().is_empty() {
        lines.push(current);
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn collect_pages(
    document: &Document,
    extracted: Option<String>,
    page_selection: Option<&PageSelection>,
) -> Result<Vec<PageText>, ScanError> {
    let pages_map = document.get_pages();
    let extracted_pages = extracted
        .map(|text| split_text_into_pages(&text))
        .filter(|pages| pages.len() == pages_map.len());

    let mut pages = Vec::new();
    for (index, (page_no, page_id)) in pages_map.iter().enumerate() {
        if page_selection.is_some_and(|selection| !selection.contains(*page_no)) {
            continue;
        }

        let mut candidates = Vec::new();
        if let Some(text) = extracted_pages
            .as_ref()
            .and_then(|extracted| extracted.get(index).cloned())
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text);
        }
        if let Some(text) = extract_text_from_page_content(document, *page_id) {
            candidates.push(text);
        }
        if let Some(text) = document
            .extract_text(&[*page_no])
            .ok()
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text);
        }

        tracing::debug!(page = page_no, candidates = candidates.len(), "collected page text");
        pages.push(PageText {
            page_number: *page_no,
            text: choose_best_text(candidates),
        });
    }

    if pages.is_empty() {
        return Err(ScanError::NoPagesSelected);
    }

    Ok(pages)
}

/// Reads the text layer of every selected page.
pub fn read_pdf_pages(
    input_pdf: &Path,
    page_selection: Option<&PageSelection>,
) -> Result<Vec<PageText>, ScanError> {
    let document = Document::load(input_pdf)?;
    let extracted = match pdf_extract::extract_text(input_pdf) {
        Ok(text) => Some(text),
        Err(error) => {
            tracing::debug!(%error, "pdf-extract failed; using content streams only");
            None
        }
    };
    collect_pages(&document, extracted, page_selection)
}

pub fn read_pdf_pages_from_bytes(
    input_pdf: &[u8],
    page_selection: Option<&PageSelection>,
) -> Result<Vec<PageText>, ScanError> {
    let document = Document::load_mem(input_pdf)?;
    let extracted = pdf_extract::extract_text_from_mem(input_pdf).ok();
    collect_pages(&document, extracted, page_selection)
}

/// Whole-document text, pages joined by newlines.
pub fn read_pdf_text(input_pdf: &Path) -> Result<String, ScanError> {
    let pages = read_pdf_pages(input_pdf, None)?;
    Ok(pages
        .into_iter()
        .map(|page| page.text)
        .collect::<Vec<_>>()
        .join("\n"))
}

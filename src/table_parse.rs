use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r\n|[\n\r\x0B\x0C\x1C-\x1E\x{85}\x{2028}\x{2029}]")
        .expect("hardcoded line break regex is valid")
});

static CELL_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}|\t").expect("hardcoded cell separator regex is valid"));

/// Splits OCR text into lines. Bare `\r`, form feeds, record separators and
/// the Unicode line separators all end a line; `\r\n` counts once.
pub(crate) fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    LINE_BREAK.split(text)
}

/// Splits an OCR line on runs of two or more whitespace characters or a tab.
/// Blank cells are dropped, so a blank line yields no cells.
pub(crate) fn split_line_into_cells(line: &str) -> Vec<String> {
    CELL_SEPARATOR
        .split(line)
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn max_width(rows: &[Vec<String>]) -> usize {
    rows.iter().map(Vec::len).max().unwrap_or(0)
}

/// Pads rows on the right with empty cells. Rows longer than `width` are kept whole.
pub(crate) fn normalize_rows(rows: Vec<Vec<String>>, width: usize) -> Vec<Vec<String>> {
    rows.into_iter()
        .map(|mut row| {
            if row.len() < width {
                row.resize(width, String::new());
            }
            row
        })
        .collect()
}

pub(crate) fn modal_width(rows: &[Vec<String>]) -> usize {
    let mut freq = HashMap::new();
    for width in rows.iter().map(Vec::len) {
        *freq.entry(width).or_insert(0_usize) += 1;
    }

    freq.into_iter()
        .max_by_key(|(width, count)| (*count, *width))
        .map_or(0, |(width, _)| width)
}

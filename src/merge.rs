use crate::model::{MergedOutput, PageTable, Table};
use crate::table_parse::normalize_rows;

fn positional_headers(width: usize) -> Vec<String> {
    (1..=width).map(|index| format!("col_{index}")).collect()
}

/// Shared header when every table carries one of the same cells.
fn common_header(tables: &[PageTable], width: usize) -> Option<Vec<String>> {
    let first = tables.first()?.table.header.as_ref()?;
    if first.len() != width {
        return None;
    }
    tables
        .iter()
        .all(|page_table| page_table.table.header.as_ref() == Some(first))
        .then(|| first.clone())
}

/// Output for one table: its header, or `col_1..col_n` when it has none.
#[must_use]
pub fn single_table_output(table: &Table) -> MergedOutput {
    let headers = table
        .header
        .clone()
        .unwrap_or_else(|| positional_headers(table.column_count()));

    MergedOutput {
        headers,
        rows: table.rows.clone(),
        row_count: table.rows.len(),
        table_count: usize::from(!table.is_empty()),
    }
}

/// Merges per-page tables under one `page,table_id,...` schema padded to
/// the widest table.
#[must_use]
pub fn merge_tables(tables: &[PageTable]) -> MergedOutput {
    let width = tables
        .iter()
        .map(|page_table| page_table.table.column_count())
        .max()
        .unwrap_or(0);

    let mut headers = vec!["page".to_string(), "table_id".to_string()];
    headers.extend(common_header(tables, width).unwrap_or_else(|| positional_headers(width)));

    let mut rows = Vec::new();
    for page_table in tables {
        let normalized = normalize_rows(page_table.table.rows.clone(), width);
        for data_row in normalized {
            let mut row = Vec::with_capacity(width + 2);
            row.push(page_table.page.to_string());
            row.push(page_table.table_id.to_string());
            row.extend(data_row);
            rows.push(row);
        }
    }

    MergedOutput {
        headers,
        row_count: rows.len(),
        table_count: tables.len(),
        rows,
    }
}

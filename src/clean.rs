use crate::model::Table;
use crate::options::CleanOptions;

fn filled_cells(row: &[String]) -> usize {
    row.iter().filter(|cell| !cell.trim().is_empty()).count()
}

/// Drops sparse rows and fills the gaps left in the remaining ones.
///
/// A row survives when it has at least `floor(min_filled_ratio * columns)`
/// filled cells. The header is never filled.
#[must_use]
pub fn clean_table(table: Table, options: &CleanOptions) -> Table {
    let columns = table.column_count();
    let ratio = options.min_filled_ratio.clamp(0.0, 1.0);
    // floor of a non-negative value bounded by `columns`
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let threshold = (ratio * columns as f32).floor() as usize;

    let rows = table
        .rows
        .into_iter()
        .filter(|row| filled_cells(row) >= threshold)
        .map(|row| {
            row.into_iter()
                .map(|cell| {
                    if cell.trim().is_empty() {
                        options.fill_value.clone()
                    } else {
                        cell
                    }
                })
                .collect()
        })
        .collect();

    Table {
        header: table.header,
        rows,
        confidence: table.confidence,
    }
}

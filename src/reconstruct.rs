use regex::{Regex, RegexBuilder};

use crate::clean::clean_table;
use crate::error::ScanError;
use crate::header::apply_header_mode;
use crate::model::{PageTable, PageText, Table};
use crate::options::{QualityMode, ReconstructOptions};
use crate::table_parse::{
    max_width, modal_width, normalize_rows, split_line_into_cells, split_lines,
};
use crate::warning::{ScanWarning, WarningCode};

pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.60;

fn table_confidence(rows: &[Vec<String>]) -> f32 {
    if rows.is_empty() {
        return 0.0;
    }

    let modal = modal_width(rows);
    if modal == 0 {
        return 0.0;
    }

    let consistent =
        rows.iter().filter(|row| row.len() == modal).count() as f32 / rows.len() as f32;
    let max = max_width(rows);
    let min = rows.iter().map(Vec::len).min().unwrap_or(modal);
    let uniformity = if max == 0 {
        0.0
    } else {
        1.0 - ((max - min) as f32 / max as f32)
    };

    (consistent * 0.75 + uniformity * 0.25).clamp(0.0, 1.0)
}

/// Rebuilds tables from recognised text using compiled marker and header patterns.
#[derive(Debug, Clone)]
pub struct Reconstructor {
    start_re: Regex,
    header_re: Regex,
    options: ReconstructOptions,
}

impl Reconstructor {
    pub fn new(options: &ReconstructOptions) -> Result<Self, ScanError> {
        let start_re = RegexBuilder::new(&options.start_marker)
            .case_insensitive(true)
            .build()
            .map_err(|source| ScanError::InvalidPattern {
                label: "start_marker".to_string(),
                source,
            })?;
        let header_re =
            Regex::new(&options.header_pattern).map_err(|source| ScanError::InvalidPattern {
                label: "header_pattern".to_string(),
                source,
            })?;

        Ok(Self {
            start_re,
            header_re,
            options: options.clone(),
        })
    }

    #[must_use]
    pub fn options(&self) -> &ReconstructOptions {
        &self.options
    }

    fn collect_rows(&self, text: &str) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let mut in_table = false;

        for line in split_lines(text) {
            if self.start_re.is_match(line) {
                in_table = true;
                continue;
            }
            if !in_table {
                continue;
            }

            let cells = split_line_into_cells(line);
            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        rows
    }

    /// Reconstructs the table that follows the start marker in `text`.
    ///
    /// Lines before the first marker are narrative and ignored. Text without a
    /// marker, or without data rows after it (a lone header included), yields
    /// [`Table::empty`].
    #[must_use]
    pub fn reconstruct(&self, text: &str) -> Table {
        let rows = self.collect_rows(text);
        if rows.is_empty() {
            return Table::empty();
        }

        let confidence = table_confidence(&rows);
        let width = max_width(&rows);
        let normalized = normalize_rows(rows, width);
        let (header, rows) =
            apply_header_mode(normalized, self.options.header_mode, &self.header_re);
        if rows.is_empty() {
            return Table::empty();
        }

        Table {
            header,
            rows,
            confidence,
        }
    }

    /// Reconstructs one table per page, applying the quality mode and the
    /// optional sparse-row cleaning. Pages without a table produce a warning.
    pub fn reconstruct_pages(
        &self,
        pages: &[PageText],
        warnings: &mut Vec<ScanWarning>,
    ) -> Result<Vec<PageTable>, ScanError> {
        let mut out = Vec::new();

        for page in pages {
            let mut table = self.reconstruct(&page.text);
            if let Some(clean) = &self.options.clean {
                table = clean_table(table, clean);
            }

            if table.is_empty() {
                tracing::debug!(page = page.page_number, "no table rows recognised");
                warnings.push(
                    ScanWarning::new(
                        WarningCode::NoTableDetected,
                        "no table rows were recognised on this page",
                    )
                    .with_page(page.page_number),
                );
                continue;
            }

            if table.confidence < LOW_CONFIDENCE_THRESHOLD {
                match self.options.quality_mode {
                    QualityMode::BestEffort => {
                        warnings.push(
                            ScanWarning::new(
                                WarningCode::LowConfidence,
                                "table column counts are inconsistent; exported in best-effort mode",
                            )
                            .with_page(page.page_number)
                            .with_confidence(table.confidence),
                        );
                    }
                    QualityMode::Strict => {
                        return Err(ScanError::AmbiguousTable {
                            page: page.page_number,
                            confidence: table.confidence,
                        });
                    }
                    QualityMode::SkipAmbiguous => {
                        warnings.push(
                            ScanWarning::new(
                                WarningCode::LowConfidence,
                                "skipping low-confidence table",
                            )
                            .with_page(page.page_number)
                            .with_confidence(table.confidence),
                        );
                        continue;
                    }
                }
            }

            out.push(PageTable {
                page: page.page_number,
                table_id: out.len() + 1,
                table,
            });
        }

        Ok(out)
    }
}

/// Reconstructs a table with the default marker, header pattern and
/// auto-detected header.
#[must_use]
pub fn reconstruct_table(text: &str) -> Table {
    match Reconstructor::new(&ReconstructOptions::default()) {
        Ok(reconstructor) => reconstructor.reconstruct(text),
        Err(error) => {
            tracing::error!(%error, "default reconstruction patterns failed to compile");
            Table::empty()
        }
    }
}

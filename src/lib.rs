mod annotate;
mod clean;
mod corpus;
mod csv_out;
mod entity_model;
mod error;
mod header;
mod merge;
mod model;
mod options;
mod patterns;
mod pdf_reader;
mod reconstruct;
mod table_parse;
mod text_source;
mod warning;

use std::path::Path;

use crate::csv_out::{write_csv, write_csv_to_string};

pub use annotate::{annotate, annotate_document, filter_overlaps, filter_overlaps_counted};
pub use clean::clean_table;
pub use corpus::{
    ConvertedRecord, DEFAULT_TRAIN_RATIO, ExportManifest, ExportOptions, ExportReport, Paragraph,
    TrainingEntity, TrainingRecord, align_to_tokens, annotate_corpus, clean_text, export_corpus,
    read_annotated, read_records, split_corpus, to_converted, write_annotated, write_json,
};
pub use entity_model::{EntityModel, FoundEntity, GazetteerModel, ModelResult, apply_model};
pub use error::ScanError;
pub use merge::{merge_tables, single_table_output};
pub use model::{
    AnnotatedDocument, EntitySpan, MergedOutput, PageTable, PageText, RawDocument, Table,
};
pub use options::{
    CleanOptions, DEFAULT_HEADER_PATTERN, DEFAULT_START_MARKER, ExtractOptions, HeaderMode,
    PageSelection, QualityMode, ReconstructOptions,
};
pub use patterns::{LabelPattern, PatternSet};
pub use pdf_reader::{read_pdf_pages, read_pdf_pages_from_bytes, read_pdf_text};
pub use reconstruct::{LOW_CONFIDENCE_THRESHOLD, Reconstructor, reconstruct_table};
pub use text_source::{collect_documents, decode_text_bytes, read_document_text, read_text_file};
pub use warning::{ScanWarning, WarningCode};

#[derive(Debug, Clone, PartialEq)]
pub struct TableReport {
    pub row_count: usize,
    pub table_count: usize,
    pub warnings: Vec<ScanWarning>,
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn tables_from_pages(
    pages: &[PageText],
    options: &ExtractOptions,
    single_unit: bool,
) -> Result<(MergedOutput, Vec<ScanWarning>), ScanError> {
    let reconstructor = Reconstructor::new(&options.reconstruct)?;
    let mut warnings = Vec::new();
    let tables = reconstructor.reconstruct_pages(pages, &mut warnings)?;

    let merged = match tables.as_slice() {
        [only] if single_unit => single_table_output(&only.table),
        _ => merge_tables(&tables),
    };
    Ok((merged, warnings))
}

fn report(merged: &MergedOutput, warnings: Vec<ScanWarning>) -> TableReport {
    TableReport {
        row_count: merged.row_count,
        table_count: merged.table_count,
        warnings,
    }
}

/// Rebuilds the table in one recognised text and renders it as CSV.
pub fn extract_text_to_csv_string(
    text: &str,
    options: &ExtractOptions,
) -> Result<(String, TableReport), ScanError> {
    let pages = [PageText {
        page_number: 1,
        text: text.to_string(),
    }];
    let (merged, warnings) = tables_from_pages(&pages, options, true)?;
    let csv = write_csv_to_string(&merged, options.delimiter)?;
    Ok((csv, report(&merged, warnings)))
}

/// Rebuilds tables from a PDF text layer (one table per page, merged under
/// `page,table_id`) or from a plain-text OCR dump, and writes them as CSV.
pub fn extract_tables_to_csv(
    input: &Path,
    output_csv: &Path,
    options: &ExtractOptions,
) -> Result<TableReport, ScanError> {
    let (pages, single_unit) = if is_pdf(input) {
        (read_pdf_pages(input, options.pages.as_ref())?, false)
    } else {
        let text = read_text_file(input)?;
        (vec![PageText { page_number: 1, text }], true)
    };

    let (merged, warnings) = tables_from_pages(&pages, options, single_unit)?;
    write_csv(output_csv, &merged, options.delimiter)?;
    tracing::info!(
        rows = merged.row_count,
        tables = merged.table_count,
        output = %output_csv.display(),
        "tables written"
    );
    Ok(report(&merged, warnings))
}

#[cfg(test)]
mod tests {
    use super::{ExtractOptions, extract_text_to_csv_string};
    use crate::options::HeaderMode;
    use crate::warning::WarningCode;

    #[test]
    fn renders_header_and_rows_of_recognised_table() {
        let text = "Смета №12\nНаименование\nМатериал  Ед  Цена\nБетон В25  м³  5400\nАрматура  т\n";
        let (csv, report) =
            extract_text_to_csv_string(text, &ExtractOptions::default()).expect("text is valid");

        assert_eq!(csv, "Материал,Ед,Цена\nБетон В25,м³,5400\nАрматура,т,\n");
        assert_eq!(report.row_count, 2);
        assert_eq!(report.table_count, 1);
    }

    #[test]
    fn reports_missing_table_without_failing() {
        let mut options = ExtractOptions::default();
        options.reconstruct.header_mode = HeaderMode::NoHeader;
        let (csv, report) =
            extract_text_to_csv_string("Пояснительная записка", &options).expect("text is valid");

        assert_eq!(csv, "page,table_id\n");
        assert_eq!(report.row_count, 0);
        assert_eq!(report.warnings[0].code, WarningCode::NoTableDetected);
    }
}

use std::fs;
use std::path::Path;

use encoding_rs::WINDOWS_1251;

use crate::error::ScanError;
use crate::model::RawDocument;
use crate::pdf_reader::read_pdf_text;
use crate::warning::{ScanWarning, WarningCode};

/// Decodes UTF-8, falling back to Windows-1251 for legacy Cyrillic OCR dumps.
#[must_use]
pub fn decode_text_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, had_errors) = WINDOWS_1251.decode(bytes);
            if had_errors {
                tracing::warn!("text is neither UTF-8 nor Windows-1251; some characters were replaced");
            }
            text.into_owned()
        }
    }
}

pub fn read_text_file(path: &Path) -> Result<String, ScanError> {
    let bytes = fs::read(path)?;
    Ok(decode_text_bytes(&bytes))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Reads `.pdf` text layers and plain-text files alike.
pub fn read_document_text(path: &Path) -> Result<String, ScanError> {
    if has_extension(path, "pdf") {
        read_pdf_text(path)
    } else {
        read_text_file(path)
    }
}

/// Collects every file in `dir` with one of `extensions`, sorted by file
/// name. Files that fail to read are skipped with a warning.
pub fn collect_documents(
    dir: &Path,
    extensions: &[&str],
    warnings: &mut Vec<ScanWarning>,
) -> Result<Vec<RawDocument>, ScanError> {
    let mut paths = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| extensions.iter().any(|ext| has_extension(path, ext)))
        .collect::<Vec<_>>();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match read_document_text(&path) {
            Ok(text) => documents.push(RawDocument { source, text }),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "skipping unreadable document");
                warnings.push(
                    ScanWarning::new(WarningCode::UnreadableSource, error.to_string())
                        .with_source(source),
                );
            }
        }
    }

    Ok(documents)
}

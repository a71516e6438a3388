use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::annotate::{annotate_document, filter_overlaps_counted};
use crate::error::ScanError;
use crate::model::{AnnotatedDocument, EntitySpan, RawDocument};
use crate::patterns::PatternSet;
use crate::warning::{ScanWarning, WarningCode};

pub const DEFAULT_TRAIN_RATIO: f64 = 0.8;

static DISALLOWED_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{Alphabetic}\p{N}_\s,.()\-:;]")
        .expect("hardcoded text cleaning regex is valid")
});

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]").expect("hardcoded token regex is valid"));

/// Strips every character outside letters, numerals (including superscripts
/// such as `²`), `_`, whitespace and `,.()-:;`. Combining marks are removed.
#[must_use]
pub fn clean_text(text: &str) -> String {
    DISALLOWED_CHARS.replace_all(text, "").into_owned()
}

/// Maps between byte offsets and character offsets of one text.
struct CharIndex {
    boundaries: Vec<usize>,
}

impl CharIndex {
    fn new(text: &str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(byte, _)| byte).collect();
        boundaries.push(text.len());
        Self { boundaries }
    }

    fn to_char(&self, byte: usize) -> Option<usize> {
        self.boundaries.binary_search(&byte).ok()
    }

    fn to_byte(&self, char_offset: usize) -> Option<usize> {
        self.boundaries.get(char_offset).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingEntity {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// Interchange record with character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub text: String,
    pub entities: Vec<TrainingEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    pub entities: Vec<TrainingEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedRecord {
    pub id: usize,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub generated_at: String,
    pub documents: usize,
    pub train_documents: usize,
    pub test_documents: usize,
    pub entities: usize,
    pub unaligned_dropped: usize,
    pub labels: Vec<String>,
}

impl TrainingRecord {
    #[must_use]
    pub fn from_document(document: &AnnotatedDocument) -> Self {
        let index = CharIndex::new(&document.text);
        let entities = document
            .entities
            .iter()
            .filter_map(|span| {
                Some(TrainingEntity {
                    start: index.to_char(span.start)?,
                    end: index.to_char(span.end)?,
                    label: span.label.clone(),
                })
            })
            .collect();

        Self {
            source: Some(document.source.clone()),
            text: document.text.clone(),
            entities,
        }
    }

    /// Converts back to byte offsets, validating every span and restoring
    /// the non-overlap order.
    pub fn into_document(self) -> Result<AnnotatedDocument, ScanError> {
        let index = CharIndex::new(&self.text);
        let char_len = index.boundaries.len() - 1;
        let mut spans = Vec::with_capacity(self.entities.len());

        for entity in self.entities {
            let invalid = ScanError::InvalidSpan {
                start: entity.start,
                end: entity.end,
                len: char_len,
            };
            let (Some(start), Some(end)) = (index.to_byte(entity.start), index.to_byte(entity.end))
            else {
                return Err(invalid);
            };
            let span = EntitySpan::new(start, end, entity.label, self.text.len())
                .map_err(|_| invalid)?;
            spans.push(span);
        }

        let (entities, discarded) = filter_overlaps_counted(spans);
        if discarded > 0 {
            tracing::warn!(discarded, "overlapping spans removed from loaded record");
        }

        Ok(AnnotatedDocument {
            source: self.source.unwrap_or_default(),
            text: self.text,
            entities,
        })
    }

    fn into_paragraph(self) -> Paragraph {
        Paragraph {
            text: self.text,
            entities: self.entities,
        }
    }
}

/// Keeps spans whose edges fall on token edges, where a token is a run of
/// word characters or a single other non-space character.
#[must_use]
pub fn align_to_tokens(text: &str, spans: &[EntitySpan]) -> (Vec<EntitySpan>, usize) {
    let mut starts = BTreeSet::new();
    let mut ends = BTreeSet::new();
    for token in TOKEN.find_iter(text) {
        starts.insert(token.start());
        ends.insert(token.end());
    }

    let kept: Vec<EntitySpan> = spans
        .iter()
        .filter(|span| starts.contains(&span.start) && ends.contains(&span.end))
        .cloned()
        .collect();
    let dropped = spans.len() - kept.len();
    (kept, dropped)
}

/// Annotates raw documents, optionally cleaning their text first so the
/// offsets describe the text that is exported.
pub fn annotate_corpus(
    documents: &[RawDocument],
    patterns: &PatternSet,
    clean: bool,
    warnings: &mut Vec<ScanWarning>,
) -> Vec<AnnotatedDocument> {
    documents
        .iter()
        .map(|document| {
            let text = if clean {
                clean_text(&document.text)
            } else {
                document.text.clone()
            };
            if text.trim().is_empty() {
                warnings.push(
                    ScanWarning::new(WarningCode::EmptyDocument, "document has no text")
                        .with_source(&document.source),
                );
            }

            let (annotated, discarded) = annotate_document(&document.source, text, patterns);
            if discarded > 0 {
                warnings.push(
                    ScanWarning::new(
                        WarningCode::OverlapsDiscarded,
                        "overlapping spans were discarded",
                    )
                    .with_source(&document.source)
                    .with_count(discarded),
                );
            }
            annotated
        })
        .collect()
}

/// Splits off the first `floor(n * train_ratio)` documents for training.
pub fn split_corpus(
    documents: &[AnnotatedDocument],
    train_ratio: f64,
) -> Result<(&[AnnotatedDocument], &[AnnotatedDocument]), ScanError> {
    if !(0.0..=1.0).contains(&train_ratio) {
        return Err(ScanError::InvalidOption(format!(
            "train ratio must be within 0..=1, got {train_ratio}"
        )));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let cut = ((documents.len() as f64) * train_ratio).floor() as usize;
    Ok(documents.split_at(cut.min(documents.len())))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub train_ratio: f64,
    pub align_tokens: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            train_ratio: DEFAULT_TRAIN_RATIO,
            align_tokens: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub manifest: ExportManifest,
    pub warnings: Vec<ScanWarning>,
}

fn prepare_records(
    documents: &[AnnotatedDocument],
    align: bool,
    warnings: &mut Vec<ScanWarning>,
) -> (Vec<TrainingRecord>, usize) {
    let mut dropped_total = 0;
    let records = documents
        .iter()
        .map(|document| {
            if !align {
                return TrainingRecord::from_document(document);
            }

            let (entities, dropped) = align_to_tokens(&document.text, &document.entities);
            if dropped > 0 {
                dropped_total += dropped;
                warnings.push(
                    ScanWarning::new(
                        WarningCode::UnalignedSpansDropped,
                        "spans not on token boundaries were dropped",
                    )
                    .with_source(&document.source)
                    .with_count(dropped),
                );
            }
            TrainingRecord::from_document(&AnnotatedDocument {
                source: document.source.clone(),
                text: document.text.clone(),
                entities,
            })
        })
        .collect();
    (records, dropped_total)
}

#[must_use]
pub fn to_converted(records: &[TrainingRecord]) -> Vec<ConvertedRecord> {
    records
        .iter()
        .cloned()
        .enumerate()
        .map(|(id, record)| ConvertedRecord {
            id,
            paragraphs: vec![record.into_paragraph()],
        })
        .collect()
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ScanError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

pub fn read_records(path: &Path) -> Result<Vec<TrainingRecord>, ScanError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn read_annotated(path: &Path) -> Result<Vec<AnnotatedDocument>, ScanError> {
    read_records(path)?
        .into_iter()
        .map(TrainingRecord::into_document)
        .collect()
}

pub fn write_annotated(path: &Path, documents: &[AnnotatedDocument]) -> Result<(), ScanError> {
    let records: Vec<TrainingRecord> = documents
        .iter()
        .map(TrainingRecord::from_document)
        .collect();
    write_json(path, &records)
}

/// Writes `train.json`, `test.json`, `converted.json` and `manifest.json`
/// into `output_dir`.
pub fn export_corpus(
    documents: &[AnnotatedDocument],
    output_dir: &Path,
    options: &ExportOptions,
) -> Result<ExportReport, ScanError> {
    let (train, test) = split_corpus(documents, options.train_ratio)?;
    let mut warnings = Vec::new();
    let (train_records, train_dropped) =
        prepare_records(train, options.align_tokens, &mut warnings);
    let (test_records, test_dropped) = prepare_records(test, options.align_tokens, &mut warnings);

    fs::create_dir_all(output_dir)?;
    write_json(&output_dir.join("train.json"), &train_records)?;
    write_json(&output_dir.join("test.json"), &test_records)?;

    let all_records: Vec<TrainingRecord> = train_records
        .iter()
        .chain(test_records.iter())
        .cloned()
        .collect();
    write_json(&output_dir.join("converted.json"), &to_converted(&all_records))?;

    let labels: BTreeSet<String> = all_records
        .iter()
        .flat_map(|record| record.entities.iter().map(|entity| entity.label.clone()))
        .collect();
    let manifest = ExportManifest {
        generated_at: chrono::Utc::now().to_rfc3339(),
        documents: documents.len(),
        train_documents: train_records.len(),
        test_documents: test_records.len(),
        entities: all_records.iter().map(|record| record.entities.len()).sum(),
        unaligned_dropped: train_dropped + test_dropped,
        labels: labels.into_iter().collect(),
    };
    write_json(&output_dir.join("manifest.json"), &manifest)?;

    tracing::info!(
        train = manifest.train_documents,
        test = manifest.test_documents,
        entities = manifest.entities,
        "corpus exported"
    );

    Ok(ExportReport { manifest, warnings })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        TrainingEntity, TrainingRecord, align_to_tokens, clean_text, split_corpus, to_converted,
        write_json,
    };
    use crate::error::ScanError;
    use crate::model::{AnnotatedDocument, EntitySpan};

    fn span(start: usize, end: usize, label: &str) -> EntitySpan {
        EntitySpan {
            start,
            end,
            label: label.to_string(),
        }
    }

    fn doc(source: &str, text: &str, entities: Vec<EntitySpan>) -> AnnotatedDocument {
        AnnotatedDocument {
            source: source.to_string(),
            text: text.to_string(),
            entities,
        }
    }

    #[test]
    fn cleaning_keeps_words_and_basic_punctuation() {
        assert_eq!(
            clean_text("Цена: 1 200 руб.! (м²) «опт» №5; a-b"),
            "Цена: 1 200 руб. (м²) опт 5; a-b"
        );
    }

    #[test]
    fn cleaning_drops_combining_accents() {
        assert_eq!(clean_text("це\u{301}на сме\u{301}ты"), "цена сметы");
        assert_eq!(clean_text("код_1"), "код_1");
    }

    #[cfg(unix)]
    #[test]
    fn json_write_reports_errors_surfacing_on_flush() {
        let result = write_json(std::path::Path::new("/dev/full"), &["шт"; 4]);
        assert!(matches!(result, Err(ScanError::Io(_))), "result: {result:?}");
    }

    #[test]
    fn records_use_character_offsets() {
        let text = "Тип: каркасный";
        let start = text.find("каркасный").expect("word present");
        let document = doc(
            "a.pdf",
            text,
            vec![
                span(0, "Тип".len(), "TYPE"),
                span(start, text.len(), "SCHEME"),
            ],
        );

        let record = TrainingRecord::from_document(&document);
        assert_eq!(
            record.entities,
            vec![
                TrainingEntity {
                    start: 0,
                    end: 3,
                    label: "TYPE".to_string(),
                },
                TrainingEntity {
                    start: 5,
                    end: 14,
                    label: "SCHEME".to_string(),
                },
            ]
        );
        assert_eq!(record.clone().into_document().expect("record is valid"), document);
    }

    #[test]
    fn loading_rejects_out_of_range_entities() {
        let record = TrainingRecord {
            source: None,
            text: "шт".to_string(),
            entities: vec![TrainingEntity {
                start: 0,
                end: 3,
                label: "UNIT".to_string(),
            }],
        };
        assert!(matches!(
            record.into_document(),
            Err(ScanError::InvalidSpan { start: 0, end: 3, len: 2 })
        ));
    }

    #[test]
    fn token_alignment_drops_partial_words() {
        let text = "кровля 4500РУБ";
        let partial = text.find("ровля").expect("substring present");
        let cost = text.find("4500").expect("number present");
        let spans = vec![
            span(0, "кровля".len(), "SCHEME"),
            span(partial, "кровля".len(), "SCHEME"),
            span(cost, text.len(), "COST"),
        ];
        let (kept, dropped) = align_to_tokens(text, &spans);
        assert_eq!(kept, vec![spans[0].clone(), spans[2].clone()]);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn splits_eighty_twenty_with_floor() {
        let docs: Vec<AnnotatedDocument> = (0..7)
            .map(|i| doc(&i.to_string(), "x", Vec::new()))
            .collect();
        let (train, test) = split_corpus(&docs, 0.8).expect("ratio is valid");
        assert_eq!((train.len(), test.len()), (5, 2));
        assert_eq!(test[0].source, "5");

        assert!(split_corpus(&docs, 1.5).is_err());
    }

    #[test]
    fn converted_layout_wraps_records_in_paragraphs() {
        let records = vec![TrainingRecord {
            source: Some("a.docx".to_string()),
            text: "шт".to_string(),
            entities: vec![TrainingEntity {
                start: 0,
                end: 2,
                label: "UNIT".to_string(),
            }],
        }];
        let json = serde_json::to_value(to_converted(&records)).expect("serializable");
        assert_eq!(
            json,
            serde_json::json!([{
                "id": 0,
                "paragraphs": [{
                    "text": "шт",
                    "entities": [{"start": 0, "end": 2, "label": "UNIT"}]
                }]
            }])
        );
    }
}

use crate::error::ScanError;
use crate::model::{AnnotatedDocument, EntitySpan};
use crate::patterns::PatternSet;

/// Tags every match of every configured pattern, label by label in
/// configuration order. Spans of different labels may overlap; empty
/// matches are skipped.
#[must_use]
pub fn annotate(text: &str, patterns: &PatternSet) -> Vec<EntitySpan> {
    let mut spans = Vec::new();
    for pattern in patterns.iter() {
        for found in pattern.regex.find_iter(text) {
            match EntitySpan::new(found.start(), found.end(), pattern.label.as_str(), text.len()) {
                Ok(span) => spans.push(span),
                Err(ScanError::InvalidSpan { start, end, .. }) if start == end => {}
                Err(error) => {
                    tracing::warn!(label = %pattern.label, %error, "dropping invalid match");
                }
            }
        }
    }
    spans
}

/// Greedy earliest-start-wins selection of non-overlapping spans.
///
/// Spans are stably sorted by start, so among equal starts the one seen
/// first is kept. A longer match starting later than a kept span is lost.
#[must_use]
pub fn filter_overlaps(spans: Vec<EntitySpan>) -> Vec<EntitySpan> {
    filter_overlaps_counted(spans).0
}

/// As [`filter_overlaps`], also returning how many spans were discarded.
#[must_use]
pub fn filter_overlaps_counted(mut spans: Vec<EntitySpan>) -> (Vec<EntitySpan>, usize) {
    spans.sort_by_key(|span| span.start);

    let mut kept: Vec<EntitySpan> = Vec::with_capacity(spans.len());
    let mut discarded = 0;
    let mut last_end: Option<usize> = None;

    for span in spans {
        if last_end.is_none_or(|end| span.start >= end) {
            last_end = Some(span.end);
            kept.push(span);
        } else {
            discarded += 1;
        }
    }

    (kept, discarded)
}

/// Annotates `text` and resolves overlaps, returning the document with the
/// number of spans lost to overlap resolution.
#[must_use]
pub fn annotate_document(
    source: impl Into<String>,
    text: impl Into<String>,
    patterns: &PatternSet,
) -> (AnnotatedDocument, usize) {
    let text = text.into();
    let (entities, discarded) = filter_overlaps_counted(annotate(&text, patterns));

    (
        AnnotatedDocument {
            source: source.into(),
            text,
            entities,
        },
        discarded,
    )
}

use serde::{Deserialize, Serialize};

use crate::annotate::{annotate, filter_overlaps};
use crate::error::ScanError;
use crate::model::{AnnotatedDocument, EntitySpan, RawDocument};
use crate::patterns::{LabelPattern, PatternSet};

/// A trainable entity recogniser.
pub trait EntityModel: Sized {
    fn train(corpus: &[AnnotatedDocument]) -> Result<Self, ScanError>;

    /// Sorted, non-overlapping spans found in `text`.
    fn infer(&self, text: &str) -> Vec<EntitySpan>;

    fn labels(&self) -> Vec<&str>;
}

/// Remembers every surface form seen per label and finds them again.
///
/// Labels keep the order they were first seen in the corpus; within a label
/// longer forms are tried first.
#[derive(Debug, Clone)]
pub struct GazetteerModel {
    entries: Vec<(String, Vec<String>)>,
    patterns: PatternSet,
}

impl GazetteerModel {
    fn learn(corpus: &[AnnotatedDocument]) -> Vec<(String, Vec<String>)> {
        let mut entries: Vec<(String, Vec<String>)> = Vec::new();
        for document in corpus {
            for span in &document.entities {
                let Some(form) = document.entity_text(span).map(str::trim) else {
                    continue;
                };
                if form.is_empty() {
                    continue;
                }

                let index = match entries.iter().position(|(label, _)| *label == span.label) {
                    Some(index) => index,
                    None => {
                        entries.push((span.label.clone(), Vec::new()));
                        entries.len() - 1
                    }
                };
                let forms = &mut entries[index].1;
                if !forms.iter().any(|known| known == form) {
                    forms.push(form.to_string());
                }
            }
        }

        for (_, forms) in &mut entries {
            forms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        }
        entries
    }

    #[must_use]
    pub fn forms(&self, label: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(known, _)| known == label)
            .map(|(_, forms)| forms.as_slice())
    }
}

impl EntityModel for GazetteerModel {
    fn train(corpus: &[AnnotatedDocument]) -> Result<Self, ScanError> {
        let entries = Self::learn(corpus);
        if entries.is_empty() {
            return Err(ScanError::EmptyCorpus);
        }

        let label_patterns: Vec<LabelPattern> = entries
            .iter()
            .map(|(label, forms)| {
                let alternation = forms
                    .iter()
                    .map(|form| regex::escape(form))
                    .collect::<Vec<_>>()
                    .join("|");
                LabelPattern::new(label.clone(), alternation)
            })
            .collect();
        let patterns = PatternSet::compile(&label_patterns)?;
        tracing::debug!(labels = entries.len(), "gazetteer trained");

        Ok(Self { entries, patterns })
    }

    fn infer(&self, text: &str) -> Vec<EntitySpan> {
        filter_overlaps(annotate(text, &self.patterns))
    }

    fn labels(&self) -> Vec<&str> {
        self.patterns.labels()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundEntity {
    pub text: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResult {
    pub source: String,
    pub entities: Vec<FoundEntity>,
}

/// Runs `model` over each document.
pub fn apply_model<M: EntityModel>(model: &M, documents: &[RawDocument]) -> Vec<ModelResult> {
    documents
        .iter()
        .map(|document| ModelResult {
            source: document.source.clone(),
            entities: model
                .infer(&document.text)
                .into_iter()
                .filter_map(|span| {
                    Some(FoundEntity {
                        text: document.text.get(span.start..span.end)?.to_string(),
                        label: span.label,
                    })
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{EntityModel, FoundEntity, GazetteerModel, apply_model};
    use crate::annotate::annotate_document;
    use crate::error::ScanError;
    use crate::model::{AnnotatedDocument, RawDocument};
    use crate::patterns::PatternSet;

    fn corpus() -> Vec<AnnotatedDocument> {
        let patterns = PatternSet::builtin().expect("builtin patterns compile");
        ["Объект: дом, кровля 120 м²", "Тип каркасный, полы 45 м³"]
            .iter()
            .enumerate()
            .map(|(index, text)| annotate_document(index.to_string(), *text, &patterns).0)
            .collect()
    }

    #[test]
    fn learns_forms_per_label_in_first_seen_order() {
        let model = GazetteerModel::train(&corpus()).expect("corpus has entities");
        assert_eq!(model.labels(), vec!["TYPE", "SCHEME", "UNIT"]);
        assert_eq!(
            model.forms("SCHEME"),
            Some(&["каркасный".to_string(), "кровля".to_string(), "полы".to_string()][..])
        );
    }

    #[test]
    fn infers_known_forms_on_new_text() {
        let model = GazetteerModel::train(&corpus()).expect("corpus has entities");
        let docs = vec![RawDocument {
            source: "new.txt".to_string(),
            text: "полы и кровля, 30 м²".to_string(),
        }];

        let results = apply_model(&model, &docs);
        assert_eq!(results[0].source, "new.txt");
        assert_eq!(
            results[0].entities,
            vec![
                FoundEntity { text: "полы".to_string(), label: "SCHEME".to_string() },
                FoundEntity { text: "кровля".to_string(), label: "SCHEME".to_string() },
                FoundEntity { text: "м²".to_string(), label: "UNIT".to_string() },
            ]
        );
    }

    #[test]
    fn empty_corpus_cannot_be_trained() {
        let docs = vec![AnnotatedDocument {
            source: "a".to_string(),
            text: "ничего".to_string(),
            entities: Vec::new(),
        }];
        assert!(matches!(GazetteerModel::train(&docs), Err(ScanError::EmptyCorpus)));
    }
}

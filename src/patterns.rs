use std::collections::HashSet;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// One configured label and the regular expression that tags it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPattern {
    pub label: String,
    pub pattern: String,
}

impl LabelPattern {
    pub fn new(label: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pattern: pattern.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledPattern {
    pub(crate) label: String,
    pub(crate) regex: Regex,
}

/// Ordered, compiled label patterns. Order decides which label wins when
/// two spans start at the same offset.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

impl PatternSet {
    pub fn compile(patterns: &[LabelPattern]) -> Result<Self, ScanError> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(patterns.len());

        for entry in patterns {
            if !seen.insert(entry.label.as_str()) {
                return Err(ScanError::DuplicateLabel(entry.label.clone()));
            }
            let regex = Regex::new(&entry.pattern).map_err(|source| ScanError::InvalidPattern {
                label: entry.label.clone(),
                source,
            })?;
            compiled.push(CompiledPattern {
                label: entry.label.clone(),
                regex,
            });
        }

        Ok(Self { patterns: compiled })
    }

    /// Reads a JSON array of `{"label", "pattern"}` records.
    pub fn from_json_str(json: &str) -> Result<Self, ScanError> {
        let patterns: Vec<LabelPattern> = serde_json::from_str(json)?;
        Self::compile(&patterns)
    }

    pub fn load(path: &Path) -> Result<Self, ScanError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Labels for construction cost estimates: object types, units, costs,
    /// catalogue codes and structural schemes.
    #[must_use]
    pub fn builtin_patterns() -> Vec<LabelPattern> {
        vec![
            LabelPattern::new(
                "TYPE",
                r"(ru[A-Za-z0-9.-]+|Тип|Наименование|Этажность|Объект)",
            ),
            LabelPattern::new("UNIT", r"(м²|шт|км|РУБ|м³|на 1 м2)"),
            LabelPattern::new(
                "COST",
                r"(\d+\s?[RР]уб\.|\d+[.,]?\d*\s?[РРУБ]+|\d+\s?Econom|\d+\s?[xX]{2}\d{2}\s?РУБ)",
            ),
            LabelPattern::new("CODE", r"(А\d+\.\d+\.\d+\.\d+|\d{2,}-\d{2,})"),
            LabelPattern::new(
                "SCHEME",
                r"(каркасный|деревянный|бетонный|глиносоломенный|кровля|полы)",
            ),
        ]
    }

    pub fn builtin() -> Result<Self, ScanError> {
        Self::compile(&Self::builtin_patterns())
    }

    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.patterns
            .iter()
            .map(|pattern| pattern.label.as_str())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &CompiledPattern> {
        self.patterns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{LabelPattern, PatternSet};
    use crate::error::ScanError;

    #[test]
    fn builtin_set_compiles_in_order() {
        let set = PatternSet::builtin().expect("builtin patterns compile");
        assert_eq!(set.labels(), vec!["TYPE", "UNIT", "COST", "CODE", "SCHEME"]);
    }

    #[test]
    fn json_config_preserves_order() {
        let set = PatternSet::from_json_str(
            r#"[{"label": "UNIT", "pattern": "шт"}, {"label": "CODE", "pattern": "\\d+-\\d+"}]"#,
        )
        .expect("config should load");
        assert_eq!(set.labels(), vec!["UNIT", "CODE"]);
    }

    #[test]
    fn rejects_duplicate_labels() {
        let err = PatternSet::compile(&[
            LabelPattern::new("UNIT", "шт"),
            LabelPattern::new("UNIT", "км"),
        ])
        .expect_err("duplicate label should fail");
        assert!(matches!(err, ScanError::DuplicateLabel(label) if label == "UNIT"));
    }

    #[test]
    fn reports_label_of_broken_pattern() {
        let err = PatternSet::compile(&[LabelPattern::new("COST", r"(\d+")])
            .expect_err("unbalanced group should fail");
        assert!(err.to_string().contains("'COST'"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = PatternSet::from_json_str(r#"{"UNIT": "шт"}"#).expect_err("object is not a list");
        assert!(matches!(err, ScanError::Json(_)));
    }
}

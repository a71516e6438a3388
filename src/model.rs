use crate::error::ScanError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

/// One text unit read from disk, named after the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub source: String,
    pub text: String,
}

/// A rectangular table rebuilt from recognised text.
///
/// Every row, and the header when present, holds exactly
/// [`Table::column_count`] cells. A table without data rows is empty and
/// means "no table found".
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
    pub confidence: f32,
}

impl Table {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            header: None,
            rows: Vec::new(),
            confidence: 0.0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.header
            .as_ref()
            .map(Vec::len)
            .or_else(|| self.rows.first().map(Vec::len))
            .unwrap_or(0)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageTable {
    pub page: u32,
    pub table_id: usize,
    pub table: Table,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedOutput {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub table_count: usize,
    pub row_count: usize,
}

/// A labelled half-open byte range `[start, end)` over a text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

impl EntitySpan {
    /// Builds a span after checking `start < end <= text_len`.
    pub fn new(
        start: usize,
        end: usize,
        label: impl Into<String>,
        text_len: usize,
    ) -> Result<Self, ScanError> {
        if start >= end || end > text_len {
            return Err(ScanError::InvalidSpan {
                start,
                end,
                len: text_len,
            });
        }

        Ok(Self {
            start,
            end,
            label: label.into(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Text plus its entity spans, sorted by start and pairwise disjoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedDocument {
    pub source: String,
    pub text: String,
    pub entities: Vec<EntitySpan>,
}

impl AnnotatedDocument {
    pub fn entity_text(&self, span: &EntitySpan) -> Option<&str> {
        self.text.get(span.start..span.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    NoTableDetected,
    LowConfidence,
    OverlapsDiscarded,
    UnalignedSpansDropped,
    UnreadableSource,
    EmptyDocument,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanWarning {
    pub code: WarningCode,
    pub message: String,
    pub page: Option<u32>,
    pub source: Option<String>,
    pub count: Option<usize>,
    pub confidence: Option<f32>,
}

impl ScanWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            page: None,
            source: None,
            count: None,
            confidence: None,
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

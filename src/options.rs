use std::collections::BTreeSet;
use std::str::FromStr;

/// Marker that opens the table region of recognised text: a numbered
/// "temperature" column or a "name" column header.
pub const DEFAULT_START_MARKER: &str = r"№.*Температурные|Наименование";

/// First cell of a header row: Cyrillic or Latin letters and whitespace only.
pub const DEFAULT_HEADER_PATTERN: &str = r"^[А-Яа-яЁёA-Za-z\s]+$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    AutoDetect,
    HasHeader,
    NoHeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityMode {
    BestEffort,
    Strict,
    SkipAmbiguous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<u32>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut pages = BTreeSet::new();
        for token in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((start, end)) = token.split_once('-') else {
                pages.insert(parse_page_number(token)?);
                continue;
            };

            let start = parse_page_number(start)?;
            let end = parse_page_number(end)?;
            if end < start {
                return Err(format!(
                    "invalid range '{token}': end is smaller than start"
                ));
            }
            pages.extend(start..=end);
        }

        if pages.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { pages })
    }
}

fn parse_page_number(raw: &str) -> Result<u32, String> {
    let page: u32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid page number: '{}'", raw.trim()))?;
    if page == 0 {
        return Err("pages are 1-based".to_string());
    }
    Ok(page)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructOptions {
    pub start_marker: String,
    pub header_pattern: String,
    pub header_mode: HeaderMode,
    pub quality_mode: QualityMode,
    pub clean: Option<CleanOptions>,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            start_marker: DEFAULT_START_MARKER.to_string(),
            header_pattern: DEFAULT_HEADER_PATTERN.to_string(),
            header_mode: HeaderMode::AutoDetect,
            quality_mode: QualityMode::BestEffort,
            clean: None,
        }
    }
}

/// Sparse-row cleaning applied after reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanOptions {
    /// Rows with fewer than `floor(min_filled_ratio * columns)` filled cells are dropped.
    pub min_filled_ratio: f32,
    pub fill_value: String,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            min_filled_ratio: 0.5,
            fill_value: "0".to_string(),
        }
    }
}

/// Options for the file-to-CSV table pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub reconstruct: ReconstructOptions,
    pub pages: Option<PageSelection>,
    pub delimiter: u8,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            reconstruct: ReconstructOptions::default(),
            pages: None,
            delimiter: b',',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PageSelection;
    use std::str::FromStr;

    #[test]
    fn parse_page_selection_range_and_single() {
        let selection = PageSelection::from_str("1-3,5").expect("selection should parse");
        assert!(selection.contains(1));
        assert!(selection.contains(3));
        assert!(selection.contains(5));
        assert!(!selection.contains(4));
    }

    #[test]
    fn reject_invalid_page_selection() {
        let err = PageSelection::from_str("3-1").expect_err("invalid range should fail");
        assert!(err.contains("invalid range"));

        let err = PageSelection::from_str("0").expect_err("zero page should fail");
        assert!(err.contains("1-based"));

        let err = PageSelection::from_str(" , ").expect_err("empty selection should fail");
        assert!(err.contains("cannot be empty"));
    }
}

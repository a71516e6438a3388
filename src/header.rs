use regex::Regex;

use crate::options::HeaderMode;

pub(crate) fn looks_like_header(row: &[String], header_re: &Regex) -> bool {
    row.first().is_some_and(|cell| header_re.is_match(cell))
}

/// Splits normalized rows into an optional header and the data rows.
pub(crate) fn apply_header_mode(
    mut rows: Vec<Vec<String>>,
    mode: HeaderMode,
    header_re: &Regex,
) -> (Option<Vec<String>>, Vec<Vec<String>>) {
    if rows.is_empty() {
        return (None, rows);
    }

    let promote = match mode {
        HeaderMode::HasHeader => true,
        HeaderMode::NoHeader => false,
        HeaderMode::AutoDetect => looks_like_header(&rows[0], header_re),
    };

    if promote {
        let header = rows.remove(0);
        (Some(header), rows)
    } else {
        (None, rows)
    }
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::{apply_header_mode, looks_like_header};
    use crate::options::{DEFAULT_HEADER_PATTERN, HeaderMode};

    fn header_re() -> Regex {
        Regex::new(DEFAULT_HEADER_PATTERN).expect("default header pattern compiles")
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| (*cell).to_string()).collect()
    }

    #[test]
    fn alphabetic_first_cell_is_a_header() {
        let re = header_re();
        assert!(looks_like_header(&row(&["Материал", "12"]), &re));
        assert!(looks_like_header(&row(&["Ёмкость бака"]), &re));
        assert!(looks_like_header(&row(&["Unit price"]), &re));
        assert!(!looks_like_header(&row(&["1", "Кирпич"]), &re));
        assert!(!looks_like_header(&row(&["Цена, руб"]), &re));
    }

    #[test]
    fn auto_detect_promotes_alphabetic_row() {
        let rows = vec![row(&["Материал", "Цена"]), row(&["1", "200"])];
        let (header, data) = apply_header_mode(rows, HeaderMode::AutoDetect, &header_re());
        assert_eq!(header, Some(row(&["Материал", "Цена"])));
        assert_eq!(data, vec![row(&["1", "200"])]);
    }

    #[test]
    fn explicit_modes_override_detection() {
        let rows = vec![row(&["1", "2"]), row(&["3", "4"])];
        let (header, data) = apply_header_mode(rows.clone(), HeaderMode::HasHeader, &header_re());
        assert_eq!(header, Some(row(&["1", "2"])));
        assert_eq!(data.len(), 1);

        let rows = vec![row(&["Материал"]), row(&["Песок"])];
        let (header, data) = apply_header_mode(rows, HeaderMode::NoHeader, &header_re());
        assert!(header.is_none());
        assert_eq!(data.len(), 2);
    }
}

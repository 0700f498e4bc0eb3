//! Header cleanup for spreadsheet-style sources.
//!
//! Exported spreadsheets often split a header across several rows and leave
//! whole rows or columns blank. These helpers turn that into a single
//! snake_case header row before column mapping.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static YEAR_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}_").expect("valid regex"));

/// Normalize a raw header cell: `"2021 Medicare-Allowed  Charges"` → `"medicare_allowed_charges"`
pub fn to_snake_case(name: &str) -> String {
    let name = name.replace('-', "_");
    let name = WHITESPACE.replace_all(name.trim(), "_");
    let name = name.to_lowercase();
    let name = name.trim_matches('_');
    YEAR_PREFIX.replace(name, "").into_owned()
}

fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}

/// Pad every row to the widest row so positional access never goes out of bounds
pub fn pad_rows(rows: &mut [Vec<String>]) {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in rows.iter_mut() {
        row.resize(width, String::new());
    }
}

/// File line numbers of the rows `remove_blank_rows_and_columns` keeps
pub fn non_blank_lines(rows: &[Vec<String>], lines: &[usize]) -> Vec<usize> {
    rows.iter()
        .zip(lines)
        .filter(|(row, _)| row.iter().any(|cell| !is_blank(cell)))
        .map(|(_, line)| *line)
        .collect()
}

/// Drop rows that are entirely blank, then columns that are entirely blank.
pub fn remove_blank_rows_and_columns(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = rows
        .into_iter()
        .filter(|row| row.iter().any(|cell| !is_blank(cell)))
        .collect();
    pad_rows(&mut rows);

    let width = rows.first().map(Vec::len).unwrap_or(0);
    let keep: Vec<bool> = (0..width)
        .map(|col| rows.iter().any(|row| !is_blank(&row[col])))
        .collect();

    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .zip(keep.iter())
                .filter_map(|(cell, keep)| keep.then_some(cell))
                .collect()
        })
        .collect()
}

/// Locate the header in rows that may spread it over several lines.
///
/// Starting from the first row, following rows are folded into the header
/// cell by cell until every column has a non-blank name. Returns the index of
/// the last header row and the merged header, or `None` when no complete
/// header forms.
pub fn detect_header(rows: &[Vec<String>]) -> Option<(usize, Vec<String>)> {
    let first = rows.first()?;
    let width = first.len();
    let mut header: Vec<String> = first.iter().map(|h| h.trim().to_string()).collect();

    if width > 0 && header.iter().all(|h| !is_blank(h)) {
        return Some((0, header));
    }

    for (index, row) in rows.iter().enumerate().skip(1) {
        for (h, cell) in header.iter_mut().zip(row.iter()) {
            let cell = cell.trim();
            if !cell.is_empty() {
                *h = format!("{} {}", h, cell).trim().to_string();
            }
        }
        let named = header.iter().filter(|h| !is_blank(h)).count();
        if named == row.len() && named == width {
            return Some((index, header));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn snake_case_strips_years_and_punctuation() {
        assert_eq!(to_snake_case("CPT Code"), "cpt_code");
        assert_eq!(to_snake_case("  Non-Facility   Total RVU "), "non_facility_total_rvu");
        assert_eq!(to_snake_case("2021 Medicare Utilization"), "medicare_utilization");
        assert_eq!(to_snake_case("_rate_per_minute_"), "rate_per_minute");
    }

    #[test]
    fn complete_first_row_is_the_header() {
        let table = rows(&[&["HCPCS", "Price"], &["99213", "1.5"]]);
        let (index, header) = detect_header(&table).unwrap();
        assert_eq!(index, 0);
        assert_eq!(header, vec!["HCPCS", "Price"]);
    }

    #[test]
    fn split_header_rows_are_merged() {
        let table = rows(&[
            &["HCPCS", "NF", "F"],
            &["", "Quantity", "Quantity"],
            &["99213", "2", "1"],
        ]);
        // first row is already complete, so only blank first cells trigger merging
        assert_eq!(detect_header(&table).unwrap().0, 0);

        let table = rows(&[
            &["HCPCS", "", ""],
            &["", "NF Quantity", "F Quantity"],
            &["99213", "2", "1"],
        ]);
        let (index, header) = detect_header(&table).unwrap();
        assert_eq!(index, 1);
        assert_eq!(header, vec!["HCPCS", "NF Quantity", "F Quantity"]);
    }

    #[test]
    fn header_that_never_completes_is_none() {
        let table = rows(&[&["HCPCS", ""], &["", ""]]);
        assert!(detect_header(&table).is_none());
    }

    #[test]
    fn blank_rows_and_columns_are_removed() {
        let table = rows(&[
            &["HCPCS", "", "Price"],
            &["", "", ""],
            &["99213", " ", "1.5"],
        ]);
        assert_eq!(non_blank_lines(&table, &[1, 2, 4]), vec![1, 4]);
        let cleaned = remove_blank_rows_and_columns(table);
        assert_eq!(cleaned, rows(&[&["HCPCS", "Price"], &["99213", "1.5"]]));
    }
}

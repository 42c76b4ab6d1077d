//! Tabular data as exchanged with sheets and workbooks, plus A1 ranges.

use crate::errors::AppError;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Header row plus data rows, every cell as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Splits raw sheet values into header and rows, padding short rows
    /// with empty strings to the header width.
    pub fn from_values(mut values: Vec<Vec<String>>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let header = values.remove(0);
        let width = header.len();
        let rows = values
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();
        Self { header, rows }
    }

    /// Header followed by rows.
    pub fn to_values(&self) -> Vec<Vec<String>> {
        std::iter::once(self.header.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }
}

static A1_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:'((?:[^']|'')+)'|([^!]+))!)?([A-Za-z]+)(\d+)?(?::([A-Za-z]+)(\d+)?)?$")
        .expect("A1 range pattern is valid")
});

/// A parsed A1-style range such as `Sheet1!A1:Z`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: Option<String>,
    pub start_col: String,
    pub start_row: u32,
    start_col_index: u32,
}

impl A1Range {
    pub fn parse(range: &str) -> Result<Self, AppError> {
        let caps = A1_RANGE.captures(range.trim()).ok_or_else(|| {
            AppError::InvalidRange(format!(
                "'{}' is not an A1 range (expected e.g. Sheet1!A1:Z)",
                range
            ))
        })?;

        let sheet = caps
            .get(1)
            .map(|m| m.as_str().replace("''", "'"))
            .or_else(|| caps.get(2).map(|m| m.as_str().to_string()));
        let start_col = caps[3].to_ascii_uppercase();
        let start_col_index = column_index(&start_col).ok_or_else(|| {
            AppError::InvalidRange(format!("'{}' has an out-of-range start column", range))
        })?;
        let start_row = match caps.get(4) {
            Some(m) => m
                .as_str()
                .parse::<u32>()
                .ok()
                .filter(|&r| r >= 1)
                .ok_or_else(|| {
                    AppError::InvalidRange(format!("'{}' has an invalid start row", range))
                })?,
            None => 1,
        };

        Ok(Self {
            sheet,
            start_col,
            start_row,
            start_col_index,
        })
    }

    /// 1-based index of the start column.
    pub fn start_col_index(&self) -> u32 {
        self.start_col_index
    }

    /// Range covering `rows` rows and `cols` columns from `row_offset`
    /// rows below the start cell.
    pub fn block(&self, row_offset: u32, rows: u32, cols: u32) -> String {
        let first_row = self.start_row + row_offset;
        let last_row = first_row + rows.saturating_sub(1);
        let end_col = column_letters(self.start_col_index.saturating_add(cols.saturating_sub(1)));
        let cells = format!("{}{}:{}{}", self.start_col, first_row, end_col, last_row);
        match &self.sheet {
            Some(sheet) => format!("{}!{}", quote_sheet(sheet), cells),
            None => cells,
        }
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "{}!{}{}", quote_sheet(sheet), self.start_col, self.start_row),
            None => write!(f, "{}{}", self.start_col, self.start_row),
        }
    }
}

fn quote_sheet(sheet: &str) -> String {
    if sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// Bijective base-26 column letters: 1 → A, 26 → Z, 27 → AA.
pub fn column_letters(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`column_letters`]. `None` for empty or non-letter input.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_rows() {
        let table = Table::from_values(vec![
            vec!["order_id".into(), "status".into(), "notes".into()],
            vec!["1".into()],
            vec!["2".into(), "Done".into(), "x".into()],
        ]);
        assert_eq!(table.rows[0], vec!["1", "", ""]);
        assert_eq!(table.rows[1].len(), 3);
    }

    #[test]
    fn empty_values_give_empty_table() {
        assert!(Table::from_values(Vec::new()).is_empty());
    }

    #[test]
    fn parses_sheet_and_start_cell() {
        let range = A1Range::parse("Sheet1!A1:Z").unwrap();
        assert_eq!(range.sheet.as_deref(), Some("Sheet1"));
        assert_eq!(range.start_col, "A");
        assert_eq!(range.start_row, 1);

        let range = A1Range::parse("Sheet1!C:Z").unwrap();
        assert_eq!(range.start_col, "C");
        assert_eq!(range.start_row, 1);

        let range = A1Range::parse("'Q1 Orders'!b12").unwrap();
        assert_eq!(range.sheet.as_deref(), Some("Q1 Orders"));
        assert_eq!(range.start_col, "B");
        assert_eq!(range.start_row, 12);

        assert_eq!(A1Range::parse("AA3").unwrap().sheet, None);
    }

    #[test]
    fn rejects_malformed_ranges() {
        for bad in ["", "Sheet1!", "Sheet1!1A", "Sheet1!A0", "A1:B2:C3", "!A1"] {
            let err = A1Range::parse(bad).unwrap_err();
            assert!(matches!(err, AppError::InvalidRange(_)), "{}", bad);
        }
    }

    #[test]
    fn rejects_start_column_past_u32() {
        let err = A1Range::parse("Sheet1!ZZZZZZZZ1").unwrap_err();
        assert!(matches!(err, AppError::InvalidRange(_)));
        assert_eq!(A1Range::parse("Sheet1!ZZ1").unwrap().start_col_index(), 702);
    }

    #[test]
    fn block_advances_rows_and_derives_end_column() {
        let range = A1Range::parse("Sheet1!B2:Z").unwrap();
        assert_eq!(range.block(0, 3, 4), "Sheet1!B2:E4");
        assert_eq!(range.block(3, 2, 4), "Sheet1!B5:E6");
        let quoted = A1Range::parse("'My Sheet'!A1").unwrap();
        assert_eq!(quoted.block(0, 1, 27), "'My Sheet'!A1:AA1");
    }

    #[test]
    fn column_letters_are_bijective_base26() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(column_index("AAA"), Some(703));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }
}

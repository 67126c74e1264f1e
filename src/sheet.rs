use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDateTime, Timelike};
use thiserror::Error;

use crate::naming::{self, ColumnName};

/// Text values the dataframe readers traditionally treat as "not available".
pub const DEFAULT_NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATETIME_FRACTION_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Error)]
pub enum SheetError {
    #[error(transparent)]
    Workbook(#[from] calamine::Error),
    #[error("workbook has no worksheets")]
    NoWorksheets,
    #[error("worksheet {0:?} not found")]
    NoSuchWorksheet(String),
}

/// A single spreadsheet value, keeping the type it had in the file.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Dates and durations stored as ISO 8601 text, as ODS files do.
    Iso(String),
    Error(String),
}

impl Cell {
    /// Render the value the way it is stored in a text column.
    ///
    /// Returns `None` for empty cells. Error cells keep their code, such as
    /// `#DIV/0!`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) | Cell::Iso(s) | Cell::Error(s) => Some(s.clone()),
            Cell::Int(n) => Some(n.to_string()),
            Cell::Float(f) if f.is_nan() => None,
            Cell::Float(f) => Some(f.to_string()),
            Cell::Bool(b) => Some(if *b { "1" } else { "0" }.to_owned()),
            Cell::DateTime(dt) if dt.nanosecond() == 0 => {
                Some(dt.format(DATETIME_FORMAT).to_string())
            }
            Cell::DateTime(dt) => Some(dt.format(DATETIME_FRACTION_FORMAT).to_string()),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(n) => Cell::Int(*n),
            Data::Float(f) => Cell::Float(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => {
                if dt.is_duration() {
                    match dt.as_duration() {
                        Some(d) => Cell::Iso(format_duration(d)),
                        None => Cell::Float(dt.as_f64()),
                    }
                } else {
                    match dt.as_datetime() {
                        Some(dt) => Cell::DateTime(dt),
                        None => Cell::Float(dt.as_f64()),
                    }
                }
            }
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Iso(s.clone()),
            Data::Error(e) => Cell::Error(e.to_string()),
        }
    }
}

fn format_duration(d: chrono::Duration) -> String {
    let secs = d.num_seconds();
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.abs();
    format!("{}{:02}:{:02}:{:02}", sign, secs / 3600, secs % 3600 / 60, secs % 60)
}

/// Which cell values count as missing.
#[derive(Debug, Clone)]
pub struct MissingPolicy {
    na_values: Vec<String>,
}

impl Default for MissingPolicy {
    fn default() -> Self {
        MissingPolicy::new(DEFAULT_NA_VALUES.iter().copied())
    }
}

impl MissingPolicy {
    pub fn new<I, S>(na_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MissingPolicy {
            na_values: na_values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_missing(&self, cell: &Cell) -> bool {
        match cell {
            Cell::Empty => true,
            Cell::Float(f) => f.is_nan(),
            Cell::Text(s) | Cell::Error(s) => self.na_values.iter().any(|na| na == s),
            _ => false,
        }
    }

    /// Text for `cell`, with every missing value replaced by the empty string.
    pub fn fill(&self, cell: &Cell) -> String {
        if self.is_missing(cell) {
            String::new()
        } else {
            cell.to_text().unwrap_or_default()
        }
    }
}

/// The header row and data rows of one worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Spreadsheet {
    header: Vec<Cell>,
    rows: Vec<Vec<Cell>>,
}

impl Spreadsheet {
    /// Build a sheet from raw rows; the first row is the header.
    ///
    /// Rows are padded with empty cells to the width of the widest row.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut rows = rows.into_iter().map(|mut row| {
            row.resize(width, Cell::Empty);
            row
        });
        let header = rows.next().unwrap_or_default();
        Spreadsheet {
            header,
            rows: rows.collect(),
        }
    }

    /// Read the first worksheet, or the one called `sheet`.
    pub fn read(path: impl AsRef<Path>, sheet: Option<&str>) -> Result<Self, SheetError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = match sheet {
            Some(name) => {
                if !workbook.sheet_names().iter().any(|n| n == name) {
                    return Err(SheetError::NoSuchWorksheet(name.to_owned()));
                }
                workbook.worksheet_range(name)?
            }
            None => workbook
                .worksheet_range_at(0)
                .ok_or(SheetError::NoWorksheets)??,
        };
        Ok(Self::from_range(&range))
    }

    fn from_range(range: &Range<Data>) -> Self {
        Self::from_rows(
            range
                .rows()
                .map(|row| row.iter().map(Cell::from).collect())
                .collect(),
        )
    }

    pub fn header(&self) -> &[Cell] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<ColumnName> {
        let headers: Vec<Option<String>> = self.header.iter().map(Cell::to_text).collect();
        naming::column_names(headers.iter().map(Option::as_deref))
    }

    /// Every row rendered as text, missing values replaced by `""`.
    pub fn filled_rows(&self, policy: &MissingPolicy) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|cell| policy.fill(cell)).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_owned())
    }

    #[test]
    fn cells_render_as_text() {
        assert_eq!(Cell::Int(42).to_text().as_deref(), Some("42"));
        assert_eq!(Cell::Float(1.0).to_text().as_deref(), Some("1"));
        assert_eq!(Cell::Float(12.5).to_text().as_deref(), Some("12.5"));
        assert_eq!(Cell::Bool(true).to_text().as_deref(), Some("1"));
        let dt = NaiveDate::from_ymd_opt(2025, 4, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(
            Cell::DateTime(dt).to_text().as_deref(),
            Some("2025-04-02 09:30:00")
        );
        let dt = NaiveDate::from_ymd_opt(2025, 4, 2)
            .unwrap()
            .and_hms_milli_opt(9, 30, 0, 250)
            .unwrap();
        assert_eq!(
            Cell::DateTime(dt).to_text().as_deref(),
            Some("2025-04-02 09:30:00.250000")
        );
        assert_eq!(Cell::Error("#REF!".into()).to_text().as_deref(), Some("#REF!"));
        assert_eq!(Cell::Empty.to_text(), None);
        assert_eq!(Cell::Float(f64::NAN).to_text(), None);
    }

    #[test]
    fn missing_values_fill_as_empty_strings() {
        let policy = MissingPolicy::default();
        assert_eq!(policy.fill(&Cell::Empty), "");
        assert_eq!(policy.fill(&Cell::Error("#N/A".into())), "");
        assert_eq!(policy.fill(&Cell::Error("#DIV/0!".into())), "#DIV/0!");
        assert_eq!(policy.fill(&text("N/A")), "");
        assert_eq!(policy.fill(&text("nan")), "");
        assert_eq!(policy.fill(&text("Import")), "Import");
        assert_eq!(policy.fill(&text(" NA ")), " NA ");
    }

    #[test]
    fn custom_na_values_replace_the_defaults() {
        let policy = MissingPolicy::new(vec!["-"]);
        assert_eq!(policy.fill(&text("-")), "");
        assert_eq!(policy.fill(&text("NA")), "NA");
        assert_eq!(policy.fill(&Cell::Empty), "");
    }

    #[test]
    fn ragged_rows_are_padded() {
        let sheet = Spreadsheet::from_rows(vec![
            vec![text("a"), text("b"), text("c")],
            vec![text("1")],
            vec![text("1"), text("2"), text("3"), text("4")],
        ]);
        assert_eq!(sheet.column_count(), 4);
        assert!(sheet.rows().iter().all(|row| row.len() == 4));
        assert_eq!(sheet.header()[3], Cell::Empty);
        let names: Vec<_> = sheet.column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, ["a", "b", "c", "col_3"]);
    }

    #[test]
    fn numeric_headers_are_named_by_their_value() {
        let sheet = Spreadsheet::from_rows(vec![vec![Cell::Float(2024.0), Cell::Int(7), text("x")]]);
        let names: Vec<_> = sheet.column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, ["2024", "7", "x"]);
        assert_eq!(sheet.row_count(), 0);
    }

    #[test]
    fn empty_sheet_has_no_columns() {
        let sheet = Spreadsheet::from_rows(vec![]);
        assert_eq!(sheet.column_count(), 0);
        assert_eq!(sheet.row_count(), 0);
    }
}

//! Roster loading.
//!
//! Turns an uploaded `.csv`, `.xlsx` or `.xls` file into [`StudentRecord`]s.
//! Both formats are first flattened into a header row plus data rows of
//! [`Cell`]s so that column validation and score parsing are shared.

use crate::error::FeedbackError;
use crate::types::{StudentRecord, Subject, SubjectScores};
use calamine::{Data, Reader, Xls, Xlsx, open_workbook_from_rs};
use std::fmt::Display;
use std::io::Cursor;
use std::path::Path;

/// Columns every roster must contain (extra columns are ignored).
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "Name",
    "Email",
    "Physics",
    "Chemistry",
    "Maths",
    "CS",
    "English",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFormat {
    Csv,
    Xlsx,
    Xls,
}

impl RosterFormat {
    /// Picks the parser from the file extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self, FeedbackError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(RosterFormat::Csv),
            "xlsx" => Ok(RosterFormat::Xlsx),
            "xls" => Ok(RosterFormat::Xls),
            "" => Err(FeedbackError::UnsupportedFormat(format!(
                "'{filename}' has no extension; expected .csv, .xlsx or .xls"
            ))),
            other => Err(FeedbackError::UnsupportedFormat(format!(
                ".{other} (expected .csv, .xlsx or .xls)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Number(f64),
}

impl Cell {
    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Number(f) => f.to_string(),
        }
    }

    /// Integer scores; whole floats (`90.0`) are accepted since spreadsheets
    /// often store every number as a float.
    fn as_score(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            Cell::Number(f) => whole(*f),
            Cell::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole))
            }
            Cell::Empty => None,
        }
    }
}

/// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
fn whole(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Positions of the required columns inside a table's header row.
struct ColumnMap {
    name: usize,
    email: usize,
    subjects: [usize; 5],
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Result<Self, FeedbackError> {
        let find = |col: &str| headers.iter().position(|h| h.trim() == col);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| find(c).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(FeedbackError::MalformedInput(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        // Presence checked above.
        let idx = |col: &str| find(col).unwrap_or_default();
        Ok(Self {
            name: idx("Name"),
            email: idx("Email"),
            subjects: Subject::ALL.map(|s| idx(s.column())),
        })
    }
}

/// Parses an uploaded roster into student records, preserving row order.
///
/// # Errors
/// - [`FeedbackError::UnsupportedFormat`] for any extension other than csv/xlsx/xls.
/// - [`FeedbackError::MalformedInput`] for unreadable files, missing columns,
///   blank names/emails or non-integer scores.
pub fn load_roster(filename: &str, bytes: &[u8]) -> Result<Vec<StudentRecord>, FeedbackError> {
    let format = RosterFormat::from_filename(filename)?;
    let table = match format {
        RosterFormat::Csv => read_csv(bytes)?,
        RosterFormat::Xlsx => read_workbook::<Xlsx<Cursor<&[u8]>>>(bytes)?,
        RosterFormat::Xls => read_workbook::<Xls<Cursor<&[u8]>>>(bytes)?,
    };

    let columns = ColumnMap::resolve(&table.headers)?;
    let mut students = Vec::with_capacity(table.rows.len());

    for (i, row) in table.rows.iter().enumerate() {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        // +1 for the header, +1 for 1-based numbering.
        let line = i + 2;
        students.push(parse_row(row, &columns, line)?);
    }

    tracing::debug!(filename, ?format, students = students.len(), "Roster loaded");
    Ok(students)
}

fn parse_row(row: &[Cell], columns: &ColumnMap, line: usize) -> Result<StudentRecord, FeedbackError> {
    let cell = |idx: usize| row.get(idx).cloned().unwrap_or(Cell::Empty);

    let name = cell(columns.name).as_text();
    if name.is_empty() {
        return Err(FeedbackError::MalformedInput(format!(
            "row {line}: Name is empty"
        )));
    }
    let email = cell(columns.email).as_text();
    if email.is_empty() {
        return Err(FeedbackError::MalformedInput(format!(
            "row {line}: Email is empty for {name}"
        )));
    }

    let mut values = [0i64; 5];
    for (slot, (subject, idx)) in values
        .iter_mut()
        .zip(Subject::ALL.iter().zip(columns.subjects))
    {
        let raw = cell(idx);
        *slot = raw.as_score().ok_or_else(|| {
            FeedbackError::MalformedInput(format!(
                "row {line}: {} score '{}' is not a whole number",
                subject.column(),
                raw.as_text()
            ))
        })?;
    }

    Ok(StudentRecord {
        name,
        email,
        scores: SubjectScores::from_ordered(values),
    })
}

fn read_csv(bytes: &[u8]) -> Result<Table, FeedbackError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| FeedbackError::MalformedInput(format!("unreadable CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record =
            result.map_err(|e| FeedbackError::MalformedInput(format!("unreadable CSV: {e}")))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(Table { headers, rows })
}

fn read_workbook<'a, R>(bytes: &'a [u8]) -> Result<Table, FeedbackError>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: Display,
{
    let mut workbook: R = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| FeedbackError::MalformedInput(format!("unreadable workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FeedbackError::MalformedInput("workbook has no worksheets".into()))?
        .map_err(|e| FeedbackError::MalformedInput(format!("unreadable worksheet: {e}")))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .ok_or_else(|| FeedbackError::MalformedInput("worksheet is empty".into()))?
        .iter()
        .map(|d| cell_from_data(d).as_text())
        .collect();
    let rows = rows.map(|r| r.iter().map(cell_from_data).collect()).collect();

    Ok(Table { headers, rows })
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

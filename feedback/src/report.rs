//! Summary spreadsheet export.
//!
//! One `.xlsx` per batch, named after the teacher. A later batch for the same
//! teacher overwrites the file.

use crate::error::ExportError;
use crate::types::{FeedbackRecord, Subject};
use rust_xlsxwriter::{Format, FormatAlign, Workbook};
use std::path::{Path, PathBuf};
use util::paths::ensure_dir;

pub const REPORT_HEADERS: [&str; 8] = [
    "Name",
    "Email",
    "Physics",
    "Chemistry",
    "Maths",
    "CS",
    "English",
    "Feedback",
];

/// `feedback_summary_<teacher>.xlsx`. Every character of the teacher name
/// outside `[A-Za-z0-9._-]` becomes `_` and runs of dots collapse to one, so
/// the name is a single path component that needs no URL escaping.
pub fn report_filename(teacher_name: &str) -> String {
    let mut safe = String::with_capacity(teacher_name.len());
    for c in teacher_name.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            c
        } else {
            '_'
        };
        if c == '.' && safe.ends_with('.') {
            continue;
        }
        safe.push(c);
    }
    // A trailing dot would meet the extension's dot.
    let safe = safe.trim_end_matches('.');
    format!("feedback_summary_{safe}.xlsx")
}

/// Writes `rows` (in order) to `<dir>/<report_filename(teacher_name)>` and
/// returns the path. A header-only sheet is written when `rows` is empty.
pub fn export_report(
    dir: &Path,
    teacher_name: &str,
    rows: &[FeedbackRecord],
) -> Result<PathBuf, ExportError> {
    ensure_dir(dir)?;
    let path = dir.join(report_filename(teacher_name));

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Feedback")?;

    let header = Format::new().set_bold();
    let wrapped = Format::new().set_text_wrap().set_align(FormatAlign::Top);

    for (col, title) in REPORT_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }
    sheet.set_column_width(0, 24)?;
    sheet.set_column_width(1, 30)?;
    sheet.set_column_width(7, 100)?;

    for (i, record) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &record.student_name)?;
        sheet.write_string(row, 1, &record.email)?;
        for (offset, subject) in Subject::ALL.iter().enumerate() {
            sheet.write_number(row, 2 + offset as u16, record.scores.get(*subject) as f64)?;
        }
        sheet.write_string_with_format(row, 7, &record.feedback_text, &wrapped)?;
    }

    workbook.save(&path)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Summary report written");
    Ok(path)
}

//! Class-wide statistics.

use crate::error::FeedbackError;
use crate::types::{ClassStats, StudentRecord, Subject, SubjectStats};

/// Round a float to two decimal places.
#[inline]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Computes the mean (2 dp) and maximum of every subject over the whole roster.
///
/// # Errors
/// [`FeedbackError::EmptyRoster`] when `students` is empty; the mean is undefined.
pub fn compute_subject_stats(students: &[StudentRecord]) -> Result<ClassStats, FeedbackError> {
    if students.is_empty() {
        return Err(FeedbackError::EmptyRoster);
    }

    let count = students.len() as f64;
    let subjects = Subject::ALL.map(|subject| {
        let scores = students.iter().map(|s| s.scores.get(subject));
        let total: i128 = scores.clone().map(i128::from).sum();
        let maximum = scores.max().unwrap_or_default();

        SubjectStats {
            subject,
            average: round2(total as f64 / count),
            maximum,
        }
    });

    Ok(ClassStats::new(subjects))
}

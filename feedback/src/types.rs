//! Domain types shared by every stage of a feedback batch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five subjects every roster must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    Physics,
    Chemistry,
    Maths,
    #[serde(rename = "CS")]
    Cs,
    English,
}

impl Subject {
    /// Roster and report column order.
    pub const ALL: [Subject; 5] = [
        Subject::Physics,
        Subject::Chemistry,
        Subject::Maths,
        Subject::Cs,
        Subject::English,
    ];

    /// Header used in uploaded rosters and the exported report.
    pub fn column(self) -> &'static str {
        match self {
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Maths => "Maths",
            Subject::Cs => "CS",
            Subject::English => "English",
        }
    }

    /// Human-readable name used when talking to the generation service.
    pub fn display_name(self) -> &'static str {
        match self {
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Maths => "Mathematics",
            Subject::Cs => "Computer Science",
            Subject::English => "English",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One integer score per subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectScores {
    pub physics: i64,
    pub chemistry: i64,
    pub maths: i64,
    pub cs: i64,
    pub english: i64,
}

impl SubjectScores {
    pub fn get(&self, subject: Subject) -> i64 {
        match subject {
            Subject::Physics => self.physics,
            Subject::Chemistry => self.chemistry,
            Subject::Maths => self.maths,
            Subject::Cs => self.cs,
            Subject::English => self.english,
        }
    }

    /// Builds scores from values ordered like [`Subject::ALL`].
    pub fn from_ordered(values: [i64; 5]) -> Self {
        let [physics, chemistry, maths, cs, english] = values;
        Self {
            physics,
            chemistry,
            maths,
            cs,
            english,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Subject, i64)> + '_ {
        Subject::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

/// A single roster row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentRecord {
    pub name: String,
    pub email: String,
    pub scores: SubjectScores,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubjectStats {
    pub subject: Subject,
    /// Arithmetic mean rounded to two decimal places.
    pub average: f64,
    pub maximum: i64,
}

/// Class-wide statistics for all five subjects. Computed once per batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStats {
    subjects: [SubjectStats; 5],
}

impl ClassStats {
    /// `subjects` must be ordered like [`Subject::ALL`].
    pub(crate) fn new(subjects: [SubjectStats; 5]) -> Self {
        Self { subjects }
    }

    pub fn get(&self, subject: Subject) -> &SubjectStats {
        // Discriminants follow `Subject::ALL`.
        &self.subjects[subject as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubjectStats> {
        self.subjects.iter()
    }
}

/// Feedback generated for one student; what gets mailed, stored and reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRecord {
    pub student_name: String,
    pub email: String,
    pub scores: SubjectScores,
    pub feedback_text: String,
}

impl FeedbackRecord {
    pub fn new(student: &StudentRecord, feedback_text: impl Into<String>) -> Self {
        Self {
            student_name: student.name.clone(),
            email: student.email.clone(),
            scores: student.scores,
            feedback_text: feedback_text.into(),
        }
    }
}

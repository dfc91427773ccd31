//! Prompt construction for the text-generation service.
//!
//! The prompt carries the student's scores next to the class average and
//! maximum, plus a precomputed guidance tag per subject so that the praise and
//! improvement rules do not depend on the model doing arithmetic.

use crate::types::{ClassStats, StudentRecord, Subject};
use serde::Serialize;
use std::fmt::Write;

/// Scores below this fraction of the maximum marks get improvement suggestions.
pub const IMPROVEMENT_THRESHOLD: f64 = 0.85;

/// Word cap given to the generation service.
pub const MAX_WORDS: usize = 200;

/// Form parameters shared by every student in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptContext {
    pub teacher_name: String,
    pub school_name: String,
    pub class_name: String,
    /// Maximum marks per subject.
    pub max_marks: f64,
}

/// How one subject score compares to the class and to the maximum marks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectStanding {
    pub subject: Subject,
    pub score: i64,
    pub class_average: f64,
    pub class_maximum: i64,
    pub above_average: bool,
    pub needs_improvement: bool,
}

impl SubjectStanding {
    fn guidance(&self) -> String {
        let mut tags = Vec::new();
        if self.above_average {
            tags.push("above class average: praise this");
        }
        if self.needs_improvement {
            tags.push("below 85% of maximum marks: suggest improvement and learning resources");
        }
        if tags.is_empty() {
            tags.push("steady: brief encouragement");
        }
        tags.join("; ")
    }
}

/// Classifies every subject for one student.
pub fn subject_standings(
    student: &StudentRecord,
    stats: &ClassStats,
    max_marks: f64,
) -> Vec<SubjectStanding> {
    let threshold = IMPROVEMENT_THRESHOLD * max_marks;
    student
        .scores
        .iter()
        .map(|(subject, score)| {
            let class = stats.get(subject);
            SubjectStanding {
                subject,
                score,
                class_average: class.average,
                class_maximum: class.maximum,
                above_average: (score as f64) > class.average,
                needs_improvement: (score as f64) < threshold,
            }
        })
        .collect()
}

/// `100.0` → `"100"`, `72.5` → `"72.5"`.
pub fn format_marks(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Builds the instruction sent to the generation service for one student.
pub fn build_prompt(student: &StudentRecord, stats: &ClassStats, ctx: &PromptContext) -> String {
    let max_marks = format_marks(ctx.max_marks);
    let threshold = format_marks(IMPROVEMENT_THRESHOLD * ctx.max_marks);

    let mut out = String::new();
    out.push_str(
        "You are a teacher writing a personalized academic feedback email to a student, \
         based on their marks in five subjects and the performance of the whole class.\n\n",
    );

    out.push_str("Student details:\n");
    let _ = writeln!(out, "- Name: {}", student.name);
    let _ = writeln!(out, "- Class: {}", ctx.class_name);
    let _ = writeln!(out, "- School: {}", ctx.school_name);
    let _ = writeln!(out, "- Maximum marks per subject: {max_marks}");
    out.push('\n');

    out.push_str("Student's performance (score, class average, class maximum, guidance):\n");
    for standing in subject_standings(student, stats, ctx.max_marks) {
        let _ = writeln!(
            out,
            "- {}: {} (Class Avg: {}, Max: {}) -> {}",
            standing.subject.display_name(),
            standing.score,
            standing.class_average,
            standing.class_maximum,
            standing.guidance(),
        );
    }
    out.push('\n');

    out.push_str("Instructions:\n");
    out.push_str("1. Use a polite and motivating tone.\n");
    out.push_str("2. Praise the student for every subject where they scored above the class average.\n");
    let _ = writeln!(
        out,
        "3. For every subject below 85% of the maximum marks (below {threshold}), suggest concrete \
         ways to improve and name helpful YouTube videos or searches (e.g. \"Class 12 CS Basics\")."
    );
    let _ = writeln!(
        out,
        "4. Keep the message personalized and under {MAX_WORDS} words."
    );
    let _ = writeln!(out, "5. Sign the email as {}.", ctx.teacher_name);
    out.push('\n');

    out.push_str(
        "Return only the final email body; a program will send it to the student unchanged. \
         Do not start with a subject line, do not add lines such as \"Here is your email\", \
         and do not mention that the text was generated.\n",
    );

    out
}

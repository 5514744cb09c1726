// School domain models - schools, the teacher dashboard and spotted feeds.

use crate::core::accounts::User;
use crate::core::forum::{ThreadPage, ThreadView};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct School {
    pub id: i64,
    pub name: String,
    /// Maximum number of students; 0 means no limit.
    pub student_limit: u32,
    pub created: DateTime<Utc>,
}

impl School {
    pub fn is_full(&self, student_count: u64) -> bool {
        self.student_limit > 0 && student_count >= u64::from(self.student_limit)
    }
}

/// Everything a teacher manages on one screen.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub school: School,
    pub students: Vec<User>,
    pub threads: Vec<ThreadPage>,
}

/// A school's spotted board as its members see it.
#[derive(Debug, Clone, Serialize)]
pub struct SpottedFeed {
    pub school: School,
    pub threads: Vec<ThreadView>,
}

/// A rendered CSV download.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

/// Lenient parse of the student limit form field: anything that is not a
/// non-negative integer counts as "no limit".
pub fn parse_student_limit(raw: &str) -> u32 {
    raw.trim().parse::<u32>().unwrap_or(0)
}

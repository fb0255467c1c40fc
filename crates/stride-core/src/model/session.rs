use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::user::validate_required;

/// One scheduled occurrence of a course, with its attendance roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub course_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(default)]
    pub exercises: Vec<String>,
    /// Client ids. Treated as a set; the store drops repeats on write.
    #[serde(default)]
    pub attendance: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        course_id: impl Into<String>,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Self {
        Self {
            id: id.into(),
            course_id: course_id.into(),
            date,
            time,
            exercises: Vec::new(),
            attendance: Vec::new(),
            notes: None,
        }
    }

    pub fn with_exercises(mut self, exercises: Vec<String>) -> Self {
        self.exercises = exercises;
        self
    }

    pub fn with_attendance(mut self, attendance: Vec<String>) -> Self {
        self.attendance = attendance;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn attended_by(&self, client_id: &str) -> bool {
        self.attendance.iter().any(|c| c == client_id)
    }

    pub fn attendance_count(&self) -> usize {
        self.attendance.len()
    }

    /// Drop repeated client ids, keeping the first occurrence.
    pub(crate) fn dedup_attendance(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.attendance.retain(|c| seen.insert(c.clone()));
    }
}

pub fn validate_session(session: &Session) -> Result<()> {
    validate_required("id", &session.id)?;
    validate_required("courseId", &session.course_id)?;
    Ok(())
}

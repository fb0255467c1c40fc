use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StrideError};
use crate::model::user::validate_required;

pub const MAX_PERCENT: u8 = 100;

/// A (client, course) relationship with progress and attendance counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub client_id: String,
    pub course_id: String,
    pub enrolled_at: DateTime<Utc>,
    /// 0 to 100.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub sessions_attended: u32,
    #[serde(default)]
    pub total_sessions: u32,
}

impl Enrollment {
    /// A fresh enrollment: no progress, nothing attended yet.
    pub fn new(
        id: impl Into<String>,
        client_id: impl Into<String>,
        course_id: impl Into<String>,
        total_sessions: u32,
    ) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            course_id: course_id.into(),
            enrolled_at: Utc::now(),
            progress: 0,
            sessions_attended: 0,
            total_sessions,
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(MAX_PERCENT);
        self
    }

    pub fn with_sessions_attended(mut self, attended: u32) -> Self {
        self.sessions_attended = attended;
        self
    }

    pub fn with_enrolled_at(mut self, at: DateTime<Utc>) -> Self {
        self.enrolled_at = at;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.progress >= MAX_PERCENT
    }
}

/// A per-session performance score for a client. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: String,
    pub client_id: String,
    pub session_id: String,
    pub course_id: String,
    pub date: NaiveDate,
    /// 0 to 100.
    pub performance: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ProgressRecord {
    pub fn new(
        id: impl Into<String>,
        client_id: impl Into<String>,
        session_id: impl Into<String>,
        course_id: impl Into<String>,
        date: NaiveDate,
        performance: u8,
    ) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            session_id: session_id.into(),
            course_id: course_id.into(),
            date,
            performance: performance.min(MAX_PERCENT),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

fn validate_percent(field: &str, value: u8) -> Result<()> {
    if value > MAX_PERCENT {
        return Err(StrideError::InvalidInput(format!(
            "{field} must be between 0 and {MAX_PERCENT}"
        )));
    }
    Ok(())
}

pub fn validate_enrollment(enrollment: &Enrollment) -> Result<()> {
    validate_required("id", &enrollment.id)?;
    validate_required("clientId", &enrollment.client_id)?;
    validate_required("courseId", &enrollment.course_id)?;
    validate_percent("progress", enrollment.progress)?;
    Ok(())
}

pub fn validate_progress_record(record: &ProgressRecord) -> Result<()> {
    validate_required("id", &record.id)?;
    validate_required("clientId", &record.client_id)?;
    validate_required("sessionId", &record.session_id)?;
    validate_required("courseId", &record.course_id)?;
    validate_percent("performance", record.performance)?;
    Ok(())
}

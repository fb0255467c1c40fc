use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    validate_course, validate_enrollment, validate_progress_record, validate_required,
    validate_session, Course, Enrollment, ProgressRecord, Session,
};

/// A tagged request to create, update or delete an entity.
///
/// Serialized the same way the view layer builds its actions:
/// `{"type": "ADD_COURSE", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    AddCourse(Course),
    UpdateCourse(Course),
    DeleteCourse(String),
    AddEnrollment(Enrollment),
    UpdateEnrollment(Enrollment),
    DeleteEnrollment(String),
    AddSession(Session),
    UpdateSession(Session),
    DeleteSession(String),
    RecordAttendance(AttendanceMark),
    AddProgressRecord(ProgressRecord),
}

impl Command {
    /// The wire tag, e.g. `ADD_COURSE`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddCourse(_) => "ADD_COURSE",
            Self::UpdateCourse(_) => "UPDATE_COURSE",
            Self::DeleteCourse(_) => "DELETE_COURSE",
            Self::AddEnrollment(_) => "ADD_ENROLLMENT",
            Self::UpdateEnrollment(_) => "UPDATE_ENROLLMENT",
            Self::DeleteEnrollment(_) => "DELETE_ENROLLMENT",
            Self::AddSession(_) => "ADD_SESSION",
            Self::UpdateSession(_) => "UPDATE_SESSION",
            Self::DeleteSession(_) => "DELETE_SESSION",
            Self::RecordAttendance(_) => "RECORD_ATTENDANCE",
            Self::AddProgressRecord(_) => "ADD_PROGRESS_RECORD",
        }
    }

    /// Id of the entity the command targets.
    pub fn target_id(&self) -> &str {
        match self {
            Self::AddCourse(c) | Self::UpdateCourse(c) => &c.id,
            Self::AddEnrollment(e) | Self::UpdateEnrollment(e) => &e.id,
            Self::AddSession(s) | Self::UpdateSession(s) => &s.id,
            Self::RecordAttendance(m) => &m.session_id,
            Self::AddProgressRecord(r) => &r.id,
            Self::DeleteCourse(id) | Self::DeleteEnrollment(id) | Self::DeleteSession(id) => id,
        }
    }

    /// Field-level checks on the payload, before it reaches the store.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::AddCourse(c) | Self::UpdateCourse(c) => validate_course(c),
            Self::AddEnrollment(e) | Self::UpdateEnrollment(e) => validate_enrollment(e),
            Self::AddSession(s) | Self::UpdateSession(s) => validate_session(s),
            Self::AddProgressRecord(r) => validate_progress_record(r),
            Self::RecordAttendance(m) => {
                validate_required("sessionId", &m.session_id)?;
                validate_required("clientId", &m.client_id)
            }
            Self::DeleteCourse(id) | Self::DeleteEnrollment(id) | Self::DeleteSession(id) => {
                validate_required("id", id)
            }
        }
    }
}

/// Mark a client present or absent for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    pub session_id: String,
    pub client_id: String,
    #[serde(default = "default_present")]
    pub present: bool,
}

fn default_present() -> bool {
    true
}

/// What a successful command did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    /// The target already matched; the snapshot is unchanged.
    Unchanged,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// What happens to sessions, enrollments and progress records when their
/// course is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Leave dependents in place; scoped views skip them.
    #[default]
    Orphan,
    Cascade,
    /// Refuse to delete a course that still has dependents.
    Restrict,
}

impl std::fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Orphan => write!(f, "orphan"),
            Self::Cascade => write!(f, "cascade"),
            Self::Restrict => write!(f, "restrict"),
        }
    }
}

impl std::str::FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "orphan" => Ok(Self::Orphan),
            "cascade" => Ok(Self::Cascade),
            "restrict" => Ok(Self::Restrict),
            _ => Err(format!("unknown delete policy: {s}")),
        }
    }
}

/// Store-level rules that commands are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreRules {
    pub delete_policy: DeletePolicy,
    pub enforce_capacity: bool,
}

impl Default for StoreRules {
    fn default() -> Self {
        Self {
            delete_policy: DeletePolicy::Orphan,
            enforce_capacity: true,
        }
    }
}

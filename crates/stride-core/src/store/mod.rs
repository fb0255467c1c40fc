//! The entity store: canonical in-memory collections of every entity.
//!
//! Each collection sits behind its own `Arc`. Applying a command clones only
//! the collections it touches, so older snapshots stay valid and cheap to
//! keep around (undo, concurrent readers).

mod apply;
mod command;

pub use command::{AttendanceMark, Command, DeletePolicy, Outcome, StoreRules};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::*;

/// Owned, serializable form of a store. This is the seed/export shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub progress_records: Vec<ProgressRecord>,
}

/// One immutable snapshot of all entity collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    users: Arc<Vec<User>>,
    courses: Arc<Vec<Course>>,
    sessions: Arc<Vec<Session>>,
    enrollments: Arc<Vec<Enrollment>>,
    progress_records: Arc<Vec<ProgressRecord>>,
}

impl Store {
    /// Build a store from seed data, normalizing the derived fields: session
    /// rosters lose duplicate ids and each course's `current_enrollment` is
    /// recounted from the enrollments.
    pub fn new(data: StoreData) -> Self {
        let StoreData {
            users,
            mut courses,
            mut sessions,
            enrollments,
            progress_records,
        } = data;

        for session in &mut sessions {
            session.dedup_attendance();
        }

        let mut counts: HashMap<&str, u32> = HashMap::new();
        for e in &enrollments {
            *counts.entry(e.course_id.as_str()).or_insert(0) += 1;
        }
        for course in &mut courses {
            let actual = counts.get(course.id.as_str()).copied().unwrap_or(0);
            if course.current_enrollment != actual {
                tracing::debug!(
                    course_id = %course.id,
                    stored = course.current_enrollment,
                    actual,
                    "store: recounted currentEnrollment"
                );
                course.current_enrollment = actual;
            }
        }

        Self {
            users: Arc::new(users),
            courses: Arc::new(courses),
            sessions: Arc::new(sessions),
            enrollments: Arc::new(enrollments),
            progress_records: Arc::new(progress_records),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let data: StoreData = serde_json::from_str(json)?;
        Ok(Self::new(data))
    }

    /// Load a seed file in the [`StoreData`] JSON shape.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_data(&self) -> StoreData {
        StoreData {
            users: self.users.as_ref().clone(),
            courses: self.courses.as_ref().clone(),
            sessions: self.sessions.as_ref().clone(),
            enrollments: self.enrollments.as_ref().clone(),
            progress_records: self.progress_records.as_ref().clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_data())?)
    }

    // -- Collections --

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn enrollments(&self) -> &[Enrollment] {
        &self.enrollments
    }

    pub fn progress_records(&self) -> &[ProgressRecord] {
        &self.progress_records
    }

    // -- Lookups --

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn enrollment(&self, id: &str) -> Option<&Enrollment> {
        self.enrollments.iter().find(|e| e.id == id)
    }

    /// The enrollment of `client_id` in `course_id`, if any.
    pub fn enrollment_for(&self, client_id: &str, course_id: &str) -> Option<&Enrollment> {
        self.enrollments
            .iter()
            .find(|e| e.client_id == client_id && e.course_id == course_id)
    }

    pub fn enrollments_for_course<'a>(
        &'a self,
        course_id: &'a str,
    ) -> impl Iterator<Item = &'a Enrollment> + 'a {
        self.enrollments.iter().filter(move |e| e.course_id == course_id)
    }

    pub fn enrollments_for_client<'a>(
        &'a self,
        client_id: &'a str,
    ) -> impl Iterator<Item = &'a Enrollment> + 'a {
        self.enrollments.iter().filter(move |e| e.client_id == client_id)
    }

    pub fn sessions_for_course<'a>(
        &'a self,
        course_id: &'a str,
    ) -> impl Iterator<Item = &'a Session> + 'a {
        self.sessions.iter().filter(move |s| s.course_id == course_id)
    }

    pub fn enrollment_count(&self, course_id: &str) -> u32 {
        self.enrollments_for_course(course_id).count() as u32
    }

    /// True when `other` shares every collection allocation with `self`,
    /// i.e. nothing was copied between the two snapshots.
    pub fn shares_all_with(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.users, &other.users)
            && Arc::ptr_eq(&self.courses, &other.courses)
            && Arc::ptr_eq(&self.sessions, &other.sessions)
            && Arc::ptr_eq(&self.enrollments, &other.enrollments)
            && Arc::ptr_eq(&self.progress_records, &other.progress_records)
    }
}

impl From<StoreData> for Store {
    fn from(data: StoreData) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> StoreData {
        let mut course = Course::new("c1", "Yoga", "t1", Difficulty::Beginner, 10);
        course.current_enrollment = 5;
        StoreData {
            users: vec![User::new("u1", "Sarah", "sarah@example.com", Role::Client)],
            courses: vec![course],
            enrollments: vec![Enrollment::new("e1", "u1", "c1", 12)],
            ..Default::default()
        }
    }

    #[test]
    fn test_new_recounts_current_enrollment() {
        let store = Store::new(data());
        assert_eq!(store.course("c1").unwrap().current_enrollment, 1);
        assert_eq!(store.enrollment_count("c1"), 1);
    }

    #[test]
    fn test_lookups() {
        let store = Store::new(data());
        assert!(store.user("u1").is_some());
        assert!(store.course("missing").is_none());
        assert_eq!(store.enrollment_for("u1", "c1").unwrap().id, "e1");
        assert!(store.enrollment_for("u2", "c1").is_none());
        assert_eq!(store.enrollments_for_client("u1").count(), 1);
    }

    #[test]
    fn test_json_roundtrip() {
        let store = Store::new(data());
        let json = store.to_json().unwrap();
        assert!(json.contains("\"progressRecords\""));
        let parsed = Store::from_json(&json).unwrap();
        assert_eq!(parsed, store);
    }

    #[test]
    fn test_from_json_missing_collections_default_empty() {
        let store = Store::from_json(r#"{"users": []}"#).unwrap();
        assert!(store.courses().is_empty());
        assert!(store.progress_records().is_empty());
    }

    #[test]
    fn test_clone_shares_collections() {
        let store = Store::new(data());
        let copy = store.clone();
        assert!(store.shares_all_with(&copy));
    }
}

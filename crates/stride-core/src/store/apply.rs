use std::sync::Arc;

use crate::error::{Result, StrideError};
use crate::model::*;

use super::command::{AttendanceMark, Command, DeletePolicy, Outcome, StoreRules};
use super::Store;

impl Store {
    /// Apply one command and return the resulting snapshot.
    ///
    /// `self` is never modified. On error no partial change is visible
    /// because the caller still holds the untouched snapshot.
    pub fn apply(&self, command: Command, rules: &StoreRules) -> Result<(Store, Outcome)> {
        command.validate()?;
        match command {
            Command::AddCourse(course) => self.add_course(course),
            Command::UpdateCourse(course) => self.update_course(course),
            Command::DeleteCourse(id) => self.delete_course(&id, rules.delete_policy),
            Command::AddEnrollment(enrollment) => self.add_enrollment(enrollment, rules),
            Command::UpdateEnrollment(enrollment) => self.update_enrollment(enrollment, rules),
            Command::DeleteEnrollment(id) => self.delete_enrollment(&id),
            Command::AddSession(session) => self.add_session(session),
            Command::UpdateSession(session) => self.update_session(session),
            Command::DeleteSession(id) => self.delete_session(&id),
            Command::RecordAttendance(mark) => self.record_attendance(mark),
            Command::AddProgressRecord(record) => self.add_progress_record(record),
        }
    }

    fn unchanged(&self) -> Result<(Store, Outcome)> {
        Ok((self.clone(), Outcome::Unchanged))
    }

    fn require_course(&self, course_id: &str) -> Result<&Course> {
        self.course(course_id)
            .ok_or_else(|| StrideError::NotFound(format!("course {course_id}")))
    }

    /// Reset `current_enrollment` of one course from the enrollment collection.
    fn recount(&mut self, course_id: &str) {
        let count = self.enrollment_count(course_id);
        if let Some(course) = Arc::make_mut(&mut self.courses)
            .iter_mut()
            .find(|c| c.id == course_id)
        {
            course.current_enrollment = count;
        }
    }

    /// Move `sessions_attended` of each client's enrollment in `course_id`
    /// up or down by one. Clients without an enrollment are skipped.
    fn shift_attended(&mut self, course_id: &str, client_ids: &[String], present: bool) {
        if client_ids.is_empty() {
            return;
        }
        for enrollment in Arc::make_mut(&mut self.enrollments)
            .iter_mut()
            .filter(|e| e.course_id == course_id && client_ids.contains(&e.client_id))
        {
            enrollment.sessions_attended = if present {
                enrollment.sessions_attended + 1
            } else {
                enrollment.sessions_attended.saturating_sub(1)
            };
        }
    }

    // -- Courses --

    fn add_course(&self, mut course: Course) -> Result<(Store, Outcome)> {
        if self.course(&course.id).is_some() {
            return Err(StrideError::DuplicateId(format!("course {}", course.id)));
        }
        course.current_enrollment = self.enrollment_count(&course.id);

        let mut next = self.clone();
        Arc::make_mut(&mut next.courses).push(course);
        Ok((next, Outcome::Applied))
    }

    fn update_course(&self, mut course: Course) -> Result<(Store, Outcome)> {
        let idx = self
            .courses
            .iter()
            .position(|c| c.id == course.id)
            .ok_or_else(|| StrideError::NotFound(format!("course {}", course.id)))?;
        course.current_enrollment = self.courses[idx].current_enrollment;
        if self.courses[idx] == course {
            return self.unchanged();
        }

        let mut next = self.clone();
        Arc::make_mut(&mut next.courses)[idx] = course;
        Ok((next, Outcome::Applied))
    }

    fn delete_course(&self, id: &str, policy: DeletePolicy) -> Result<(Store, Outcome)> {
        let idx = self
            .courses
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StrideError::NotFound(format!("course {id}")))?;

        let has_sessions = self.sessions.iter().any(|s| s.course_id == id);
        let has_enrollments = self.enrollments.iter().any(|e| e.course_id == id);
        let has_records = self.progress_records.iter().any(|r| r.course_id == id);

        let mut next = self.clone();
        Arc::make_mut(&mut next.courses).remove(idx);

        match policy {
            DeletePolicy::Orphan => {
                if has_sessions || has_enrollments || has_records {
                    tracing::debug!(course_id = id, "store: course deleted, dependents orphaned");
                }
            }
            DeletePolicy::Restrict => {
                if has_sessions || has_enrollments || has_records {
                    return Err(StrideError::Conflict(format!(
                        "course {id} still has sessions, enrollments or progress records"
                    )));
                }
            }
            DeletePolicy::Cascade => {
                if has_sessions {
                    Arc::make_mut(&mut next.sessions).retain(|s| s.course_id != id);
                }
                if has_enrollments {
                    Arc::make_mut(&mut next.enrollments).retain(|e| e.course_id != id);
                }
                if has_records {
                    Arc::make_mut(&mut next.progress_records).retain(|r| r.course_id != id);
                }
            }
        }

        Ok((next, Outcome::Applied))
    }

    // -- Enrollments --

    fn add_enrollment(
        &self,
        enrollment: Enrollment,
        rules: &StoreRules,
    ) -> Result<(Store, Outcome)> {
        if self.enrollment(&enrollment.id).is_some() {
            return Err(StrideError::DuplicateId(format!("enrollment {}", enrollment.id)));
        }
        let course = self.require_course(&enrollment.course_id)?;
        if self
            .enrollment_for(&enrollment.client_id, &enrollment.course_id)
            .is_some()
        {
            return Err(StrideError::Conflict(format!(
                "client {} is already enrolled in course {}",
                enrollment.client_id, enrollment.course_id
            )));
        }
        if rules.enforce_capacity && self.enrollment_count(&course.id) >= course.max_capacity {
            return Err(StrideError::CapacityExceeded(format!(
                "course {} has no spots left ({} max)",
                course.id, course.max_capacity
            )));
        }

        let course_id = enrollment.course_id.clone();
        let mut next = self.clone();
        Arc::make_mut(&mut next.enrollments).push(enrollment);
        next.recount(&course_id);
        Ok((next, Outcome::Applied))
    }

    fn update_enrollment(
        &self,
        enrollment: Enrollment,
        rules: &StoreRules,
    ) -> Result<(Store, Outcome)> {
        let idx = self
            .enrollments
            .iter()
            .position(|e| e.id == enrollment.id)
            .ok_or_else(|| StrideError::NotFound(format!("enrollment {}", enrollment.id)))?;
        if self.enrollments[idx] == enrollment {
            return self.unchanged();
        }

        let previous_course = self.enrollments[idx].course_id.clone();
        if previous_course != enrollment.course_id {
            let course = self.require_course(&enrollment.course_id)?;
            if rules.enforce_capacity && self.enrollment_count(&course.id) >= course.max_capacity {
                return Err(StrideError::CapacityExceeded(format!(
                    "course {} has no spots left ({} max)",
                    course.id, course.max_capacity
                )));
            }
        }
        if let Some(other) = self.enrollment_for(&enrollment.client_id, &enrollment.course_id) {
            if other.id != enrollment.id {
                return Err(StrideError::Conflict(format!(
                    "client {} is already enrolled in course {}",
                    enrollment.client_id, enrollment.course_id
                )));
            }
        }

        let course_id = enrollment.course_id.clone();
        let mut next = self.clone();
        Arc::make_mut(&mut next.enrollments)[idx] = enrollment;
        if previous_course != course_id {
            next.recount(&previous_course);
            next.recount(&course_id);
        }
        Ok((next, Outcome::Applied))
    }

    fn delete_enrollment(&self, id: &str) -> Result<(Store, Outcome)> {
        let idx = self
            .enrollments
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StrideError::NotFound(format!("enrollment {id}")))?;

        let mut next = self.clone();
        let removed = Arc::make_mut(&mut next.enrollments).remove(idx);
        next.recount(&removed.course_id);
        Ok((next, Outcome::Applied))
    }

    // -- Sessions --

    fn add_session(&self, mut session: Session) -> Result<(Store, Outcome)> {
        if self.session(&session.id).is_some() {
            return Err(StrideError::DuplicateId(format!("session {}", session.id)));
        }
        self.require_course(&session.course_id)?;
        session.dedup_attendance();

        let mut next = self.clone();
        next.shift_attended(&session.course_id, &session.attendance, true);
        Arc::make_mut(&mut next.sessions).push(session);
        Ok((next, Outcome::Applied))
    }

    fn update_session(&self, mut session: Session) -> Result<(Store, Outcome)> {
        let idx = self
            .sessions
            .iter()
            .position(|s| s.id == session.id)
            .ok_or_else(|| StrideError::NotFound(format!("session {}", session.id)))?;
        session.dedup_attendance();
        if self.sessions[idx] == session {
            return self.unchanged();
        }
        let previous = &self.sessions[idx];
        if previous.course_id != session.course_id {
            self.require_course(&session.course_id)?;
        }

        // Roster edits move the attendance counters the same way
        // RECORD_ATTENDANCE does, per (course, client).
        let mut next = self.clone();
        if previous.course_id == session.course_id {
            let dropped: Vec<String> = previous
                .attendance
                .iter()
                .filter(|c| !session.attended_by(c))
                .cloned()
                .collect();
            let added: Vec<String> = session
                .attendance
                .iter()
                .filter(|c| !previous.attended_by(c))
                .cloned()
                .collect();
            next.shift_attended(&session.course_id, &dropped, false);
            next.shift_attended(&session.course_id, &added, true);
        } else {
            next.shift_attended(&previous.course_id, &previous.attendance, false);
            next.shift_attended(&session.course_id, &session.attendance, true);
        }
        Arc::make_mut(&mut next.sessions)[idx] = session;
        Ok((next, Outcome::Applied))
    }

    fn delete_session(&self, id: &str) -> Result<(Store, Outcome)> {
        let idx = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| StrideError::NotFound(format!("session {id}")))?;

        let mut next = self.clone();
        let removed = Arc::make_mut(&mut next.sessions).remove(idx);
        next.shift_attended(&removed.course_id, &removed.attendance, false);
        Ok((next, Outcome::Applied))
    }

    /// Add or remove one client from a session roster. The client's
    /// enrollment in that course (if any) has `sessions_attended` moved with it.
    fn record_attendance(&self, mark: AttendanceMark) -> Result<(Store, Outcome)> {
        let idx = self
            .sessions
            .iter()
            .position(|s| s.id == mark.session_id)
            .ok_or_else(|| StrideError::NotFound(format!("session {}", mark.session_id)))?;
        let session = &self.sessions[idx];
        if session.attended_by(&mark.client_id) == mark.present {
            return self.unchanged();
        }
        let course_id = session.course_id.clone();

        let mut next = self.clone();
        let roster = &mut Arc::make_mut(&mut next.sessions)[idx].attendance;
        if mark.present {
            roster.push(mark.client_id.clone());
        } else {
            roster.retain(|c| c != &mark.client_id);
        }

        next.shift_attended(&course_id, std::slice::from_ref(&mark.client_id), mark.present);
        Ok((next, Outcome::Applied))
    }

    // -- Progress records --

    fn add_progress_record(&self, record: ProgressRecord) -> Result<(Store, Outcome)> {
        if self.progress_records.iter().any(|r| r.id == record.id) {
            return Err(StrideError::DuplicateId(format!("progress record {}", record.id)));
        }

        let mut next = self.clone();
        Arc::make_mut(&mut next.progress_records).push(record);
        Ok((next, Outcome::Applied))
    }
}

//! Derived statistics over a store snapshot.
//!
//! Every function here is pure and never fails: empty input yields 0 or an
//! empty list. Percentages are whole numbers rounded half-up, computed in
//! integer arithmetic so `1/3` is 33 and `1/2` is 50 on every platform.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::AnalyticsConfig;
use crate::model::{Course, Enrollment, ProgressRecord, Session};
use crate::store::Store;

/// `round(num / den)` half-up. 0 when `den` is 0.
pub fn rounded_div(num: u64, den: u64) -> u32 {
    if den == 0 {
        return 0;
    }
    ((2 * num + den) / (2 * den)) as u32
}

/// `round(part / whole * 100)` half-up. 0 when `whole` is 0.
pub fn percent(part: u64, whole: u64) -> u32 {
    rounded_div(part * 100, whole)
}

pub fn average_progress(enrollments: &[Enrollment]) -> u32 {
    let sum: u64 = enrollments.iter().map(|e| u64::from(e.progress)).sum();
    rounded_div(sum, enrollments.len() as u64)
}

/// Mean roster size across `sessions` as a share of `enrollment_count`.
pub fn attendance_rate(sessions: &[Session], enrollment_count: usize) -> u32 {
    let attended: u64 = sessions.iter().map(|s| s.attendance_count() as u64).sum();
    percent(attended, sessions.len() as u64 * enrollment_count as u64)
}

/// Enrollment counts per progress band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceDistribution {
    #[serde(rename = "0-50")]
    pub below_50: usize,
    #[serde(rename = "50-70")]
    pub from_50: usize,
    #[serde(rename = "70-85")]
    pub from_70: usize,
    #[serde(rename = "85-100")]
    pub from_85: usize,
}

impl PerformanceDistribution {
    pub fn total(&self) -> usize {
        self.below_50 + self.from_50 + self.from_70 + self.from_85
    }

    /// Labelled buckets in ascending order, for charts and tables.
    pub fn buckets(&self) -> [(&'static str, usize); 4] {
        [
            ("0-50%", self.below_50),
            ("50-70%", self.from_50),
            ("70-85%", self.from_70),
            ("85-100%", self.from_85),
        ]
    }
}

pub fn performance_distribution(enrollments: &[Enrollment]) -> PerformanceDistribution {
    let mut dist = PerformanceDistribution::default();
    for e in enrollments {
        match e.progress {
            0..=49 => dist.below_50 += 1,
            50..=69 => dist.from_50 += 1,
            70..=84 => dist.from_70 += 1,
            _ => dist.from_85 += 1,
        }
    }
    dist
}

/// Share of enrollments with `progress >= threshold`.
pub fn completion_rate(enrollments: &[Enrollment], threshold: u8) -> u32 {
    let done = enrollments.iter().filter(|e| e.progress >= threshold).count();
    percent(done as u64, enrollments.len() as u64)
}

/// Highest progress first; equal progress keeps input order.
pub fn top_performers(enrollments: &[Enrollment], n: usize) -> Vec<&Enrollment> {
    let mut ranked: Vec<&Enrollment> = enrollments.iter().collect();
    ranked.sort_by(|a, b| b.progress.cmp(&a.progress));
    ranked.truncate(n);
    ranked
}

pub fn at_risk_students(enrollments: &[Enrollment], threshold: u8) -> Vec<&Enrollment> {
    enrollments.iter().filter(|e| e.progress < threshold).collect()
}

pub fn average_performance(records: &[ProgressRecord]) -> u32 {
    let sum: u64 = records.iter().map(|r| u64::from(r.performance)).sum();
    rounded_div(sum, records.len() as u64)
}

/// Roster fill of a single session.
pub fn session_attendance_rate(session: &Session, enrolled: usize) -> u32 {
    percent(session.attendance_count() as u64, enrolled as u64)
}

/// Mean roster size, as a head count.
pub fn average_attendance(sessions: &[Session]) -> u32 {
    let attended: u64 = sessions.iter().map(|s| s.attendance_count() as u64).sum();
    rounded_div(attended, sessions.len() as u64)
}

/// Sessions attended over sessions planned, across a client's enrollments.
pub fn client_attendance_rate(enrollments: &[Enrollment]) -> u32 {
    let attended: u64 = enrollments.iter().map(|e| u64::from(e.sessions_attended)).sum();
    let total: u64 = enrollments.iter().map(|e| u64::from(e.total_sessions)).sum();
    percent(attended, total)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub session_id: String,
    pub course_id: String,
    pub date: NaiveDate,
    pub attendance: usize,
}

/// The last `limit` sessions in chronological order with their head counts.
pub fn attendance_trend(sessions: &[Session], limit: usize) -> Vec<TrendPoint> {
    let mut ordered: Vec<&Session> = sessions.iter().collect();
    ordered.sort_by_key(|s| (s.date, s.time));
    let skip = ordered.len().saturating_sub(limit);
    ordered
        .into_iter()
        .skip(skip)
        .map(|s| TrendPoint {
            session_id: s.id.clone(),
            course_id: s.course_id.clone(),
            date: s.date,
            attendance: s.attendance_count(),
        })
        .collect()
}

/// Sessions strictly after `today`, soonest first.
pub fn upcoming_sessions(sessions: &[Session], today: NaiveDate, limit: usize) -> Vec<&Session> {
    let mut upcoming: Vec<&Session> = sessions.iter().filter(|s| s.date > today).collect();
    upcoming.sort_by_key(|s| (s.date, s.time));
    upcoming.truncate(limit);
    upcoming
}

/// Most recent records first.
pub fn recent_progress(records: &[ProgressRecord], limit: usize) -> Vec<&ProgressRecord> {
    let mut recent: Vec<&ProgressRecord> = records.iter().collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(limit);
    recent
}

// -- Scoped views --

/// Which slice of the store a report covers. Empty fields don't filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(default)]
    pub trainer_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub course_id: Option<String>,
    /// Inclusive lower bound on session and record dates.
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on session and record dates.
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl Scope {
    pub fn trainer(trainer_id: impl Into<String>) -> Self {
        Self {
            trainer_id: Some(trainer_id.into()),
            ..Default::default()
        }
    }

    pub fn client(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            ..Default::default()
        }
    }

    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    fn in_range(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// Entities of one scope, copied out of a snapshot.
///
/// Only entities whose course still exists are included, so orphans left by
/// a course deletion never skew a report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopedView {
    pub courses: Vec<Course>,
    pub sessions: Vec<Session>,
    pub enrollments: Vec<Enrollment>,
    pub progress_records: Vec<ProgressRecord>,
}

impl ScopedView {
    pub fn new(store: &Store, scope: &Scope) -> Self {
        let client_matches = |id: &str| scope.client_id.as_deref().map_or(true, |c| c == id);

        let client_courses: Option<HashSet<&str>> = scope.client_id.as_deref().map(|client| {
            store
                .enrollments_for_client(client)
                .map(|e| e.course_id.as_str())
                .collect()
        });

        let courses: Vec<Course> = store
            .courses()
            .iter()
            .filter(|c| scope.trainer_id.as_deref().map_or(true, |t| c.trainer_id == t))
            .filter(|c| scope.course_id.as_deref().map_or(true, |id| c.id == id))
            .filter(|c| {
                client_courses
                    .as_ref()
                    .map_or(true, |ids| ids.contains(c.id.as_str()))
            })
            .cloned()
            .collect();
        let ids: HashSet<&str> = courses.iter().map(|c| c.id.as_str()).collect();

        let sessions = store
            .sessions()
            .iter()
            .filter(|s| ids.contains(s.course_id.as_str()) && scope.in_range(s.date))
            .cloned()
            .collect();
        let enrollments = store
            .enrollments()
            .iter()
            .filter(|e| ids.contains(e.course_id.as_str()) && client_matches(&e.client_id))
            .cloned()
            .collect();
        let progress_records = store
            .progress_records()
            .iter()
            .filter(|r| {
                ids.contains(r.course_id.as_str())
                    && client_matches(&r.client_id)
                    && scope.in_range(r.date)
            })
            .cloned()
            .collect();

        Self {
            courses,
            sessions,
            enrollments,
            progress_records,
        }
    }
}

// -- Reports --

/// One row of the per-course table in a trainer report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseReport {
    pub course_id: String,
    pub title: String,
    pub enrollment: usize,
    pub capacity: u32,
    pub session_count: usize,
    pub average_progress: u32,
    /// Mean score over this course's progress records.
    pub average_performance: u32,
    pub completion_rate: u32,
    pub attendance_rate: u32,
}

impl CourseReport {
    pub fn build(course: &Course, view: &ScopedView, completion_threshold: u8) -> Self {
        let enrollments: Vec<Enrollment> = view
            .enrollments
            .iter()
            .filter(|e| e.course_id == course.id)
            .cloned()
            .collect();
        let sessions: Vec<Session> = view
            .sessions
            .iter()
            .filter(|s| s.course_id == course.id)
            .cloned()
            .collect();
        let records: Vec<ProgressRecord> = view
            .progress_records
            .iter()
            .filter(|r| r.course_id == course.id)
            .cloned()
            .collect();

        Self {
            course_id: course.id.clone(),
            title: course.title.clone(),
            enrollment: enrollments.len(),
            capacity: course.max_capacity,
            session_count: sessions.len(),
            average_progress: average_progress(&enrollments),
            average_performance: average_performance(&records),
            completion_rate: completion_rate(&enrollments, completion_threshold),
            attendance_rate: attendance_rate(&sessions, enrollments.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerReport {
    pub course_count: usize,
    pub enrollment_count: usize,
    pub session_count: usize,
    pub average_attendance: u32,
    pub attendance_rate: u32,
    pub average_progress: u32,
    pub completion_rate: u32,
    pub distribution: PerformanceDistribution,
    pub top_performers: Vec<Enrollment>,
    pub at_risk: Vec<Enrollment>,
    pub attendance_trend: Vec<TrendPoint>,
    pub courses: Vec<CourseReport>,
}

impl TrainerReport {
    pub fn build(view: &ScopedView, config: &AnalyticsConfig) -> Self {
        let enrollments = &view.enrollments;
        let sessions = &view.sessions;

        Self {
            course_count: view.courses.len(),
            enrollment_count: enrollments.len(),
            session_count: sessions.len(),
            average_attendance: average_attendance(sessions),
            attendance_rate: attendance_rate(sessions, enrollments.len()),
            average_progress: average_progress(enrollments),
            completion_rate: completion_rate(enrollments, config.completion_threshold),
            distribution: performance_distribution(enrollments),
            top_performers: top_performers(enrollments, config.top_performers)
                .into_iter()
                .cloned()
                .collect(),
            at_risk: at_risk_students(enrollments, config.at_risk_threshold)
                .into_iter()
                .cloned()
                .collect(),
            attendance_trend: attendance_trend(sessions, config.trend_sessions),
            courses: view
                .courses
                .iter()
                .map(|c| CourseReport::build(c, view, config.completion_threshold))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientReport {
    pub enrolled_courses: usize,
    pub completed_courses: usize,
    pub average_progress: u32,
    pub average_performance: u32,
    pub sessions_attended: u32,
    pub total_sessions: u32,
    pub attendance_rate: u32,
    pub recent_progress: Vec<ProgressRecord>,
    pub upcoming_sessions: Vec<Session>,
}

impl ClientReport {
    /// Build from a client-scoped view. `today` bounds the upcoming list.
    pub fn build(view: &ScopedView, today: NaiveDate, config: &AnalyticsConfig) -> Self {
        let enrollments = &view.enrollments;

        Self {
            enrolled_courses: enrollments.len(),
            completed_courses: enrollments.iter().filter(|e| e.is_completed()).count(),
            average_progress: average_progress(enrollments),
            average_performance: average_performance(&view.progress_records),
            sessions_attended: enrollments.iter().map(|e| e.sessions_attended).sum(),
            total_sessions: enrollments.iter().map(|e| e.total_sessions).sum(),
            attendance_rate: client_attendance_rate(enrollments),
            recent_progress: recent_progress(&view.progress_records, config.recent_records)
                .into_iter()
                .cloned()
                .collect(),
            upcoming_sessions: upcoming_sessions(&view.sessions, today, config.upcoming_sessions)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;
    use crate::store::StoreData;
    use chrono::NaiveTime;

    fn enrollment(id: &str, progress: u8) -> Enrollment {
        Enrollment::new(id, format!("u-{id}"), "c1", 12).with_progress(progress)
    }

    fn enrollments(progress: &[u8]) -> Vec<Enrollment> {
        progress
            .iter()
            .enumerate()
            .map(|(i, p)| enrollment(&format!("e{i}"), *p))
            .collect()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn session(id: &str, course: &str, d: u32, roster: &[&str]) -> Session {
        Session::new(id, course, date(d), NaiveTime::from_hms_opt(9, 0, 0).unwrap())
            .with_attendance(roster.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_rounding_half_up() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 200), 1);
        assert_eq!(rounded_div(3, 2), 2);
        assert_eq!(rounded_div(5, 4), 1);
        assert_eq!(percent(5, 0), 0);
    }

    #[test]
    fn test_empty_inputs_are_zero() {
        assert_eq!(average_progress(&[]), 0);
        assert_eq!(attendance_rate(&[], 0), 0);
        assert_eq!(attendance_rate(&[], 25), 0);
        assert_eq!(completion_rate(&[], 80), 0);
        assert_eq!(average_performance(&[]), 0);
        assert_eq!(average_attendance(&[]), 0);
        assert_eq!(client_attendance_rate(&[]), 0);
        assert_eq!(performance_distribution(&[]).total(), 0);
        assert!(top_performers(&[], 5).is_empty());
    }

    #[test]
    fn test_attendance_rate_no_enrollments() {
        let sessions = vec![session("s1", "c1", 1, &["u1"])];
        assert_eq!(attendance_rate(&sessions, 0), 0);
    }

    #[test]
    fn test_attendance_rate() {
        let sessions = vec![
            session("s1", "c1", 1, &["u1", "u2"]),
            session("s2", "c1", 2, &["u1"]),
        ];
        // mean 1.5 of 4 enrolled = 37.5%
        assert_eq!(attendance_rate(&sessions, 4), 38);
        assert_eq!(average_attendance(&sessions), 2);
    }

    #[test]
    fn test_distribution_scenario() {
        let e = enrollments(&[40, 60, 90]);
        let dist = performance_distribution(&e);
        assert_eq!(
            dist,
            PerformanceDistribution {
                below_50: 1,
                from_50: 1,
                from_70: 0,
                from_85: 1,
            }
        );
        assert_eq!(completion_rate(&e, 80), 33);
        assert_eq!(average_progress(&e), 63);
    }

    #[test]
    fn test_distribution_bucket_edges() {
        let e = enrollments(&[0, 49, 50, 69, 70, 84, 85, 100]);
        let dist = performance_distribution(&e);
        assert_eq!(dist.total(), e.len());
        assert_eq!(dist.buckets().map(|(_, n)| n), [2, 2, 2, 2]);
    }

    #[test]
    fn test_distribution_wire_labels() {
        let json = serde_json::to_string(&performance_distribution(&enrollments(&[10]))).unwrap();
        assert_eq!(json, r#"{"0-50":1,"50-70":0,"70-85":0,"85-100":0}"#);
    }

    #[test]
    fn test_completion_rate_monotone_in_threshold() {
        let e = enrollments(&[5, 35, 50, 72, 80, 80, 99, 100]);
        let mut last = 0;
        for threshold in (0..=100u8).rev() {
            let rate = completion_rate(&e, threshold);
            assert!(rate >= last, "threshold {threshold}: {rate} < {last}");
            last = rate;
        }
        assert_eq!(completion_rate(&e, 0), 100);
    }

    #[test]
    fn test_top_performers_stable() {
        let e = enrollments(&[70, 90, 70, 90, 10]);
        let ids: Vec<&str> = top_performers(&e, 3).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e3", "e0"]);
    }

    #[test]
    fn test_at_risk_students() {
        let e = enrollments(&[59, 60, 10]);
        let ids: Vec<&str> = at_risk_students(&e, 60).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e0", "e2"]);
    }

    #[test]
    fn test_client_attendance_rate() {
        let e = vec![
            Enrollment::new("e1", "u1", "c1", 12).with_sessions_attended(9),
            Enrollment::new("e2", "u1", "c2", 8).with_sessions_attended(2),
        ];
        assert_eq!(client_attendance_rate(&e), 55);
    }

    #[test]
    fn test_session_attendance_rate() {
        let s = session("s1", "c1", 1, &["u1", "u2", "u3"]);
        assert_eq!(session_attendance_rate(&s, 4), 75);
        assert_eq!(session_attendance_rate(&s, 0), 0);
    }

    #[test]
    fn test_attendance_trend_keeps_latest_in_order() {
        let sessions = vec![
            session("s3", "c1", 3, &["u1"]),
            session("s1", "c1", 1, &[]),
            session("s2", "c1", 2, &["u1", "u2"]),
        ];
        let trend = attendance_trend(&sessions, 2);
        let ids: Vec<&str> = trend.iter().map(|p| p.session_id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "s3"]);
        assert_eq!(trend[0].attendance, 2);
    }

    #[test]
    fn test_upcoming_sessions_strictly_after_today() {
        let sessions = vec![
            session("s5", "c1", 5, &[]),
            session("s2", "c1", 2, &[]),
            session("s4", "c1", 4, &[]),
            session("s3", "c1", 3, &[]),
        ];
        let ids: Vec<&str> = upcoming_sessions(&sessions, date(3), 3)
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["s4", "s5"]);
    }

    #[test]
    fn test_recent_progress_newest_first() {
        let records = vec![
            ProgressRecord::new("p1", "u1", "s1", "c1", date(1), 70),
            ProgressRecord::new("p2", "u1", "s2", "c1", date(8), 80),
            ProgressRecord::new("p3", "u1", "s3", "c1", date(4), 90),
        ];
        let ids: Vec<&str> = recent_progress(&records, 2).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p3"]);
        assert_eq!(average_performance(&records), 80);
    }

    fn store() -> Store {
        Store::new(StoreData {
            courses: vec![
                Course::new("c1", "Yoga", "t1", Difficulty::Beginner, 10),
                Course::new("c2", "HIIT", "t1", Difficulty::Advanced, 10),
                Course::new("c3", "Pilates", "t2", Difficulty::Intermediate, 10),
            ],
            sessions: vec![
                session("s1", "c1", 1, &["u1", "u2"]),
                session("s2", "c1", 10, &["u1"]),
                session("s3", "c3", 2, &["u3"]),
                session("s9", "gone", 2, &["u1"]),
            ],
            enrollments: vec![
                Enrollment::new("e1", "u1", "c1", 12).with_progress(90),
                Enrollment::new("e2", "u2", "c1", 12).with_progress(40),
                Enrollment::new("e3", "u1", "c2", 12).with_progress(100),
                Enrollment::new("e4", "u3", "c3", 12).with_progress(55),
                Enrollment::new("e9", "u1", "gone", 12).with_progress(0),
            ],
            progress_records: vec![
                ProgressRecord::new("p1", "u1", "s1", "c1", date(1), 80),
                ProgressRecord::new("p2", "u2", "s1", "c1", date(1), 50),
            ],
            ..Default::default()
        })
    }

    #[test]
    fn test_scoped_view_by_trainer_skips_orphans() {
        let view = ScopedView::new(&store(), &Scope::trainer("t1"));
        assert_eq!(view.courses.len(), 2);
        assert_eq!(view.sessions.len(), 2);
        assert_eq!(view.enrollments.len(), 3);
        assert!(view.enrollments.iter().all(|e| e.course_id != "gone"));
    }

    #[test]
    fn test_scoped_view_course_and_range() {
        let scope = Scope::trainer("t1")
            .with_course("c1")
            .between(Some(date(5)), None);
        let view = ScopedView::new(&store(), &scope);
        assert_eq!(view.courses.len(), 1);
        assert_eq!(view.sessions.len(), 1);
        assert_eq!(view.sessions[0].id, "s2");
        assert!(view.progress_records.is_empty());
    }

    #[test]
    fn test_scoped_view_by_client() {
        let view = ScopedView::new(&store(), &Scope::client("u1"));
        let courses: Vec<&str> = view.courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(courses, vec!["c1", "c2"]);
        assert_eq!(view.enrollments.len(), 2);
        assert_eq!(view.progress_records.len(), 1);
    }

    #[test]
    fn test_trainer_report() {
        let view = ScopedView::new(&store(), &Scope::trainer("t1"));
        let report = TrainerReport::build(&view, &AnalyticsConfig::default());
        assert_eq!(report.course_count, 2);
        assert_eq!(report.enrollment_count, 3);
        assert_eq!(report.session_count, 2);
        assert_eq!(report.average_progress, 77);
        assert_eq!(report.completion_rate, 67);
        assert_eq!(report.distribution.total(), 3);
        assert_eq!(report.top_performers[0].id, "e3");
        assert_eq!(report.at_risk.len(), 1);
        assert_eq!(report.courses.len(), 2);
        assert_eq!(report.courses[0].enrollment, 2);
        assert_eq!(report.courses[0].attendance_rate, 75);
        assert_eq!(report.courses[0].average_performance, 65);
        assert_eq!(report.courses[0].completion_rate, 50);
        assert_eq!(report.courses[1].average_performance, 0);
        assert_eq!(report.courses[1].completion_rate, 100);
    }

    #[test]
    fn test_client_report() {
        let view = ScopedView::new(&store(), &Scope::client("u1"));
        let report = ClientReport::build(&view, date(5), &AnalyticsConfig::default());
        assert_eq!(report.enrolled_courses, 2);
        assert_eq!(report.completed_courses, 1);
        assert_eq!(report.average_progress, 95);
        assert_eq!(report.total_sessions, 24);
        assert_eq!(report.upcoming_sessions.len(), 1);
        assert_eq!(report.upcoming_sessions[0].id, "s2");
        assert_eq!(report.average_performance, 80);
    }
}

//! Bootstrap data the store starts from.

use std::path::Path;

use crate::config::SeedConfig;
use crate::error::Result;
use crate::store::Store;

const FIXTURE: &str = include_str!("../data/fixture.json");

/// The built-in demo data: two clients, a trainer with three courses and an
/// admin, plus the sessions, enrollments and progress records tying them
/// together. The first user is a client.
pub fn fixture() -> Result<Store> {
    Store::from_json(FIXTURE)
}

/// The configured seed file, or the built-in fixture when none is set.
pub fn load_seed(config: &SeedConfig) -> Result<Store> {
    match config.path.as_deref() {
        Some(path) => {
            tracing::info!(path, "seed: loading store from file");
            Store::load(Path::new(path))
        }
        None => fixture(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    #[test]
    fn test_fixture_users() {
        let store = fixture().unwrap();
        let users = store.users();
        assert_eq!(users.len(), 4);
        assert_eq!(users[0].role, Role::Client);
        assert_eq!(users[0].name, "Sarah Johnson");
        assert_eq!(users.iter().filter(|u| u.role == Role::Client).count(), 2);
        assert_eq!(users.iter().filter(|u| u.role == Role::Trainer).count(), 1);
        assert_eq!(users.iter().filter(|u| u.role == Role::Admin).count(), 1);
    }

    #[test]
    fn test_fixture_courses_belong_to_trainer() {
        let store = fixture().unwrap();
        let trainer = store.users().iter().find(|u| u.role == Role::Trainer).unwrap();
        assert_eq!(store.courses().len(), 3);
        assert!(store.courses().iter().all(|c| c.trainer_id == trainer.id));
    }

    #[test]
    fn test_fixture_is_consistent() {
        let store = fixture().unwrap();
        for course in store.courses() {
            assert_eq!(course.current_enrollment, store.enrollment_count(&course.id));
            assert!(course.current_enrollment <= course.max_capacity);
        }
        for e in store.enrollments() {
            assert!(store.course(&e.course_id).is_some());
            assert!(store.user(&e.client_id).is_some());
            let attended = store
                .sessions_for_course(&e.course_id)
                .filter(|s| s.attended_by(&e.client_id))
                .count() as u32;
            assert_eq!(e.sessions_attended, attended, "enrollment {}", e.id);
        }
        for r in store.progress_records() {
            let session = store.session(&r.session_id).unwrap();
            assert_eq!(session.course_id, r.course_id);
            assert_eq!(session.date, r.date);
        }
    }

    #[test]
    fn test_load_seed_defaults_to_fixture() {
        let store = load_seed(&SeedConfig::default()).unwrap();
        assert_eq!(store, fixture().unwrap());
    }

    #[test]
    fn test_load_seed_from_file() {
        let path = std::env::temp_dir().join(format!("stride-seed-test-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"users": [{"id": "a", "name": "A", "email": "a@b.co", "role": "admin"}]}"#)
            .unwrap();
        let store = load_seed(&SeedConfig {
            path: Some(path.to_string_lossy().into_owned()),
        })
        .unwrap();
        assert_eq!(store.users().len(), 1);
        assert!(store.courses().is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_seed_missing_file_errors() {
        let config = SeedConfig {
            path: Some("/nonexistent/stride-seed.json".into()),
        };
        assert!(load_seed(&config).is_err());
    }
}

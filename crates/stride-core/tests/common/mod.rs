#![allow(unused_imports, dead_code)]

use std::time::Duration;

use stride_core::config::StrideConfig;
use stride_core::dispatch::Dispatcher;
use stride_core::model::{Course, Difficulty, Enrollment};
use stride_core::seed;
use stride_core::store::{Store, StoreData};

/// Config with the latency window switched off so tests don't sleep.
pub fn instant_config() -> StrideConfig {
    let mut config = StrideConfig::default_config();
    config.dispatch.latency_ms = 0;
    config
}

/// A store holding a single empty course `c1` with room for ten.
pub fn single_course_store() -> Store {
    Store::new(StoreData {
        courses: vec![Course::new("c1", "Morning Yoga", "t1", Difficulty::Beginner, 10)],
        ..Default::default()
    })
}

pub fn fixture_dispatcher() -> Dispatcher {
    let store = seed::fixture().expect("fixture should parse");
    Dispatcher::new(store, &instant_config())
}

pub fn dispatcher_for(store: Store) -> Dispatcher {
    Dispatcher::new(store, &instant_config()).with_latency(Duration::ZERO)
}

pub fn fresh_enrollment(id: &str, client_id: &str, course_id: &str) -> Enrollment {
    Enrollment::new(id, client_id, course_id, 12)
}

//! In-memory audit trail of dispatched commands.
//!
//! Each [`CommandEvent`] records which command ran, against which entity,
//! who issued it and how it ended. The log is bounded; the oldest events
//! fall off first.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::HistoryConfig;
use crate::store::Outcome;

/// How a dispatched command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventResult {
    Applied,
    Unchanged,
    Failed,
}

impl From<Outcome> for EventResult {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Applied => Self::Applied,
            Outcome::Unchanged => Self::Unchanged,
        }
    }
}

impl std::fmt::Display for EventResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A single audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEvent {
    pub id: Uuid,
    /// Command tag, e.g. `ADD_COURSE`, or `UNDO`.
    pub action: String,
    pub entity_id: String,
    pub actor: String,
    pub result: EventResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CommandEvent {
    pub fn new(
        action: impl Into<String>,
        entity_id: impl Into<String>,
        actor: impl Into<String>,
        result: EventResult,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            action: action.into(),
            entity_id: entity_id.into(),
            actor: actor.into(),
            result,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Bounded, append-only command log.
pub struct CommandLog {
    events: Mutex<VecDeque<CommandEvent>>,
    max_events: usize,
    enabled: bool,
}

impl CommandLog {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            max_events: config.max_events.max(1),
            enabled: config.enabled,
        }
    }

    pub fn disabled() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            max_events: 1,
            enabled: false,
        }
    }

    pub fn log(&self, event: CommandEvent) {
        if !self.enabled {
            return;
        }
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() == self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// The N most recent events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<CommandEvent> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.iter().rev().take(limit).cloned().collect()
    }

    /// All events for one entity, newest first.
    pub fn history_for(&self, entity_id: &str) -> Vec<CommandEvent> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events
            .iter()
            .rev()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

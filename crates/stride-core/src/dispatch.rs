//! Command dispatcher: the single writer in front of the entity store.
//!
//! A dispatched command marks the dispatcher as loading, waits out the
//! configured latency, then applies the command to the current snapshot and
//! publishes the result. Readers only ever see whole snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::MutexGuard;

use crate::config::{ConcurrencyPolicy, StrideConfig};
use crate::error::{Result, StrideError};
use crate::history::{CommandEvent, CommandLog, EventResult};
use crate::store::{Command, Outcome, Store, StoreRules};

const UNDO_ACTION: &str = "UNDO";
const DEFAULT_ACTOR: &str = "anonymous";

/// Loading/error flags for the view layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStatus {
    pub loading: bool,
    pub error: Option<String>,
}

pub struct Dispatcher {
    current: RwLock<Arc<Store>>,
    /// Held for the whole latency window; one command at a time.
    gate: tokio::sync::Mutex<()>,
    undo_stack: Mutex<Vec<Arc<Store>>>,
    loading: AtomicBool,
    error: Mutex<Option<String>>,
    rules: StoreRules,
    latency: Duration,
    policy: ConcurrencyPolicy,
    max_snapshots: usize,
    log: CommandLog,
}

/// Clears the loading flag however the command future ends.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Dispatcher {
    pub fn new(store: Store, config: &StrideConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(store)),
            gate: tokio::sync::Mutex::new(()),
            undo_stack: Mutex::new(Vec::new()),
            loading: AtomicBool::new(false),
            error: Mutex::new(None),
            rules: config.store.rules(),
            latency: config.dispatch.latency(),
            policy: config.dispatch.concurrency_policy(),
            max_snapshots: config.history.max_snapshots.max(1),
            log: CommandLog::new(&config.history),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_rules(mut self, rules: StoreRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> StoreRules {
        self.rules
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Store> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> DispatchStatus {
        DispatchStatus {
            loading: self.loading.load(Ordering::SeqCst),
            error: self
                .error
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    pub fn clear_error(&self) {
        self.set_error(None);
    }

    pub fn history(&self) -> &CommandLog {
        &self.log
    }

    pub fn can_undo(&self) -> bool {
        !self
            .undo_stack
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    pub async fn dispatch(&self, command: Command) -> Result<Outcome> {
        self.dispatch_as(command, DEFAULT_ACTOR).await
    }

    /// Apply `command` on behalf of `actor` after the latency window.
    ///
    /// A failing command leaves the snapshot as it was and its message in
    /// [`DispatchStatus::error`]. A command rejected with `Busy` touches
    /// neither flag, since they belong to the command in flight.
    pub async fn dispatch_as(&self, command: Command, actor: &str) -> Result<Outcome> {
        let _turn = self.acquire(command.kind()).await?;
        let _loading = LoadingGuard::start(&self.loading);
        self.set_error(None);
        self.wait().await;

        let action = command.kind();
        let target = command.target_id().to_string();
        let before = self.snapshot();

        match before.apply(command, &self.rules) {
            Ok((next, outcome)) => {
                if outcome == Outcome::Applied {
                    self.push_undo(before);
                    self.publish(next);
                }
                tracing::debug!(action, target = %target, %outcome, "dispatch: command done");
                self.log
                    .log(CommandEvent::new(action, target, actor, outcome.into()));
                Ok(outcome)
            }
            Err(e) => {
                tracing::debug!(action, target = %target, error = %e, "dispatch: command failed");
                self.set_error(Some(e.to_string()));
                self.log.log(
                    CommandEvent::new(action, target, actor, EventResult::Failed)
                        .with_error(e.to_string()),
                );
                Err(e)
            }
        }
    }

    /// Restore the snapshot that preceded the most recent applied command.
    pub async fn undo(&self, actor: &str) -> Result<()> {
        let _turn = self.acquire(UNDO_ACTION).await?;
        let previous = self
            .undo_stack
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let Some(previous) = previous else {
            return Err(StrideError::NothingToUndo);
        };

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = previous;
        self.set_error(None);
        tracing::debug!("dispatch: undo");
        self.log
            .log(CommandEvent::new(UNDO_ACTION, "", actor, EventResult::Applied));
        Ok(())
    }

    async fn acquire(&self, action: &str) -> Result<MutexGuard<'_, ()>> {
        match self.policy {
            ConcurrencyPolicy::Queue => Ok(self.gate.lock().await),
            ConcurrencyPolicy::Reject => self.gate.try_lock().map_err(|_| {
                tracing::warn!(action, "dispatch: rejected, another command is in flight");
                StrideError::Busy
            }),
        }
    }

    async fn wait(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn publish(&self, next: Store) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }

    fn push_undo(&self, snapshot: Arc<Store>) {
        let mut stack = self
            .undo_stack
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if stack.len() == self.max_snapshots {
            stack.remove(0);
        }
        stack.push(snapshot);
    }

    fn set_error(&self, error: Option<String>) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }
}

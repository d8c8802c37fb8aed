//! Debounce timers, at most one per rule

use crate::model::RuleId;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Manages the pending delayed run per rule.
///
/// The map holds the only handle to each timer task, keyed by rule id;
/// an entry is removed when its timer fires, is cancelled, or the engine
/// shuts down. At most one entry per rule id exists at any time.
#[derive(Default)]
pub struct DebounceScheduler {
    timers: Arc<DashMap<RuleId, JoinHandle<()>>>,
}

impl DebounceScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `on_fire` to run after `delay`, unless a timer for the
    /// rule is already pending. The map entry is removed immediately
    /// before `on_fire` runs.
    pub fn arm<F>(&self, rule_id: RuleId, delay: Duration, on_fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        use dashmap::mapref::entry::Entry;

        match self.timers.entry(rule_id) {
            Entry::Occupied(_) => {
                tracing::debug!("Timer already pending for rule {}", rule_id);
            }
            Entry::Vacant(slot) => {
                let timers = Arc::clone(&self.timers);
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    timers.remove(&rule_id);
                    on_fire.await;
                });
                slot.insert(handle);
                tracing::debug!("Armed {:?} timer for rule {}", delay, rule_id);
            }
        }
    }

    /// Cancel a pending timer, if any. Idempotent.
    pub fn cancel(&self, rule_id: RuleId) {
        if let Some((_, handle)) = self.timers.remove(&rule_id) {
            handle.abort();
            tracing::debug!("Cancelled pending timer for rule {}", rule_id);
        }
    }

    /// Cancel every outstanding timer (engine shutdown).
    pub fn cancel_all(&self) {
        self.timers.retain(|_, handle| {
            handle.abort();
            false
        });
    }

    /// Number of pending timers.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        for entry in self.timers.iter() {
            entry.value().abort();
        }
    }
}

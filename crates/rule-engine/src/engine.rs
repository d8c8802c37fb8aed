//! Rule engine orchestration

use crate::evaluator::ConditionEvaluator;
use crate::executor::ActionExecutor;
use crate::model::{CompiledRule, RuleIndex};
use crate::scheduler::DebounceScheduler;
use crate::trigger::TriggerOutcome;
use hub_core::{CommandSink, EntityDirectory, StateChange, StateStore};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Wires the compiled rule index and the evaluation pipeline together.
///
/// The engine owns the pending-timer map through its scheduler: timers
/// are created while handling events and drained on [`RuleEngine::stop`].
/// Evaluation never returns an error to the event source; failures are
/// logged and contained per rule.
pub struct RuleEngine {
    index: RuleIndex,
    evaluator: Arc<ConditionEvaluator>,
    executor: Arc<ActionExecutor>,
    scheduler: DebounceScheduler,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl RuleEngine {
    #[must_use]
    pub fn new(
        index: RuleIndex,
        directory: Arc<dyn EntityDirectory>,
        states: Arc<dyn StateStore>,
        sink: Arc<dyn CommandSink>,
    ) -> Self {
        let evaluator = Arc::new(ConditionEvaluator::new(
            Arc::clone(&directory),
            Arc::clone(&states),
        ));
        let executor = Arc::new(ActionExecutor::new(directory, states, sink));
        Self {
            index,
            evaluator,
            executor,
            scheduler: DebounceScheduler::new(),
            listener: Mutex::new(None),
        }
    }

    /// Start consuming state changes from a bus subscription.
    pub fn start(self: &Arc<Self>, mut rx: broadcast::Receiver<StateChange>) {
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => engine.handle_state_change(&event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Rule engine lagged by {} state changes", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("State change channel closed");
                        break;
                    }
                }
            }
        });
        *self.listener.lock().unwrap() = Some(handle);
    }

    /// Stop the listener and cancel every pending timer.
    pub fn stop(&self) {
        if let Some(handle) = self.listener.lock().unwrap().take() {
            handle.abort();
        }
        self.scheduler.cancel_all();
    }

    /// Per-event entry point: evaluate every rule indexed under the
    /// event's entity, in definition order.
    pub fn handle_state_change(&self, event: &StateChange) {
        let rules = self.index.rules_for(&event.entity_id);
        if rules.is_empty() {
            return;
        }
        tracing::debug!(
            "Evaluating {} rule(s) for entity '{}'",
            rules.len(),
            event.entity_id
        );
        for rule in rules {
            self.run_rule(rule, event);
        }
    }

    /// Number of rules currently waiting on a debounce timer.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    fn run_rule(&self, rule: &Arc<CompiledRule>, event: &StateChange) {
        match rule.trigger.evaluate(&event.update, &event.from, &event.to) {
            TriggerOutcome::Ignore => {}
            TriggerOutcome::Suppress => self.scheduler.cancel(rule.id),
            TriggerOutcome::Fire => self.fire(rule),
        }
    }

    fn fire(&self, rule: &Arc<CompiledRule>) {
        if !self.evaluator.check_all(&rule.conditions) {
            tracing::debug!("Conditions not met for rule '{}'", rule.name);
            self.scheduler.cancel(rule.id);
            return;
        }

        match rule.trigger.debounce() {
            Some(delay) => {
                let evaluator = Arc::clone(&self.evaluator);
                let executor = Arc::clone(&self.executor);
                let pending = Arc::clone(rule);
                self.scheduler.arm(rule.id, delay, async move {
                    // State may have moved while the timer ran; guards
                    // are re-checked against what is current now.
                    if evaluator.check_all(&pending.conditions) {
                        tracing::debug!("Running debounced rule '{}'", pending.name);
                        executor.run(&pending.actions);
                    } else {
                        tracing::debug!("Conditions no longer met for rule '{}'", pending.name);
                    }
                });
            }
            None => {
                tracing::debug!("Running rule '{}'", rule.name);
                self.executor.run(&rule.actions);
            }
        }
    }
}

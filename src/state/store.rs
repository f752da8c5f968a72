//! The state store: owns the run state and applies named transitions.
//!
//! Each transition clones the pre-mutation state as an independent snapshot,
//! applies the action, and synchronously notifies `stateChanged` subscribers
//! in registration order before returning to the caller. Subscribers may
//! issue further transitions; the whole chain is depth-first and strictly
//! serialized, so no transition ever runs concurrently with another on the
//! same state.

use std::rc::Rc;

use chrono::Utc;

use super::bus::{Event, EventKind, ObserverBus, ObserverFn, SubscriptionId};
use super::types::{
    Action, AnalysisRecord, ErrorRecord, RunState, RunStatus, ScreenshotRecord, StepRecord,
    StoreError, StoreResult,
};

/// Holds the run state for one test run and applies transitions to it
#[derive(Debug, Default)]
pub struct StateStore {
    state: RunState,
    bus: ObserverBus,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the live state (for observers and the orchestrator)
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Deep, independent copy of the full current state. The returned value
    /// never aliases live mutable state.
    pub fn export_state(&self) -> RunState {
        self.state.clone()
    }

    /// Register an observer callback; returns a handle for removal
    pub fn subscribe(&mut self, kind: EventKind, callback: Rc<ObserverFn>) -> SubscriptionId {
        self.bus.subscribe(kind, callback)
    }

    /// Remove a previously registered observer
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Apply one typed transition and notify observers.
    ///
    /// Observer callbacks run synchronously before this returns; a nested
    /// `transition` issued from a callback fully completes first. If a
    /// subscriber fails, the failure is broadcast on the `error` channel and
    /// then re-raised to the caller.
    pub fn transition(&mut self, action: Action) -> StoreResult<()> {
        let previous = self.state.clone();
        self.apply(&action);

        let event = Event::StateChanged {
            previous,
            action: action.clone(),
        };
        if let Err(err) = self.publish(EventKind::StateChanged, &event) {
            let failure = Event::Error {
                action: action.name().to_string(),
                message: err.to_string(),
                state: self.state.clone(),
            };
            // Error-channel subscribers must not fail the failure report
            let _ = self.publish(EventKind::Error, &failure);
            return Err(err);
        }
        Ok(())
    }

    /// Apply a transition from its wire form (`name` + JSON payload).
    ///
    /// An unknown action name or malformed payload is broadcast to
    /// `error`-event subscribers with the unmodified pre-transition state
    /// attached, then returned to the caller. No partial mutation occurs.
    pub fn transition_named(&mut self, name: &str, payload: serde_json::Value) -> StoreResult<()> {
        match Action::from_parts(name, payload) {
            Ok(action) => self.transition(action),
            Err(err) => {
                let failure = Event::Error {
                    action: name.to_string(),
                    message: err.to_string(),
                    state: self.state.clone(),
                };
                let _ = self.publish(EventKind::Error, &failure);
                Err(err)
            }
        }
    }

    /// Mutate the state for one action. Each branch touches only its own
    /// fields; validation happens before any mutation.
    fn apply(&mut self, action: &Action) {
        let now = Utc::now();
        match action {
            Action::StartTest => {
                // Status only moves unset -> running; a repeated START_TEST
                // after the run began leaves metadata untouched.
                if self.state.metadata.status.is_none() {
                    self.state.metadata.start_time = Some(now);
                    self.state.metadata.status = Some(RunStatus::Running);
                }
            }
            Action::EndTest { status } => {
                // end_time is set at most once; a second END_TEST is a no-op
                // on both status and end_time.
                if self.state.metadata.end_time.is_none() {
                    self.state.metadata.end_time = Some(now);
                    self.state.metadata.status = Some(*status);
                }
            }
            Action::UpdateStep { step, status } => {
                self.state.history.push(StepRecord {
                    step: step.clone(),
                    status: *status,
                    timestamp: now,
                });
            }
            Action::CaptureScreenshot { path, step } => {
                self.state.artifacts.screenshots.push(ScreenshotRecord {
                    path: path.clone(),
                    step: step.clone(),
                    timestamp: now,
                });
            }
            Action::RecordError { error, step } => {
                self.state.artifacts.errors.push(ErrorRecord {
                    error: error.clone(),
                    step: step.clone(),
                    timestamp: now,
                });
            }
            Action::AddAnalysis { content, step } => {
                self.state.artifacts.analysis.push(AnalysisRecord {
                    content: content.clone(),
                    step: step.clone(),
                    timestamp: now,
                });
            }
        }
    }

    /// Invoke each subscriber for `kind` in registration order. The Rc list
    /// is cloned out of the bus first so callbacks can re-enter the store.
    fn publish(&mut self, kind: EventKind, event: &Event) -> StoreResult<()> {
        for callback in self.bus.callbacks_for(kind) {
            callback(self, event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::types::StepStatus;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    #[test]
    fn test_start_and_end_test() {
        let mut store = StateStore::new();
        store.transition(Action::StartTest).unwrap();
        assert_eq!(store.state().metadata.status, Some(RunStatus::Running));
        assert!(store.state().metadata.start_time.is_some());
        assert!(store.state().metadata.end_time.is_none());

        store
            .transition(Action::EndTest {
                status: RunStatus::Success,
            })
            .unwrap();
        assert_eq!(store.state().metadata.status, Some(RunStatus::Success));
        assert!(store.state().metadata.end_time.is_some());
    }

    #[test]
    fn test_second_end_test_is_noop_on_metadata() {
        let mut store = StateStore::new();
        store.transition(Action::StartTest).unwrap();
        store
            .transition(Action::EndTest {
                status: RunStatus::Failed,
            })
            .unwrap();
        let first = store.state().metadata.clone();

        store
            .transition(Action::EndTest {
                status: RunStatus::Success,
            })
            .unwrap();
        assert_eq!(store.state().metadata, first);
    }

    #[test]
    fn test_start_test_after_start_is_noop() {
        let mut store = StateStore::new();
        store.transition(Action::StartTest).unwrap();
        let first = store.state().metadata.clone();
        store.transition(Action::StartTest).unwrap();
        assert_eq!(store.state().metadata, first);
    }

    #[test]
    fn test_appends_are_ordered() {
        let mut store = StateStore::new();
        store
            .transition(Action::UpdateStep {
                step: "a".to_string(),
                status: StepStatus::Running,
            })
            .unwrap();
        store
            .transition(Action::UpdateStep {
                step: "a".to_string(),
                status: StepStatus::Success,
            })
            .unwrap();

        let history = &store.state().history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, StepStatus::Running);
        assert_eq!(history[1].status, StepStatus::Success);
    }

    #[test]
    fn test_state_changed_carries_pre_mutation_snapshot() {
        let mut store = StateStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(
            EventKind::StateChanged,
            Rc::new(move |store, event| {
                if let Event::StateChanged { previous, .. } = event {
                    sink.borrow_mut()
                        .push((previous.history.len(), store.state().history.len()));
                }
                Ok(())
            }),
        );

        store
            .transition(Action::UpdateStep {
                step: "a".to_string(),
                status: StepStatus::Running,
            })
            .unwrap();
        store
            .transition(Action::UpdateStep {
                step: "a".to_string(),
                status: StepStatus::Success,
            })
            .unwrap();

        // Snapshot lags the live state by exactly the applied mutation
        assert_eq!(*seen.borrow(), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_unknown_action_leaves_state_unmodified_and_fires_error_once() {
        let mut store = StateStore::new();
        let errors = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&errors);
        store.subscribe(
            EventKind::Error,
            Rc::new(move |_, _| {
                counter.set(counter.get() + 1);
                Ok(())
            }),
        );

        store.transition(Action::StartTest).unwrap();
        let before = store.export_state();

        let err = store
            .transition_named("BOGUS_ACTION", json!({}))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownAction(_)));
        assert_eq!(store.export_state(), before);
        assert_eq!(errors.get(), 1);
    }

    #[test]
    fn test_transition_named_applies_known_action() {
        let mut store = StateStore::new();
        store
            .transition_named("RECORD_ERROR", json!({"error": "nope", "step": "fill"}))
            .unwrap();
        assert_eq!(store.state().artifacts.errors.len(), 1);
        assert_eq!(store.state().artifacts.errors[0].error, "nope");
        assert_eq!(
            store.state().artifacts.errors[0].step.as_deref(),
            Some("fill")
        );
    }

    #[test]
    fn test_failing_observer_propagates_and_fires_error_event() {
        let mut store = StateStore::new();
        store.subscribe(
            EventKind::StateChanged,
            Rc::new(|_, _| Err(StoreError::Observer("subscriber exploded".to_string()))),
        );
        let errors = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&errors);
        store.subscribe(
            EventKind::Error,
            Rc::new(move |_, _| {
                counter.set(counter.get() + 1);
                Ok(())
            }),
        );

        let err = store.transition(Action::StartTest).unwrap_err();
        assert!(matches!(err, StoreError::Observer(_)));
        assert_eq!(errors.get(), 1);
    }

    #[test]
    fn test_nested_transition_from_observer_completes_depth_first() {
        let mut store = StateStore::new();
        // React to every RECORD_ERROR by appending an analysis entry from
        // within the dispatch of the outer transition.
        store.subscribe(
            EventKind::StateChanged,
            Rc::new(|store, event| {
                if let Event::StateChanged {
                    action: Action::RecordError { step, .. },
                    ..
                } = event
                {
                    store.transition(Action::AddAnalysis {
                        content: "nested".to_string(),
                        step: step.clone(),
                    })?;
                }
                Ok(())
            }),
        );

        store
            .transition(Action::RecordError {
                error: "boom".to_string(),
                step: Some("b".to_string()),
            })
            .unwrap();

        // The nested ADD_ANALYSIS completed before the outer call returned
        assert_eq!(store.state().artifacts.analysis.len(), 1);
        assert_eq!(store.state().artifacts.analysis[0].content, "nested");
    }

    #[test]
    fn test_export_state_is_independent() {
        let mut store = StateStore::new();
        store.transition(Action::StartTest).unwrap();

        let mut a = store.export_state();
        let b = store.export_state();
        assert_eq!(a, b);

        a.history.push(StepRecord {
            step: "tampered".to_string(),
            status: StepStatus::Running,
            timestamp: Utc::now(),
        });
        assert_ne!(a, b);
        assert!(store.state().history.is_empty());
    }
}

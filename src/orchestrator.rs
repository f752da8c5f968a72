//! Test orchestration: drives a plan's steps against the Page capability,
//! translating each outcome into state transitions, and reacts to recorded
//! errors by invoking the analyzer.
//!
//! The reaction is wired as a `stateChanged` subscriber, so the analysis
//! entry for an error lands before the transition that recorded the error
//! returns to the step driver. Analyzer failures never abort the run; they
//! degrade to a placeholder analysis entry.

use std::rc::Rc;

use crate::analyzer::ErrorAnalyzer;
use crate::page::Page;
use crate::plan::TestPlan;
use crate::state::{
    Action, Event, EventKind, RunState, RunStatus, StateStore, StepStatus, StoreResult,
};

/// Analysis text recorded when the analyzer capability fails
pub const ANALYSIS_FALLBACK: &str = "Error analysis failed";

/// Drives one test run end to end through the state store
pub struct TestOrchestrator {
    store: StateStore,
}

impl TestOrchestrator {
    /// Create an orchestrator wired to the given analyzer.
    ///
    /// Registers two observers on the store: the error-analysis reaction on
    /// `stateChanged`, and a logging-only handler on `error` (which issues
    /// no transitions, so a failure report can never loop).
    pub fn new(analyzer: Rc<dyn ErrorAnalyzer>) -> Self {
        let mut store = StateStore::new();

        store.subscribe(
            EventKind::StateChanged,
            Rc::new(move |store, event| {
                let Event::StateChanged { action, .. } = event else {
                    return Ok(());
                };
                if !matches!(action, Action::RecordError { .. }) {
                    return Ok(());
                }
                let Some(record) = store.state().artifacts.errors.last().cloned() else {
                    return Ok(());
                };

                let content = match analyzer.analyze(&record) {
                    Ok(text) => text,
                    Err(err) => {
                        eprintln!(
                            "Warning: analysis failed for step {}: {}",
                            record.step.as_deref().unwrap_or("<unset>"),
                            err
                        );
                        ANALYSIS_FALLBACK.to_string()
                    }
                };

                // Nested transition: completes, including its own observer
                // notifications, before the outer RECORD_ERROR returns.
                store.transition(Action::AddAnalysis {
                    content,
                    step: record.step.clone(),
                })
            }),
        );

        store.subscribe(
            EventKind::Error,
            Rc::new(|_, event| {
                if let Event::Error {
                    action, message, ..
                } = event
                {
                    eprintln!("Error during action {}: {}", action, message);
                }
                Ok(())
            }),
        );

        Self { store }
    }

    /// Access the underlying store (for additional subscriptions or
    /// wire-form transitions)
    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    /// Deep copy of the current run state
    pub fn export_state(&self) -> RunState {
        self.store.export_state()
    }

    /// Run the plan's steps in order against `page`.
    ///
    /// The first failing step records an error, captures a screenshot, and
    /// aborts the rest of the plan; the run still completes with terminal
    /// status `failed` and its state is returned. Only an observer failure
    /// escapes as an error.
    pub fn run_test(&mut self, page: &mut dyn Page, plan: &TestPlan) -> StoreResult<RunState> {
        self.store.transition(Action::StartTest)?;

        let mut run_failed = false;
        for step in &plan.steps {
            self.store.transition(Action::UpdateStep {
                step: step.name.clone(),
                status: StepStatus::Running,
            })?;

            match step.action.execute(page) {
                Ok(()) => {
                    self.capture_screenshot(page, &step.name)?;
                    self.store.transition(Action::UpdateStep {
                        step: step.name.clone(),
                        status: StepStatus::Success,
                    })?;
                }
                Err(err) => {
                    self.capture_screenshot(page, &step.name)?;
                    self.store.transition(Action::RecordError {
                        error: err.to_string(),
                        step: Some(step.name.clone()),
                    })?;
                    self.store.transition(Action::UpdateStep {
                        step: step.name.clone(),
                        status: StepStatus::Failed,
                    })?;
                    run_failed = true;
                    break;
                }
            }
        }

        let status = if run_failed {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };
        self.store.transition(Action::EndTest { status })?;

        Ok(self.store.export_state())
    }

    /// Capture a screenshot and record it. A failed capture is logged and
    /// skipped rather than failing the step.
    fn capture_screenshot(&mut self, page: &mut dyn Page, step: &str) -> StoreResult<()> {
        match page.screenshot(step) {
            Ok(path) => self.store.transition(Action::CaptureScreenshot {
                path,
                step: Some(step.to_string()),
            }),
            Err(err) => {
                eprintln!("Warning: screenshot capture failed for step {}: {}", step, err);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalyzerError, AnalyzerResult, NullAnalyzer};
    use crate::state::ErrorRecord;
    use std::cell::Cell;

    struct FixedAnalyzer {
        text: &'static str,
        calls: Cell<u32>,
    }

    impl ErrorAnalyzer for FixedAnalyzer {
        fn analyze(&self, _record: &ErrorRecord) -> AnalyzerResult<String> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.text.to_string())
        }
    }

    struct FailingAnalyzer;

    impl ErrorAnalyzer for FailingAnalyzer {
        fn analyze(&self, _record: &ErrorRecord) -> AnalyzerResult<String> {
            Err(AnalyzerError::ConnectionFailed("scripted".to_string()))
        }
    }

    #[test]
    fn test_record_error_triggers_exactly_one_analysis() {
        let analyzer = Rc::new(FixedAnalyzer {
            text: "root cause: stale selector",
            calls: Cell::new(0),
        });
        let mut orch = TestOrchestrator::new(Rc::clone(&analyzer) as Rc<dyn ErrorAnalyzer>);

        orch.store_mut()
            .transition(Action::RecordError {
                error: "boom".to_string(),
                step: Some("b".to_string()),
            })
            .unwrap();

        // The analysis entry landed before transition() returned
        let state = orch.export_state();
        assert_eq!(analyzer.calls.get(), 1);
        assert_eq!(state.artifacts.analysis.len(), 1);
        assert_eq!(
            state.artifacts.analysis[0].content,
            "root cause: stale selector"
        );
        assert_eq!(state.artifacts.analysis[0].step.as_deref(), Some("b"));
    }

    #[test]
    fn test_analyzer_failure_degrades_to_fallback() {
        let mut orch = TestOrchestrator::new(Rc::new(FailingAnalyzer));

        orch.store_mut()
            .transition(Action::RecordError {
                error: "boom".to_string(),
                step: None,
            })
            .unwrap();

        let state = orch.export_state();
        assert_eq!(state.artifacts.errors.len(), 1);
        assert_eq!(state.artifacts.analysis.len(), 1);
        assert_eq!(state.artifacts.analysis[0].content, ANALYSIS_FALLBACK);
    }

    #[test]
    fn test_non_error_actions_do_not_invoke_analyzer() {
        let analyzer = Rc::new(FixedAnalyzer {
            text: "unused",
            calls: Cell::new(0),
        });
        let mut orch = TestOrchestrator::new(Rc::clone(&analyzer) as Rc<dyn ErrorAnalyzer>);

        orch.store_mut().transition(Action::StartTest).unwrap();
        orch.store_mut()
            .transition(Action::UpdateStep {
                step: "a".to_string(),
                status: StepStatus::Running,
            })
            .unwrap();

        assert_eq!(analyzer.calls.get(), 0);
        assert!(orch.export_state().artifacts.analysis.is_empty());
    }

    #[test]
    fn test_screenshot_failure_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = crate::page::MockPage::new(dir.path()).fail_screenshots();
        let mut orch = TestOrchestrator::new(Rc::new(NullAnalyzer));
        let plan = crate::plan::default_plan("https://example.com", "v");

        let state = orch.run_test(&mut page, &plan).unwrap();
        assert_eq!(state.metadata.status, Some(RunStatus::Success));
        assert!(state.artifacts.screenshots.is_empty());
    }
}

// Core types for the run-state machine: the state aggregate, its append-only
// records, the transition actions, and the store error taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Overall status of a test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

/// Status of a single step within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Success,
    Failed,
}

/// Run-level metadata, populated by START_TEST / END_TEST transitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// When the run started (set once by START_TEST)
    pub start_time: Option<DateTime<Utc>>,

    /// When the run ended (set once by END_TEST)
    pub end_time: Option<DateTime<Utc>>,

    /// Current run status; `None` until START_TEST is applied
    pub status: Option<RunStatus>,
}

impl RunMetadata {
    /// Whether the run has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, Some(RunStatus::Success) | Some(RunStatus::Failed))
    }
}

/// One entry in the step history; a step name appears once per status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step name
    pub step: String,

    /// Status the step entered at this point
    pub status: StepStatus,

    /// When the status change was recorded
    pub timestamp: DateTime<Utc>,
}

/// A captured screenshot artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotRecord {
    /// Path to the file written by the Page capability
    pub path: PathBuf,

    /// Step the capture belongs to, if any
    pub step: Option<String>,

    /// When the capture was recorded
    pub timestamp: DateTime<Utc>,
}

/// A recorded step error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Error message from the failing step
    pub error: String,

    /// Step the error belongs to, if any
    pub step: Option<String>,

    /// When the error was recorded
    pub timestamp: DateTime<Utc>,
}

/// An AI-generated (or fallback) analysis entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Analysis text
    pub content: String,

    /// Step the analysis refers to, if any
    pub step: Option<String>,

    /// When the analysis was recorded
    pub timestamp: DateTime<Utc>,
}

/// Append-only artifact collections for a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    pub screenshots: Vec<ScreenshotRecord>,
    pub errors: Vec<ErrorRecord>,
    pub analysis: Vec<AnalysisRecord>,
}

/// The full run state aggregate, exclusively owned by [`super::StateStore`]
///
/// Every collection is append-only: entries are never removed or mutated
/// after insertion. Deep copies are plain `Clone` since all fields are
/// owned value types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub metadata: RunMetadata,
    pub history: Vec<StepRecord>,
    pub artifacts: Artifacts,
}

// ============================================================================
// Actions
// ============================================================================

/// A named transition applied to [`RunState`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Mark the run as started
    StartTest,

    /// Mark the run as ended with the given status
    EndTest { status: RunStatus },

    /// Append a step status change to the history
    UpdateStep { step: String, status: StepStatus },

    /// Append a screenshot artifact
    CaptureScreenshot { path: PathBuf, step: Option<String> },

    /// Append an error artifact
    RecordError { error: String, step: Option<String> },

    /// Append an analysis artifact
    AddAnalysis { content: String, step: Option<String> },
}

#[derive(Deserialize)]
struct EndTestPayload {
    status: RunStatus,
}

#[derive(Deserialize)]
struct UpdateStepPayload {
    step: String,
    status: StepStatus,
}

#[derive(Deserialize)]
struct CaptureScreenshotPayload {
    path: PathBuf,
    #[serde(default)]
    step: Option<String>,
}

#[derive(Deserialize)]
struct RecordErrorPayload {
    error: String,
    #[serde(default)]
    step: Option<String>,
}

#[derive(Deserialize)]
struct AddAnalysisPayload {
    content: String,
    #[serde(default)]
    step: Option<String>,
}

impl Action {
    /// Wire name of this action (`START_TEST`, `END_TEST`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            Action::StartTest => "START_TEST",
            Action::EndTest { .. } => "END_TEST",
            Action::UpdateStep { .. } => "UPDATE_STEP",
            Action::CaptureScreenshot { .. } => "CAPTURE_SCREENSHOT",
            Action::RecordError { .. } => "RECORD_ERROR",
            Action::AddAnalysis { .. } => "ADD_ANALYSIS",
        }
    }

    /// Decode an action from its wire name and a JSON payload.
    ///
    /// Unknown names fail with [`StoreError::UnknownAction`]; a recognized
    /// name with a malformed payload fails with [`StoreError::InvalidPayload`].
    pub fn from_parts(name: &str, payload: serde_json::Value) -> StoreResult<Self> {
        fn decode<T: serde::de::DeserializeOwned>(
            name: &str,
            payload: serde_json::Value,
        ) -> StoreResult<T> {
            serde_json::from_value(payload).map_err(|source| StoreError::InvalidPayload {
                action: name.to_string(),
                source,
            })
        }

        match name {
            "START_TEST" => Ok(Action::StartTest),
            "END_TEST" => {
                let p: EndTestPayload = decode(name, payload)?;
                Ok(Action::EndTest { status: p.status })
            }
            "UPDATE_STEP" => {
                let p: UpdateStepPayload = decode(name, payload)?;
                Ok(Action::UpdateStep {
                    step: p.step,
                    status: p.status,
                })
            }
            "CAPTURE_SCREENSHOT" => {
                let p: CaptureScreenshotPayload = decode(name, payload)?;
                Ok(Action::CaptureScreenshot {
                    path: p.path,
                    step: p.step,
                })
            }
            "RECORD_ERROR" => {
                let p: RecordErrorPayload = decode(name, payload)?;
                Ok(Action::RecordError {
                    error: p.error,
                    step: p.step,
                })
            }
            "ADD_ANALYSIS" => {
                let p: AddAnalysisPayload = decode(name, payload)?;
                Ok(Action::AddAnalysis {
                    content: p.content,
                    step: p.step,
                })
            }
            other => Err(StoreError::UnknownAction(other.to_string())),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error types for store operations
#[derive(Debug)]
pub enum StoreError {
    /// Transition attempted with an unrecognized action name
    UnknownAction(String),

    /// Recognized action name with a payload that failed to decode
    InvalidPayload {
        action: String,
        source: serde_json::Error,
    },

    /// A subscriber failed during event dispatch
    Observer(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownAction(name) => write!(f, "Unknown action: {}", name),
            StoreError::InvalidPayload { action, source } => {
                write!(f, "Invalid payload for {}: {}", action, source)
            }
            StoreError::Observer(msg) => write!(f, "Observer error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::UnknownAction(_) => None,
            StoreError::InvalidPayload { source, .. } => Some(source),
            StoreError::Observer(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_names_round_trip() {
        let actions = [
            Action::StartTest,
            Action::EndTest {
                status: RunStatus::Success,
            },
            Action::UpdateStep {
                step: "a".to_string(),
                status: StepStatus::Running,
            },
            Action::CaptureScreenshot {
                path: PathBuf::from("x.png"),
                step: None,
            },
            Action::RecordError {
                error: "boom".to_string(),
                step: None,
            },
            Action::AddAnalysis {
                content: "text".to_string(),
                step: None,
            },
        ];
        let names: Vec<&str> = actions.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            [
                "START_TEST",
                "END_TEST",
                "UPDATE_STEP",
                "CAPTURE_SCREENSHOT",
                "RECORD_ERROR",
                "ADD_ANALYSIS"
            ]
        );
    }

    #[test]
    fn test_from_parts_known_actions() {
        let action = Action::from_parts("END_TEST", json!({"status": "failed"})).unwrap();
        assert_eq!(
            action,
            Action::EndTest {
                status: RunStatus::Failed
            }
        );

        let action =
            Action::from_parts("UPDATE_STEP", json!({"step": "load", "status": "running"}))
                .unwrap();
        assert_eq!(
            action,
            Action::UpdateStep {
                step: "load".to_string(),
                status: StepStatus::Running
            }
        );

        let action = Action::from_parts("RECORD_ERROR", json!({"error": "timeout"})).unwrap();
        assert_eq!(
            action,
            Action::RecordError {
                error: "timeout".to_string(),
                step: None
            }
        );
    }

    #[test]
    fn test_from_parts_unknown_action() {
        let err = Action::from_parts("BOGUS_ACTION", json!({})).unwrap_err();
        assert!(matches!(err, StoreError::UnknownAction(name) if name == "BOGUS_ACTION"));
    }

    #[test]
    fn test_from_parts_bad_payload() {
        let err = Action::from_parts("END_TEST", json!({"status": "exploded"})).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPayload { action, .. } if action == "END_TEST"));
    }

    #[test]
    fn test_metadata_terminal() {
        let mut meta = RunMetadata::default();
        assert!(!meta.is_terminal());
        meta.status = Some(RunStatus::Running);
        assert!(!meta.is_terminal());
        meta.status = Some(RunStatus::Failed);
        assert!(meta.is_terminal());
    }
}

pub mod bus;
pub mod store;
pub mod types;

pub use bus::{Event, EventKind, ObserverBus, ObserverFn, SubscriptionId};
pub use store::StateStore;
pub use types::{
    Action, AnalysisRecord, Artifacts, ErrorRecord, RunMetadata, RunState, RunStatus,
    ScreenshotRecord, StepRecord, StepStatus, StoreError, StoreResult,
};

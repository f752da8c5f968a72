//! page-probe - Single-page web test orchestration with AI failure analysis.
//!
//! This crate provides:
//! - A transition-driven state store with an observer bus for one test run
//! - A step orchestrator that reacts to recorded errors with LLM analysis
//! - A narrow Page capability with curl-backed and mock implementations
//! - Session management for organized artifact files
//! - Self-contained HTML/JSON reports over the exported run state
//!
//! # Example
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use page_probe::analyzer::NullAnalyzer;
//! use page_probe::orchestrator::TestOrchestrator;
//! use page_probe::page::HttpPage;
//! use page_probe::plan::default_plan;
//!
//! let plan = default_plan("https://example.com", "https://youtu.be/dQw4w9WgXcQ");
//! let mut page = HttpPage::new("/tmp/page-probe/demo");
//! let mut orchestrator = TestOrchestrator::new(Rc::new(NullAnalyzer));
//! let state = orchestrator.run_test(&mut page, &plan).unwrap();
//! println!("{:?}", state.metadata.status);
//! ```

pub mod analyzer;
pub mod config;
pub mod orchestrator;
pub mod page;
pub mod plan;
pub mod report;
pub mod session;
pub mod state;

// Re-export the core state machine types
pub use state::{
    Action, AnalysisRecord, Artifacts, ErrorRecord, Event, EventKind, ObserverBus, RunMetadata,
    RunState, RunStatus, ScreenshotRecord, StateStore, StepRecord, StepStatus, StoreError,
    StoreResult, SubscriptionId,
};

// Re-export the orchestration surface
pub use orchestrator::{ANALYSIS_FALLBACK, TestOrchestrator};
pub use plan::{StepAction, TestPlan, TestStep, default_plan};

// Re-export capabilities
pub use analyzer::{
    AnalyzerError, AnalyzerResult, ErrorAnalyzer, LlmAnalyzer, LlmConfig, NullAnalyzer,
    build_error_prompt, check_health,
};
pub use page::{HttpPage, MockPage, Page, PageError, PageResult};

// Re-export session management
pub use session::{Session, cleanup_old_sessions, list_sessions};

// Re-export reporting
pub use report::{render_html, render_json, write_report};

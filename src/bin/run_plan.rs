use std::rc::Rc;

use page_probe::analyzer::NullAnalyzer;
use page_probe::orchestrator::TestOrchestrator;
use page_probe::page::{MockPage, PageError};
use page_probe::plan::default_plan;
use page_probe::session::Session;

fn main() {
    let session = Session::with_name("demo_plan").keep(true);
    if let Err(e) = session.init() {
        eprintln!("Failed to initialize session: {}", e);
        return;
    }

    // Scripted page: navigation succeeds, the fill step fails, so the demo
    // exercises the error-recording and analysis-fallback path.
    let mut page = MockPage::new(session.dir.clone())
        .then_ok()
        .then_fail(PageError::ElementNotFound(
            "no input matched any candidate selector".to_string(),
        ));

    let plan = default_plan("https://example.com", "https://youtu.be/dQw4w9WgXcQ");
    let mut orchestrator = TestOrchestrator::new(Rc::new(NullAnalyzer));

    match orchestrator.run_test(&mut page, &plan) {
        Ok(state) => {
            println!("Run finished with status {:?}", state.metadata.status);
            for record in &state.history {
                println!("  {} -> {:?}", record.step, record.status);
            }
            for shot in &state.artifacts.screenshots {
                println!("  Screenshot: {}", shot.path.display());
            }
            for analysis in &state.artifacts.analysis {
                println!("  Analysis: {}", analysis.content);
            }
            println!("Session: {}", session.dir.display());
        }
        Err(e) => {
            eprintln!("Run failed: {}", e);
        }
    }

    std::mem::forget(session);
}

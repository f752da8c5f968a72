use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;

use page_probe::analyzer::{ErrorAnalyzer, LlmAnalyzer, LlmConfig, NullAnalyzer, check_health};
use page_probe::orchestrator::TestOrchestrator;
use page_probe::page::HttpPage;
use page_probe::plan::default_plan;
use page_probe::report;
use page_probe::session::Session;
use page_probe::state::{RunState, RunStatus};

/// page-probe - Single-page web test orchestration with AI failure analysis
#[derive(Parser, Debug)]
#[command(
    name = "page-probe",
    about = "Single-page web test orchestration with transition tracking and LLM failure analysis",
    after_help = "ENVIRONMENT VARIABLES:\n\
        PAGE_PROBE_LLM_ENDPOINT    Chat-completions endpoint URL\n\
        PAGE_PROBE_LLM_MODEL       LLM model name\n\
        PAGE_PROBE_SESSION_DIR     Base directory for sessions\n\
        PAGE_PROBE_NAV_TIMEOUT     Page navigation timeout (seconds)\n\
        OPENAI_API_KEY             Bearer token for the LLM endpoint"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the standard single-page test against a URL
    Run {
        /// Target page to test
        #[arg(short, long)]
        url: String,

        /// Value to fill into the located URL input
        #[arg(
            short,
            long,
            default_value = "https://www.youtube.com/watch?v=aWk2XZ_8IhA"
        )]
        fill_value: String,

        /// Output directory for artifacts (default: auto-generated in session dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep artifacts after completion (default: cleanup unless --output is specified)
        #[arg(long, short = 'k')]
        keep: bool,

        /// Analyze recorded errors with the configured LLM
        #[arg(long)]
        analyze: bool,

        /// LLM endpoint URL
        #[arg(
            long,
            env = "PAGE_PROBE_LLM_ENDPOINT",
            default_value = "http://127.0.0.1:8080/v1/chat/completions"
        )]
        llm_endpoint: String,

        /// LLM model name
        #[arg(long, env = "PAGE_PROBE_LLM_MODEL", default_value = "gpt-4")]
        llm_model: String,

        /// Navigation timeout in seconds
        #[arg(long, env = "PAGE_PROBE_NAV_TIMEOUT", default_value = "10")]
        nav_timeout: u64,

        /// Output the exported run state as JSON
        #[arg(long)]
        json: bool,

        /// Write the HTML report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Render an HTML report from a previously exported run state
    Report {
        /// Path to an exported run-state JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the HTML report
        #[arg(short, long, default_value = "./test-report.html")]
        output: PathBuf,

        /// Test case name shown in the report
        #[arg(long, default_value = "page-probe run")]
        test_name: String,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Run {
            url,
            fill_value,
            output,
            keep,
            analyze,
            llm_endpoint,
            llm_model,
            nav_timeout,
            json,
            report: report_path,
        }) => {
            // Create session - if output specified, use that dir and keep by default
            let session = if let Some(ref dir) = output {
                Session::in_dir(dir).keep(keep || output.is_some())
            } else {
                let host = url
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .split('/')
                    .next()
                    .unwrap_or("run");
                Session::with_name(host).keep(keep)
            };
            session.init()?;

            // Check the LLM before wiring it in (unreachable endpoint falls
            // back to the null analyzer; errors still get a placeholder)
            let analyzer: Rc<dyn ErrorAnalyzer> = if analyze {
                match check_health(&llm_endpoint, 5) {
                    Ok(true) => {
                        if !json {
                            eprintln!("LLM endpoint responding, analysis enabled...");
                        }
                        Rc::new(LlmAnalyzer::new(
                            LlmConfig::new(&llm_endpoint).model(&llm_model),
                        ))
                    }
                    Ok(false) | Err(_) => {
                        eprintln!("Warning: LLM endpoint not responding at {}", llm_endpoint);
                        eprintln!("Running without analysis. Artifacts will still be saved.");
                        Rc::new(NullAnalyzer)
                    }
                }
            } else {
                Rc::new(NullAnalyzer)
            };

            let plan = default_plan(&url, &fill_value);
            let mut page = HttpPage::new(session.dir.clone()).timeout(nav_timeout);
            let mut orchestrator = TestOrchestrator::new(analyzer);

            let state = orchestrator.run_test(&mut page, &plan)?;

            if let Some(path) = &report_path {
                report::write_report(&state, &plan.name, path)?;
                if !json {
                    println!("Report written to {}", path.display());
                }
            }

            if json {
                println!("{}", report::render_json(&state)?);
            } else {
                print_summary(&state);
                println!("\nSession: {}", session.dir.display());
            }

            // Keep session alive if needed (prevent Drop cleanup)
            if keep || output.is_some() {
                std::mem::forget(session);
            }
        }

        Some(Commands::Report {
            input,
            output,
            test_name,
        }) => {
            let raw = std::fs::read_to_string(&input)?;
            let state: RunState = serde_json::from_str(&raw)?;
            report::write_report(&state, &test_name, &output)?;
            println!("Report written to {}", output.display());
        }

        None => {
            println!("page-probe - Single-page web test orchestration with AI failure analysis");
            println!();
            println!("Usage: page-probe <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run     Run the standard single-page test against a URL");
            println!("  report  Render an HTML report from an exported run state");
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}

fn print_summary(state: &RunState) {
    let status = match state.metadata.status {
        Some(RunStatus::Success) => "success",
        Some(RunStatus::Failed) => "failed",
        Some(RunStatus::Running) => "running",
        None => "not started",
    };
    println!("Run completed: {}", status);

    for record in &state.history {
        println!("  {:24} {:?}", record.step, record.status);
    }
    for error in &state.artifacts.errors {
        println!("  Error ({}): {}", error.step.as_deref().unwrap_or("-"), error.error);
    }
    for analysis in &state.artifacts.analysis {
        // Print first 200 chars of the analysis
        let preview: String = analysis.content.chars().take(200).collect();
        println!("  Analysis: {}...", preview);
    }
    println!(
        "  Artifacts: {} screenshots, {} errors, {} analysis entries",
        state.artifacts.screenshots.len(),
        state.artifacts.errors.len(),
        state.artifacts.analysis.len()
    );
}

//! Report rendering: pure functions from an exported run state to HTML or
//! JSON documents.
//!
//! The renderer never touches the live store; it consumes the deep copy
//! returned by `export_state`. PNG screenshots are inlined as base64 data
//! URIs so the HTML report is a single self-contained file; other artifact
//! files (page snapshots) are linked by path.

use std::collections::HashMap;
use std::path::Path;

use base64::Engine;

use crate::state::{RunState, RunStatus, StepStatus};

/// Render the full HTML report for a run
pub fn render_html(state: &RunState, test_name: &str) -> String {
    let status_class = match state.metadata.status {
        Some(RunStatus::Success) => "pass",
        Some(RunStatus::Failed) => "fail",
        _ => "running",
    };
    let status_label = match state.metadata.status {
        Some(RunStatus::Success) => "pass",
        Some(RunStatus::Failed) => "fail",
        Some(RunStatus::Running) => "running",
        None => "not started",
    };

    let generated = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let duration = match (state.metadata.start_time, state.metadata.end_time) {
        (Some(start), Some(end)) => format!("{} seconds", (end - start).num_seconds()),
        _ => "n/a".to_string(),
    };

    let mut html = String::new();
    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Website Testing Report - {title}</title>
    <style>{css}</style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Website Testing Report</h1>
            <p class="timestamp">Generated on: {generated}</p>
            <div class="status {status_class}">{status_label}</div>
        </div>

        <div class="section">
            <h2>Test Information</h2>
            <p><strong>Test Case:</strong> {title}</p>
            <p><strong>Test Duration:</strong> {duration}</p>
        </div>
"#,
        title = escape_html(test_name),
        css = REPORT_CSS,
        generated = generated,
        status_class = status_class,
        status_label = status_label,
        duration = duration,
    ));

    render_steps_section(state, &mut html);
    render_analysis_section(state, &mut html);
    render_screenshots_section(state, &mut html);

    html.push_str("    </div>\n</body>\n</html>\n");
    html
}

/// Pretty JSON export of the run state
pub fn render_json(state: &RunState) -> serde_json::Result<String> {
    serde_json::to_string_pretty(state)
}

/// Render the HTML report and write it to `path`
pub fn write_report(state: &RunState, test_name: &str, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, render_html(state, test_name))
}

/// Collapse the step history into (step, final status) in first-seen order
fn final_step_statuses(state: &RunState) -> Vec<(String, StepStatus)> {
    let mut order = Vec::new();
    let mut latest: HashMap<&str, StepStatus> = HashMap::new();
    for record in &state.history {
        if !latest.contains_key(record.step.as_str()) {
            order.push(record.step.clone());
        }
        latest.insert(record.step.as_str(), record.status);
    }
    order
        .into_iter()
        .map(|step| {
            let status = latest[step.as_str()];
            (step, status)
        })
        .collect()
}

fn render_steps_section(state: &RunState, html: &mut String) {
    html.push_str("        <div class=\"section\">\n            <h2>Test Steps</h2>\n");
    for (step, status) in final_step_statuses(state) {
        let (class, mark) = match status {
            StepStatus::Success => ("success", "&#x2705;"),
            StepStatus::Failed => ("failed", "&#x274C;"),
            StepStatus::Running => ("running", "&#x23F3;"),
        };
        html.push_str(&format!(
            "            <div class=\"step {}\">\n                <p>{} {}</p>\n",
            class,
            mark,
            escape_html(&step)
        ));
        if status == StepStatus::Failed {
            for error in state
                .artifacts
                .errors
                .iter()
                .filter(|e| e.step.as_deref() == Some(step.as_str()))
            {
                html.push_str(&format!(
                    "                <div class=\"error\">Error: {}</div>\n",
                    escape_html(&error.error)
                ));
            }
        }
        html.push_str("            </div>\n");
    }
    html.push_str("        </div>\n");
}

fn render_analysis_section(state: &RunState, html: &mut String) {
    html.push_str("        <div class=\"section\">\n            <h2>AI Analysis</h2>\n");
    if state.artifacts.analysis.is_empty() {
        html.push_str("            <div class=\"analysis\">No analysis recorded.</div>\n");
    } else {
        for record in &state.artifacts.analysis {
            let step = record
                .step
                .as_deref()
                .map(|s| format!("<strong>{}:</strong> ", escape_html(s)))
                .unwrap_or_default();
            html.push_str(&format!(
                "            <div class=\"analysis\">{}{}</div>\n",
                step,
                escape_html(&record.content)
            ));
        }
    }
    html.push_str("        </div>\n");
}

fn render_screenshots_section(state: &RunState, html: &mut String) {
    html.push_str(
        "        <div class=\"section\">\n            <h2>Screenshots</h2>\n            <div class=\"screenshots\">\n",
    );
    for (index, shot) in state.artifacts.screenshots.iter().enumerate() {
        let caption = shot
            .step
            .as_deref()
            .map(escape_html)
            .unwrap_or_else(|| format!("Screenshot {}", index + 1));
        match embed_image(&shot.path) {
            Some(data_uri) => {
                html.push_str(&format!(
                    "                <div class=\"screenshot\"><img src=\"{}\" alt=\"{}\"><p>{}</p></div>\n",
                    data_uri, caption, caption
                ));
            }
            None => {
                html.push_str(&format!(
                    "                <div class=\"screenshot\"><p>{}: <code>{}</code></p></div>\n",
                    caption,
                    escape_html(&shot.path.display().to_string())
                ));
            }
        }
    }
    html.push_str("            </div>\n        </div>\n");
}

/// Inline a PNG file as a data URI; non-PNG or unreadable files are linked
/// by path instead
fn embed_image(path: &Path) -> Option<String> {
    if path.extension().map(|e| e != "png").unwrap_or(true) {
        return None;
    }
    let data = std::fs::read(path).ok()?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
    Some(format!("data:image/png;base64,{}", encoded))
}

/// Minimal HTML escaping for user-controlled text
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const REPORT_CSS: &str = r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            line-height: 1.6;
            max-width: 1200px;
            margin: 0 auto;
            padding: 20px;
            background-color: #f5f5f5;
        }
        .container {
            background-color: white;
            padding: 30px;
            border-radius: 8px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
        .header {
            text-align: center;
            margin-bottom: 30px;
            padding-bottom: 20px;
            border-bottom: 2px solid #eee;
        }
        .status {
            display: inline-block;
            padding: 8px 16px;
            border-radius: 4px;
            font-weight: bold;
            text-transform: uppercase;
            font-size: 14px;
        }
        .status.fail { background-color: #ffebee; color: #c62828; }
        .status.pass { background-color: #e8f5e9; color: #2e7d32; }
        .status.running { background-color: #fff8e1; color: #f9a825; }
        .section { margin-bottom: 30px; }
        .section h2 {
            color: #333;
            border-bottom: 1px solid #eee;
            padding-bottom: 10px;
        }
        .step {
            margin: 10px 0;
            padding: 10px;
            background-color: #f8f9fa;
            border-radius: 4px;
        }
        .step.failed { background-color: #fff3f3; border-left: 4px solid #dc3545; }
        .step.success { background-color: #f3fff3; border-left: 4px solid #28a745; }
        .screenshots {
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(300px, 1fr));
            gap: 20px;
            margin-top: 20px;
        }
        .screenshot {
            background-color: white;
            padding: 10px;
            border-radius: 4px;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
        }
        .screenshot img {
            width: 100%;
            height: auto;
            border: 1px solid #eee;
            border-radius: 4px;
        }
        .screenshot p { margin: 10px 0 0 0; font-size: 14px; color: #666; }
        .error {
            background-color: #fff3f3;
            padding: 15px;
            border-radius: 4px;
            margin: 10px 0;
            color: #dc3545;
            font-family: monospace;
        }
        .timestamp { color: #666; font-size: 14px; }
        .analysis {
            background-color: #f8f9fa;
            padding: 20px;
            border-radius: 4px;
            margin: 20px 0;
        }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        AnalysisRecord, ErrorRecord, RunMetadata, ScreenshotRecord, StepRecord,
    };
    use chrono::Utc;
    use std::path::PathBuf;

    fn failed_state() -> RunState {
        let now = Utc::now();
        RunState {
            metadata: RunMetadata {
                start_time: Some(now),
                end_time: Some(now + chrono::Duration::seconds(12)),
                status: Some(RunStatus::Failed),
            },
            history: vec![
                StepRecord {
                    step: "navigate".to_string(),
                    status: StepStatus::Running,
                    timestamp: now,
                },
                StepRecord {
                    step: "navigate".to_string(),
                    status: StepStatus::Success,
                    timestamp: now,
                },
                StepRecord {
                    step: "fill input".to_string(),
                    status: StepStatus::Running,
                    timestamp: now,
                },
                StepRecord {
                    step: "fill input".to_string(),
                    status: StepStatus::Failed,
                    timestamp: now,
                },
            ],
            artifacts: crate::state::Artifacts {
                screenshots: vec![ScreenshotRecord {
                    path: PathBuf::from("/nonexistent/shot.png"),
                    step: Some("fill input".to_string()),
                    timestamp: now,
                }],
                errors: vec![ErrorRecord {
                    error: "Element not found: <input> & friends".to_string(),
                    step: Some("fill input".to_string()),
                    timestamp: now,
                }],
                analysis: vec![AnalysisRecord {
                    content: "The page hides its input behind a consent wall.".to_string(),
                    step: Some("fill input".to_string()),
                    timestamp: now,
                }],
            },
        }
    }

    #[test]
    fn test_render_html_contains_sections() {
        let html = render_html(&failed_state(), "URL input test");
        assert!(html.contains("Website Testing Report"));
        assert!(html.contains("URL input test"));
        assert!(html.contains("Test Duration:</strong> 12 seconds"));
        assert!(html.contains("class=\"status fail\""));
        assert!(html.contains("consent wall"));
    }

    #[test]
    fn test_final_status_per_step() {
        let html = render_html(&failed_state(), "t");
        // navigate succeeded, fill failed; each step appears once
        assert_eq!(html.matches("class=\"step success\"").count(), 1);
        assert_eq!(html.matches("class=\"step failed\"").count(), 1);
    }

    #[test]
    fn test_error_text_is_escaped() {
        let html = render_html(&failed_state(), "t");
        assert!(html.contains("&lt;input&gt; &amp; friends"));
        assert!(!html.contains("<input> & friends"));
    }

    #[test]
    fn test_unreadable_screenshot_falls_back_to_path() {
        let html = render_html(&failed_state(), "t");
        assert!(html.contains("/nonexistent/shot.png"));
        assert!(!html.contains("data:image/png"));
    }

    #[test]
    fn test_embedded_screenshot_becomes_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = crate::page::MockPage::new(dir.path());
        use crate::page::Page;
        let shot = page.screenshot("embed").unwrap();

        let mut state = failed_state();
        state.artifacts.screenshots[0].path = shot;
        let html = render_html(&state, "t");
        assert!(html.contains("data:image/png;base64,"));
    }

    #[test]
    fn test_render_json_round_trips() {
        let state = failed_state();
        let json = render_json(&state).unwrap();
        let back: RunState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}

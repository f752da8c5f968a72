//! Error analysis via an OpenAI-compatible chat-completions endpoint.
//!
//! Provides robust LLM communication with:
//! - Streaming responses (no total timeout, activity-based timeout)
//! - Connection health checks
//! - Non-streaming fallback for APIs without SSE support
//!
//! The orchestrator consumes this through the [`ErrorAnalyzer`] trait; the
//! LLM-backed implementation is [`LlmAnalyzer`], and [`NullAnalyzer`]
//! preserves the one-analysis-per-error guarantee when analysis is disabled.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config;
use crate::state::ErrorRecord;

/// Result type for analyzer operations
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Errors that can occur during analysis
#[derive(Debug)]
pub enum AnalyzerError {
    /// Failed to connect to the LLM endpoint
    ConnectionFailed(String),
    /// No activity for too long during streaming
    ActivityTimeout(Duration),
    /// Invalid response from the LLM
    InvalidResponse(String),
    /// IO error
    Io(std::io::Error),
}

impl std::fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalyzerError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            AnalyzerError::ActivityTimeout(d) => write!(f, "No response for {:?}", d),
            AnalyzerError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            AnalyzerError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for AnalyzerError {}

impl From<std::io::Error> for AnalyzerError {
    fn from(e: std::io::Error) -> Self {
        AnalyzerError::Io(e)
    }
}

/// The capability the orchestrator reacts through: turn one recorded error
/// into analysis text. May fail; the orchestrator falls back to a
/// placeholder entry so the run is never aborted by analysis.
pub trait ErrorAnalyzer {
    fn analyze(&self, record: &ErrorRecord) -> AnalyzerResult<String>;
}

/// Analyzer used when analysis is disabled; always succeeds with a fixed text
#[derive(Debug, Default)]
pub struct NullAnalyzer;

impl ErrorAnalyzer for NullAnalyzer {
    fn analyze(&self, _record: &ErrorRecord) -> AnalyzerResult<String> {
        Ok("Automated analysis was disabled for this run.".to_string())
    }
}

/// System prompt for the analysis request
const SYSTEM_PROMPT: &str =
    "You are a web testing expert. Analyze the following error and provide insights.";

/// Configuration for the LLM client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Chat-completions endpoint URL
    pub endpoint: String,
    /// Model name to use
    pub model: String,
    /// Maximum tokens in response
    pub max_tokens: u32,
    /// Timeout for initial connection (seconds)
    pub connection_timeout: u64,
    /// Timeout for inactivity during streaming (seconds)
    pub activity_timeout: u64,
    /// Optional bearer token
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            endpoint: cfg.llm.endpoint.clone(),
            model: cfg.llm.model.clone(),
            max_tokens: cfg.llm.max_tokens,
            connection_timeout: cfg.llm.connect_timeout,
            activity_timeout: cfg.llm.activity_timeout,
            api_key: cfg.llm.api_key.clone(),
        }
    }
}

impl LlmConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn activity_timeout(mut self, seconds: u64) -> Self {
        self.activity_timeout = seconds;
        self
    }
}

/// LLM-backed implementation of [`ErrorAnalyzer`]
#[derive(Debug, Default)]
pub struct LlmAnalyzer {
    config: LlmConfig,
}

impl LlmAnalyzer {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }
}

impl ErrorAnalyzer for LlmAnalyzer {
    fn analyze(&self, record: &ErrorRecord) -> AnalyzerResult<String> {
        analyze_error(&self.config, record)
    }
}

/// Check if an LLM endpoint is reachable (connection-only check).
///
/// This only verifies the server accepts connections - it doesn't wait for
/// a full completion since analysis requests can take tens of seconds.
pub fn check_health(endpoint: &str, timeout_secs: u64) -> AnalyzerResult<bool> {
    // Extract host:port from the endpoint URL for the connection test
    let url = endpoint
        .trim_start_matches("http://")
        .trim_start_matches("https://");
    let host_port = url.split('/').next().unwrap_or("127.0.0.1:8080");

    let output = Command::new("curl")
        .args([
            "-s",
            "-o",
            "/dev/null",
            "-w",
            "%{http_code}",
            "--connect-timeout",
            &timeout_secs.to_string(),
            "--max-time",
            &timeout_secs.to_string(),
            "-I",
            &format!("http://{}", host_port),
        ])
        .output()?;

    let status = String::from_utf8_lossy(&output.stdout);
    // Any response (even 4xx/5xx) means the server is reachable;
    // 000 means the connection failed entirely
    let code: u16 = status.trim().parse().unwrap_or(0);
    Ok(code > 0)
}

/// Build the user prompt for one recorded error
pub fn build_error_prompt(record: &ErrorRecord) -> String {
    let serialized =
        serde_json::to_string(record).unwrap_or_else(|_| record.error.clone());
    format!(
        "Analyze this testing error and provide recommendations: {}",
        serialized
    )
}

fn chat_request(
    config: &LlmConfig,
    record: &ErrorRecord,
    stream: bool,
) -> AnalyzerResult<String> {
    let request = serde_json::json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": build_error_prompt(record) }
        ],
        "temperature": 0.7,
        "max_tokens": config.max_tokens,
        "stream": stream
    });
    serde_json::to_string(&request).map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))
}

fn curl_args(config: &LlmConfig, request_json: &str, connect_timeout: &str) -> Vec<String> {
    let mut args = vec![
        "-s".to_string(),
        "-N".to_string(),
        "-X".to_string(),
        "POST".to_string(),
        config.endpoint.clone(),
        "-H".to_string(),
        "Content-Type: application/json".to_string(),
    ];
    if let Some(key) = &config.api_key {
        args.push("-H".to_string());
        args.push(format!("Authorization: Bearer {}", key));
    }
    args.push("-d".to_string());
    args.push(request_json.to_string());
    args.push("--connect-timeout".to_string());
    args.push(connect_timeout.to_string());
    args
}

/// Analyze a recorded error using streaming to avoid total-duration timeouts
pub fn analyze_error(config: &LlmConfig, record: &ErrorRecord) -> AnalyzerResult<String> {
    let request_json = chat_request(config, record, true)?;
    let connect_timeout = config.connection_timeout.to_string();

    let mut child = Command::new("curl")
        .args(curl_args(config, &request_json, &connect_timeout))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AnalyzerError::Io(std::io::Error::other("Failed to capture stdout")))?;

    // Read the streaming response with an activity timeout
    let (tx, rx) = mpsc::channel();
    let activity_timeout = Duration::from_secs(config.activity_timeout);

    thread::spawn(move || {
        let reader = BufReader::new(stdout);
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });

    let mut full_content = String::new();
    let mut last_activity = Instant::now();

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok(line)) => {
                last_activity = Instant::now();

                // Parse SSE data lines
                if let Some(data) = line.strip_prefix("data: ") {
                    if data == "[DONE]" {
                        break;
                    }
                    if let Ok(json) = serde_json::from_str::<serde_json::Value>(data) {
                        if let Some(content) = json["choices"][0]["delta"]["content"].as_str() {
                            full_content.push_str(content);
                        }
                    }
                }
            }
            Ok(Err(e)) => {
                return Err(AnalyzerError::Io(e));
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if last_activity.elapsed() > activity_timeout {
                    let _ = child.kill();
                    return Err(AnalyzerError::ActivityTimeout(activity_timeout));
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                break;
            }
        }
    }

    let status = child.wait()?;

    if !status.success() && full_content.is_empty() {
        return Err(AnalyzerError::ConnectionFailed(
            "curl process failed".to_string(),
        ));
    }

    // If streaming produced nothing, the endpoint may not support SSE
    if full_content.is_empty() {
        return analyze_error_non_streaming(config, record);
    }

    Ok(full_content)
}

/// Fallback non-streaming analysis (for APIs that don't support streaming)
fn analyze_error_non_streaming(
    config: &LlmConfig,
    record: &ErrorRecord,
) -> AnalyzerResult<String> {
    let request_json = chat_request(config, record, false)?;
    let connect_timeout = config.connection_timeout.to_string();

    let output = Command::new("curl")
        .args(curl_args(config, &request_json, &connect_timeout))
        .output()?;

    if !output.status.success() {
        return Err(AnalyzerError::ConnectionFailed(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let response: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))?;

    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("");

    if content.is_empty() {
        return Err(AnalyzerError::InvalidResponse(
            "no content in completion".to_string(),
        ));
    }

    Ok(content.to_string())
}

//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for page-probe, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults that match the original hardcoded values
//! - Typed settings structs for programmatic access
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PAGE_PROBE_LLM_ENDPOINT` | Chat-completions endpoint URL | `http://127.0.0.1:8080/v1/chat/completions` |
//! | `PAGE_PROBE_LLM_MODEL` | Model name for failure analysis | `gpt-4` |
//! | `PAGE_PROBE_LLM_MAX_TOKENS` | Maximum tokens in analysis response | `500` |
//! | `PAGE_PROBE_LLM_TIMEOUT` | LLM activity timeout in seconds | `60` |
//! | `PAGE_PROBE_LLM_CONNECT_TIMEOUT` | LLM connection timeout in seconds | `10` |
//! | `OPENAI_API_KEY` | Bearer token for the LLM endpoint | unset |
//! | `PAGE_PROBE_SESSION_DIR` | Base directory for sessions | `/tmp/page-probe` |
//! | `PAGE_PROBE_NAV_TIMEOUT` | Page navigation timeout in seconds | `10` |
//!
//! # Example
//!
//! ```bash
//! # Point analysis at a local OpenAI-compatible server
//! export PAGE_PROBE_LLM_ENDPOINT="http://localhost:11434/v1/chat/completions"
//! export PAGE_PROBE_LLM_MODEL="llama3"
//!
//! # Use a custom session directory
//! export PAGE_PROBE_SESSION_DIR="/var/tmp/page-probe-sessions"
//! ```

use std::env;
use std::sync::OnceLock;

// ============================================================================
// Default Values (matching original hardcoded values)
// ============================================================================

/// Default chat-completions endpoint
pub const DEFAULT_LLM_ENDPOINT: &str = "http://127.0.0.1:8080/v1/chat/completions";

/// Default model for failure analysis
pub const DEFAULT_LLM_MODEL: &str = "gpt-4";

/// Default max tokens for analysis responses
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 500;

/// Default LLM connection timeout (seconds)
pub const DEFAULT_LLM_CONNECT_TIMEOUT: u64 = 10;

/// Default LLM activity timeout (seconds)
pub const DEFAULT_LLM_ACTIVITY_TIMEOUT: u64 = 60;

/// Default session base directory
pub const DEFAULT_SESSION_DIR: &str = "/tmp/page-probe";

/// Default page navigation timeout (seconds)
pub const DEFAULT_NAV_TIMEOUT: u64 = 10;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the LLM endpoint
pub const ENV_LLM_ENDPOINT: &str = "PAGE_PROBE_LLM_ENDPOINT";

/// Environment variable for the LLM model
pub const ENV_LLM_MODEL: &str = "PAGE_PROBE_LLM_MODEL";

/// Environment variable for LLM max tokens
pub const ENV_LLM_MAX_TOKENS: &str = "PAGE_PROBE_LLM_MAX_TOKENS";

/// Environment variable for LLM connection timeout
pub const ENV_LLM_CONNECT_TIMEOUT: &str = "PAGE_PROBE_LLM_CONNECT_TIMEOUT";

/// Environment variable for LLM activity timeout
pub const ENV_LLM_ACTIVITY_TIMEOUT: &str = "PAGE_PROBE_LLM_TIMEOUT";

/// Environment variable for the LLM API key (OpenAI-compatible convention)
pub const ENV_LLM_API_KEY: &str = "OPENAI_API_KEY";

/// Environment variable for the session directory
pub const ENV_SESSION_DIR: &str = "PAGE_PROBE_SESSION_DIR";

/// Environment variable for the navigation timeout
pub const ENV_NAV_TIMEOUT: &str = "PAGE_PROBE_NAV_TIMEOUT";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for page-probe
#[derive(Debug, Clone)]
pub struct Config {
    /// LLM analysis configuration
    pub llm: LlmSettings,
    /// Session configuration
    pub session: SessionSettings,
    /// Page capability configuration
    pub page: PageSettings,
}

/// LLM-related settings
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Chat-completions endpoint URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Maximum tokens in response
    pub max_tokens: u32,
    /// Connection timeout (seconds)
    pub connect_timeout: u64,
    /// Activity timeout during streaming (seconds)
    pub activity_timeout: u64,
    /// Optional bearer token for authenticated endpoints
    pub api_key: Option<String>,
}

/// Session-related settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Base directory for session storage
    pub base_dir: String,
}

/// Page-capability settings
#[derive(Debug, Clone)]
pub struct PageSettings {
    /// Navigation timeout (seconds)
    pub nav_timeout: u64,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            llm: LlmSettings::from_env(),
            session: SessionSettings::from_env(),
            page: PageSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            llm: LlmSettings::defaults(),
            session: SessionSettings::defaults(),
            page: PageSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl LlmSettings {
    /// Create LLM settings from environment variables
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var(ENV_LLM_ENDPOINT)
                .unwrap_or_else(|_| DEFAULT_LLM_ENDPOINT.to_string()),
            model: env::var(ENV_LLM_MODEL)
                .unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            max_tokens: env::var(ENV_LLM_MAX_TOKENS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LLM_MAX_TOKENS),
            connect_timeout: env::var(ENV_LLM_CONNECT_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LLM_CONNECT_TIMEOUT),
            activity_timeout: env::var(ENV_LLM_ACTIVITY_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LLM_ACTIVITY_TIMEOUT),
            api_key: env::var(ENV_LLM_API_KEY).ok().filter(|k| !k.is_empty()),
        }
    }

    /// Create LLM settings with defaults
    pub fn defaults() -> Self {
        Self {
            endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            max_tokens: DEFAULT_LLM_MAX_TOKENS,
            connect_timeout: DEFAULT_LLM_CONNECT_TIMEOUT,
            activity_timeout: DEFAULT_LLM_ACTIVITY_TIMEOUT,
            api_key: None,
        }
    }
}

impl SessionSettings {
    /// Create session settings from environment variables
    pub fn from_env() -> Self {
        Self {
            base_dir: env::var(ENV_SESSION_DIR)
                .unwrap_or_else(|_| DEFAULT_SESSION_DIR.to_string()),
        }
    }

    /// Create session settings with defaults
    pub fn defaults() -> Self {
        Self {
            base_dir: DEFAULT_SESSION_DIR.to_string(),
        }
    }
}

impl PageSettings {
    /// Create page settings from environment variables
    pub fn from_env() -> Self {
        Self {
            nav_timeout: env::var(ENV_NAV_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_NAV_TIMEOUT),
        }
    }

    /// Create page settings with defaults
    pub fn defaults() -> Self {
        Self {
            nav_timeout: DEFAULT_NAV_TIMEOUT,
        }
    }
}

// ============================================================================
// Convenience Accessors
// ============================================================================

/// Get the LLM endpoint from the cached configuration
pub fn llm_endpoint() -> String {
    get().llm.endpoint.clone()
}

/// Get the LLM model from the cached configuration
pub fn llm_model() -> String {
    get().llm.model.clone()
}

/// Get the session base directory from the cached configuration
pub fn session_base_dir() -> String {
    get().session.base_dir.clone()
}

/// Get the navigation timeout from the cached configuration
pub fn nav_timeout() -> u64 {
    get().page.nav_timeout
}

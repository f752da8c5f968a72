//! Page capability: the narrow browser-facing interface the orchestrator
//! drives, plus the adapters that implement it.
//!
//! Implementations:
//! - [`HttpPage`] — curl-based static-DOM adapter for real pages
//! - [`MockPage`] — scripted outcomes and placeholder screenshots for tests

pub mod http;
pub mod mock;

pub use http::HttpPage;
pub use mock::MockPage;

use std::path::PathBuf;

/// Result type for page operations
pub type PageResult<T> = Result<T, PageError>;

/// Error types for page operations
#[derive(Debug)]
pub enum PageError {
    /// Navigation failed (unreachable, non-success status, timeout)
    Navigation(String),

    /// No element matched any candidate selector
    ElementNotFound(String),

    /// An element was found but could not be interacted with
    Interaction(String),

    /// I/O error while persisting an artifact
    Io(std::io::Error),
}

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageError::Navigation(msg) => write!(f, "Navigation error: {}", msg),
            PageError::ElementNotFound(msg) => write!(f, "Element not found: {}", msg),
            PageError::Interaction(msg) => write!(f, "Interaction error: {}", msg),
            PageError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for PageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PageError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PageError {
    fn from(err: std::io::Error) -> Self {
        PageError::Io(err)
    }
}

impl From<image::ImageError> for PageError {
    fn from(err: image::ImageError) -> Self {
        PageError::Io(std::io::Error::other(err.to_string()))
    }
}

/// The browser-facing capability the orchestrator requires: navigate and
/// await readiness, locate-and-fill one input among ordered candidate
/// selectors, and screenshot on demand.
pub trait Page {
    /// Navigate to a URL and wait until the page is ready
    fn navigate(&mut self, url: &str) -> PageResult<()>;

    /// Fill the first input matched by the candidate selectors, in order.
    /// Returns the selector that matched.
    fn fill_first(&mut self, selectors: &[String], value: &str) -> PageResult<String>;

    /// Capture the current page state to a file and return its path
    fn screenshot(&mut self, label: &str) -> PageResult<PathBuf>;
}

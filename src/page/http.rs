//! Curl-based static-DOM page adapter.
//!
//! Fetches the target page over HTTP and answers selector queries against
//! the fetched markup. This is deliberately not a browser: there is no
//! script execution and no real input focus, so `fill_first` verifies that
//! a matching input exists in the served DOM and records the fill.
//! "Screenshots" are HTML snapshots of the page as last fetched.

use std::path::PathBuf;
use std::process::Command;

use crate::config;
use crate::session;

use super::{Page, PageError, PageResult};

/// Static-DOM page backed by curl fetches
#[derive(Debug)]
pub struct HttpPage {
    /// Directory where page snapshots are written
    output_dir: PathBuf,
    /// Connect and total timeout for navigation (seconds)
    timeout: u64,
    /// URL of the last successful navigation
    current_url: Option<String>,
    /// Body of the last successful navigation
    body: Option<String>,
    /// Fills performed so far: (matched selector, value)
    filled: Vec<(String, String)>,
}

impl HttpPage {
    /// Create a page that writes snapshots into `output_dir`, with the
    /// navigation timeout from configuration
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            timeout: config::nav_timeout(),
            current_url: None,
            body: None,
            filled: Vec::new(),
        }
    }

    /// Override the navigation timeout (seconds)
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// URL of the last successful navigation, if any
    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Fills performed so far: (matched selector, value)
    pub fn fills(&self) -> &[(String, String)] {
        &self.filled
    }
}

impl Page for HttpPage {
    fn navigate(&mut self, url: &str) -> PageResult<()> {
        let timeout = self.timeout.to_string();
        let output = Command::new("curl")
            .args([
                "-s",
                "-S",
                "-L",
                "--connect-timeout",
                &timeout,
                "--max-time",
                &timeout,
                "-w",
                "\n%{http_code}",
                url,
            ])
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(PageError::Navigation(if detail.is_empty() {
                format!("curl exited with {}", output.status)
            } else {
                detail.to_string()
            }));
        }

        // curl appends the status code on its own line via -w
        let text = String::from_utf8_lossy(&output.stdout).to_string();
        let (body, code_str) = text
            .rsplit_once('\n')
            .ok_or_else(|| PageError::Navigation("missing status code in response".to_string()))?;
        let code: u16 = code_str.trim().parse().unwrap_or(0);

        if code == 0 {
            return Err(PageError::Navigation(format!("no HTTP response from {}", url)));
        }
        if code >= 400 {
            return Err(PageError::Navigation(format!("HTTP status {} from {}", code, url)));
        }

        self.current_url = Some(url.to_string());
        self.body = Some(body.to_string());
        Ok(())
    }

    fn fill_first(&mut self, selectors: &[String], value: &str) -> PageResult<String> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| PageError::Interaction("no page loaded; navigate first".to_string()))?;
        let body_lower = body.to_lowercase();

        for selector in selectors {
            if selector_matches(&body_lower, selector) {
                self.filled.push((selector.clone(), value.to_string()));
                return Ok(selector.clone());
            }
        }

        Err(PageError::ElementNotFound(format!(
            "no input matched any of {} candidate selectors",
            selectors.len()
        )))
    }

    fn screenshot(&mut self, label: &str) -> PageResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(session::artifact_filename(label, "html"));
        let content = match &self.body {
            Some(body) => body.as_str(),
            None => "<!-- no page loaded -->",
        };
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

// ============================================================================
// Selector matching
// ============================================================================

/// Check whether a simple CSS-ish selector matches the fetched markup.
///
/// Supported forms: `#id`, `.class`, `tag[attr="v"]`, `[attr*="v" i]`, and a
/// bare tag name. Matching is case-insensitive (the body is pre-lowercased
/// by the caller).
fn selector_matches(body_lower: &str, selector: &str) -> bool {
    let selector = selector.trim();

    if let Some(id) = selector.strip_prefix('#') {
        return attribute_matches(body_lower, "id", &id.to_lowercase(), false);
    }
    if let Some(class) = selector.strip_prefix('.') {
        return attribute_matches(body_lower, "class", &class.to_lowercase(), true);
    }
    if let Some((attr, value, substring)) = parse_attribute_selector(selector) {
        return attribute_matches(body_lower, &attr, &value, substring);
    }
    // Bare tag selector
    body_lower.contains(&format!("<{}", selector.to_lowercase()))
}

/// Parse `tag[attr="v"]` / `[attr*="v" i]` into (attr, value, substring).
/// The trailing `i` case-insensitivity flag is accepted and ignored since
/// matching is always case-insensitive here.
fn parse_attribute_selector(selector: &str) -> Option<(String, String, bool)> {
    let open = selector.find('[')?;
    let close = selector.rfind(']')?;
    if close <= open {
        return None;
    }

    let inner = selector[open + 1..close].trim().trim_end_matches(" i").trim();
    let (attr, rest, substring) = if let Some((a, r)) = inner.split_once("*=") {
        (a, r, true)
    } else if let Some((a, r)) = inner.split_once('=') {
        (a, r, false)
    } else {
        // Bare [attr] presence check
        return Some((inner.to_lowercase(), String::new(), true));
    };

    let value = rest.trim().trim_matches('"').trim_matches('\'');
    Some((
        attr.trim().to_lowercase(),
        value.to_lowercase(),
        substring,
    ))
}

/// Scan `attr="..."` occurrences in the markup and compare each attribute
/// value (exact or substring). Handles both quote styles.
fn attribute_matches(body_lower: &str, attr: &str, value: &str, substring: bool) -> bool {
    for quote in ['"', '\''] {
        let needle = format!("{}={}", attr, quote);
        let mut search_from = 0;
        while let Some(pos) = body_lower[search_from..].find(&needle) {
            let value_start = search_from + pos + needle.len();
            let Some(end) = body_lower[value_start..].find(quote) else {
                break;
            };
            let found = &body_lower[value_start..value_start + end];
            let hit = if substring {
                value.is_empty() || found.contains(value)
            } else {
                found == value
            };
            if hit {
                return true;
            }
            search_from = value_start + end + 1;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<html><body>
        <form>
          <input type="text" id="videoUrl" placeholder="Paste a video URL here" class="url-input wide">
          <button class="btn submit">Convert</button>
        </form>
    </body></html>"#;

    fn lower(s: &str) -> String {
        s.to_lowercase()
    }

    #[test]
    fn test_id_selector() {
        assert!(selector_matches(&lower(SAMPLE), "#videoUrl"));
        assert!(!selector_matches(&lower(SAMPLE), "#missing"));
    }

    #[test]
    fn test_class_selector() {
        assert!(selector_matches(&lower(SAMPLE), ".url-input"));
        assert!(selector_matches(&lower(SAMPLE), ".submit"));
        assert!(!selector_matches(&lower(SAMPLE), ".sidebar"));
    }

    #[test]
    fn test_attribute_selectors() {
        assert!(selector_matches(&lower(SAMPLE), "input[type=\"text\"]"));
        assert!(!selector_matches(&lower(SAMPLE), "input[type=\"url\"]"));
        assert!(selector_matches(
            &lower(SAMPLE),
            "input[placeholder*=\"url\" i]"
        ));
        assert!(!selector_matches(
            &lower(SAMPLE),
            "input[placeholder*=\"email\" i]"
        ));
    }

    #[test]
    fn test_bare_tag_selector() {
        assert!(selector_matches(&lower(SAMPLE), "input"));
        assert!(!selector_matches(&lower(SAMPLE), "textarea"));
    }

    #[test]
    fn test_single_quoted_attributes() {
        let html = "<input type='url' name='target'>";
        assert!(selector_matches(&lower(html), "input[type=\"url\"]"));
    }

    #[test]
    fn test_fill_first_requires_navigation() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = HttpPage::new(dir.path());
        let err = page
            .fill_first(&["#url".to_string()], "value")
            .unwrap_err();
        assert!(matches!(err, PageError::Interaction(_)));
    }

    #[test]
    fn test_navigate_and_fill_against_mock_server() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/");
            then.status(200)
                .header("content-type", "text/html")
                .body(SAMPLE);
        });

        let dir = tempfile::tempdir().unwrap();
        let mut page = HttpPage::new(dir.path()).timeout(5);
        page.navigate(&server.url("/")).unwrap();

        let matched = page
            .fill_first(
                &["input[type=\"url\"]".to_string(), "#videoUrl".to_string()],
                "https://youtu.be/x",
            )
            .unwrap();
        assert_eq!(matched, "#videoUrl");
        assert_eq!(page.fills().len(), 1);

        let shot = page.screenshot("after fill").unwrap();
        assert!(shot.exists());
        let content = std::fs::read_to_string(&shot).unwrap();
        assert!(content.contains("videoUrl"));
    }

    #[test]
    fn test_navigate_surfaces_http_errors() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/gone");
            then.status(404).body("not here");
        });

        let dir = tempfile::tempdir().unwrap();
        let mut page = HttpPage::new(dir.path()).timeout(5);
        let err = page.navigate(&server.url("/gone")).unwrap_err();
        assert!(matches!(err, PageError::Navigation(msg) if msg.contains("404")));
    }
}

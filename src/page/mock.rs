//! Scripted mock page for tests and demos.
//!
//! Outcomes for navigate/fill calls are queued up front; each page action
//! pops the next scripted result (default: success). Screenshots are small
//! placeholder PNGs so the artifact pipeline and report embedding can be
//! exercised end to end without a browser.

use std::collections::VecDeque;
use std::path::PathBuf;

use image::{ImageBuffer, Rgb, RgbImage};

use crate::session;

use super::{Page, PageError, PageResult};

/// Placeholder screenshot dimensions
const SHOT_WIDTH: u32 = 320;
const SHOT_HEIGHT: u32 = 200;

/// Fill color for placeholder screenshots
const SHOT_COLOR: [u8; 3] = [44, 62, 80];

/// A page whose action outcomes are scripted in advance
#[derive(Debug)]
pub struct MockPage {
    output_dir: PathBuf,
    /// Scripted outcomes consumed by navigate/fill calls, front first
    outcomes: VecDeque<PageResult<()>>,
    /// Whether screenshot calls should fail
    fail_screenshots: bool,
    navigations: Vec<String>,
    fills: Vec<(String, String)>,
    screenshots_taken: usize,
}

impl MockPage {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            outcomes: VecDeque::new(),
            fail_screenshots: false,
            navigations: Vec::new(),
            fills: Vec::new(),
            screenshots_taken: 0,
        }
    }

    /// Script the next page action to succeed
    pub fn then_ok(mut self) -> Self {
        self.outcomes.push_back(Ok(()));
        self
    }

    /// Script the next page action to fail with `error`
    pub fn then_fail(mut self, error: PageError) -> Self {
        self.outcomes.push_back(Err(error));
        self
    }

    /// Make all screenshot calls fail (for exercising capture fallback)
    pub fn fail_screenshots(mut self) -> Self {
        self.fail_screenshots = true;
        self
    }

    /// URLs passed to `navigate` so far
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// Fills performed so far: (matched selector, value)
    pub fn fills(&self) -> &[(String, String)] {
        &self.fills
    }

    /// Number of successful screenshot captures
    pub fn screenshots_taken(&self) -> usize {
        self.screenshots_taken
    }

    fn next_outcome(&mut self) -> PageResult<()> {
        self.outcomes.pop_front().unwrap_or(Ok(()))
    }
}

impl Page for MockPage {
    fn navigate(&mut self, url: &str) -> PageResult<()> {
        self.navigations.push(url.to_string());
        self.next_outcome()
    }

    fn fill_first(&mut self, selectors: &[String], value: &str) -> PageResult<String> {
        self.next_outcome()?;
        let selector = selectors
            .first()
            .cloned()
            .ok_or_else(|| PageError::ElementNotFound("empty selector list".to_string()))?;
        self.fills.push((selector.clone(), value.to_string()));
        Ok(selector)
    }

    fn screenshot(&mut self, label: &str) -> PageResult<PathBuf> {
        if self.fail_screenshots {
            return Err(PageError::Interaction(
                "screenshot capture disabled".to_string(),
            ));
        }
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(session::artifact_filename(label, "png"));

        let img: RgbImage =
            ImageBuffer::from_pixel(SHOT_WIDTH, SHOT_HEIGHT, Rgb(SHOT_COLOR));
        img.save(&path)?;

        self.screenshots_taken += 1;
        Ok(path)
    }
}

//! Declarative test plans: an ordered sequence of named steps, each backed
//! by one action against the Page capability.

use serde::{Deserialize, Serialize};

use crate::page::{Page, PageResult};

/// An ordered, named sequence of test steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPlan {
    /// Human-readable name used in reports
    pub name: String,

    /// Steps executed in order; the first failing step aborts the rest
    pub steps: Vec<TestStep>,
}

/// One named unit of test action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStep {
    /// Step name (appears in history and artifact records)
    pub name: String,

    /// What to do against the page
    pub action: StepAction,
}

/// The actions a step can perform against the Page capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepAction {
    /// Navigate to a URL and await readiness
    Navigate { url: String },

    /// Fill the first input matched by an ordered list of candidate
    /// selectors; no match fails the step
    FillFirst {
        selectors: Vec<String>,
        value: String,
    },
}

impl StepAction {
    /// Execute this action against a page
    pub fn execute(&self, page: &mut dyn Page) -> PageResult<()> {
        match self {
            StepAction::Navigate { url } => page.navigate(url),
            StepAction::FillFirst { selectors, value } => {
                page.fill_first(selectors, value).map(|_| ())
            }
        }
    }
}

/// Candidate selectors for locating a URL input on an arbitrary page,
/// ordered from most to least specific. First match wins.
pub const URL_INPUT_SELECTORS: &[&str] = &[
    "input[type=\"url\"]",
    "input[type=\"text\"]",
    "input[placeholder*=\"url\" i]",
    "input[placeholder*=\"link\" i]",
    "#videoUrl",
    "#url",
    ".url-input",
];

/// Build the standard single-page plan: check the site is reachable, then
/// locate a URL input and fill it with `fill_value`.
pub fn default_plan(target_url: &str, fill_value: &str) -> TestPlan {
    TestPlan {
        name: format!("URL input test - {}", target_url),
        steps: vec![
            TestStep {
                name: "Check website availability".to_string(),
                action: StepAction::Navigate {
                    url: target_url.to_string(),
                },
            },
            TestStep {
                name: "Attempt to interact with URL input".to_string(),
                action: StepAction::FillFirst {
                    selectors: URL_INPUT_SELECTORS.iter().map(|s| s.to_string()).collect(),
                    value: fill_value.to_string(),
                },
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_shape() {
        let plan = default_plan("https://example.com", "https://youtu.be/x");
        assert_eq!(plan.steps.len(), 2);
        assert!(matches!(&plan.steps[0].action, StepAction::Navigate { url } if url == "https://example.com"));
        match &plan.steps[1].action {
            StepAction::FillFirst { selectors, value } => {
                assert_eq!(selectors.len(), URL_INPUT_SELECTORS.len());
                assert_eq!(value, "https://youtu.be/x");
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_plan_serializes() {
        let plan = default_plan("https://example.com", "v");
        let json = serde_json::to_string(&plan).unwrap();
        let back: TestPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back.steps.len(), plan.steps.len());
        assert_eq!(back.name, plan.name);
    }
}

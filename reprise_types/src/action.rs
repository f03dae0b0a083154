//! Resolved action records captured during live execution.

use serde::{Deserialize, Serialize};

/// A fully resolved page action: the selector the model landed on, the
/// method performed against it, and the arguments that were passed.
///
/// This is the unit of deterministic replay. Two recordings describe the
/// same interaction when [`Action::same_resolution`] holds; transient
/// capture data (screenshots) never participates in that comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Selector the action resolved to (CSS or XPath).
    #[serde(default)]
    pub selector: String,
    /// Human-readable description of the target element.
    #[serde(default)]
    pub description: String,
    /// Interaction method (click, fill, selectOption, ...).
    #[serde(default)]
    pub method: String,
    /// Arguments passed to the method.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<serde_json::Value>,
    /// Transient capture taken around the action. Stripped before the
    /// action is persisted into a cache entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Whether this action terminated the task.
    #[serde(default)]
    pub task_completed: bool,
}

impl Action {
    /// Create a new action for a selector and method.
    pub fn new(selector: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            method: method.into(),
            ..Default::default()
        }
    }

    /// Set the element description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the method arguments.
    pub fn with_arguments(mut self, arguments: Vec<serde_json::Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Attach a transient screenshot capture.
    pub fn with_screenshot(mut self, screenshot: impl Into<String>) -> Self {
        self.screenshot = Some(screenshot.into());
        self
    }

    /// Mark the action as the one that completed the task.
    pub fn completing(mut self) -> Self {
        self.task_completed = true;
        self
    }

    /// Copy of this action with transient capture data removed.
    pub fn pruned(&self) -> Self {
        let mut out = self.clone();
        out.screenshot = None;
        out
    }

    /// Whether two records describe the same resolved interaction.
    ///
    /// Compares selector, description, method, and arguments only.
    /// Screenshots and completion flags are execution artifacts, not part
    /// of the resolution.
    pub fn same_resolution(&self, other: &Action) -> bool {
        self.selector == other.selector
            && self.description == other.description
            && self.method == other.method
            && self.arguments == other.arguments
    }
}

/// Whether two action lists describe the same resolved plan.
///
/// Differing lengths count as a change, as does any positional pair that
/// fails [`Action::same_resolution`].
pub fn actions_equivalent(a: &[Action], b: &[Action]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(left, right)| left.same_resolution(right))
}

//! Execution options and the configuration inputs that feed cache keys.

use serde::{Deserialize, Serialize};

/// Options a caller passes to one cached execution.
///
/// Anything beyond the known fields is accepted into `extra` so hosts
/// can pass provider-specific knobs through without breaking; only the
/// sanitized subset ever influences cache identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOptions {
    /// Maximum number of planning steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    /// Whether to render a visible cursor during execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_cursor: Option<bool>,
    /// Overall execution timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Whether to capture a final screenshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<bool>,
    /// Unrecognized caller options, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ExecuteOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum step count.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Set cursor highlighting.
    pub fn with_highlight_cursor(mut self, highlight: bool) -> Self {
        self.highlight_cursor = Some(highlight);
        self
    }

    /// Set the execution timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Set final-screenshot capture.
    pub fn with_screenshot(mut self, screenshot: bool) -> Self {
        self.screenshot = Some(screenshot);
        self
    }

    /// The subset of options that affects whether a cached recording
    /// still applies. Everything else (timeouts, capture toggles,
    /// passthrough extras) changes how a run feels, not what it does.
    pub fn sanitized(&self) -> SanitizedOptions {
        SanitizedOptions {
            max_steps: self.max_steps,
            highlight_cursor: self.highlight_cursor,
        }
    }
}

/// The allow-listed option subset persisted into cache entries and
/// hashed into cache keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedOptions {
    /// Maximum number of planning steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    /// Whether a visible cursor was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_cursor: Option<bool>,
}

/// Agent-level configuration that shapes model behavior.
///
/// Serialized (with secrets stripped) into the configuration signature:
/// two executions share cache entries only when these match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOptions {
    /// Model identifier.
    pub model: String,
    /// Provider-specific model options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_options: Option<serde_json::Value>,
    /// System prompt override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Names of tools available to the model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    /// Identifiers of enabled integrations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integrations: Vec<String>,
}

impl AgentOptions {
    /// Create options for a model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set provider-specific model options.
    pub fn with_model_options(mut self, options: serde_json::Value) -> Self {
        self.model_options = Some(options);
        self
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the available tool names.
    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the enabled integrations.
    pub fn with_integrations(mut self, integrations: Vec<String>) -> Self {
        self.integrations = integrations;
        self
    }
}

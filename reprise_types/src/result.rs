//! Execution results and usage accounting.

use crate::Action;
use serde::{Deserialize, Serialize};

/// Token and latency accounting for one agent execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct AgentUsage {
    /// Prompt tokens used.
    pub prompt_tokens: u32,
    /// Completion tokens used.
    pub completion_tokens: u32,
    /// Total tokens used.
    pub total_tokens: u32,
    /// Total model inference time in milliseconds.
    #[serde(default)]
    pub inference_time_ms: u64,
}

impl AgentUsage {
    /// Create new usage stats.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            inference_time_ms: 0,
        }
    }

    /// Accumulate usage from another instance.
    pub fn accumulate(&mut self, other: &Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.inference_time_ms += other.inference_time_ms;
    }

    /// Check if any tokens were used.
    pub fn is_empty(&self) -> bool {
        self.total_tokens == 0 && self.inference_time_ms == 0
    }
}

impl std::ops::Add for AgentUsage {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
            inference_time_ms: self.inference_time_ms + other.inference_time_ms,
        }
    }
}

impl std::ops::AddAssign for AgentUsage {
    fn add_assign(&mut self, other: Self) {
        self.accumulate(&other);
    }
}

/// Provenance metadata attached to a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    /// Whether the result was served from the action cache.
    #[serde(default)]
    pub cache_hit: bool,
    /// When the replayed entry was originally recorded (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_timestamp: Option<String>,
}

impl ResultMetadata {
    /// Metadata for a replayed result.
    pub fn cached(timestamp: impl Into<String>) -> Self {
        Self {
            cache_hit: true,
            cache_timestamp: Some(timestamp.into()),
        }
    }
}

/// Final result of an agent execution, live or replayed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    /// Whether the execution succeeded.
    pub success: bool,
    /// Final message describing the outcome.
    #[serde(default)]
    pub message: String,
    /// All actions performed, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    /// Whether the model declared the task complete.
    #[serde(default)]
    pub completed: bool,
    /// Token and latency accounting.
    #[serde(default)]
    pub usage: AgentUsage,
    /// Final screenshot capture, if one was taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Result provenance.
    #[serde(default)]
    pub metadata: ResultMetadata,
}

impl AgentResult {
    /// Create a successful result.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Create a failed result.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Set the performed actions.
    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    /// Set the usage accounting.
    pub fn with_usage(mut self, usage: AgentUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Attach a final screenshot.
    pub fn with_screenshot(mut self, screenshot: impl Into<String>) -> Self {
        self.screenshot = Some(screenshot.into());
        self
    }

    /// Set whether the task was declared complete.
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Copy of this result with all transient capture data removed,
    /// at the result level and inside every action.
    pub fn pruned(&self) -> Self {
        let mut out = self.clone();
        out.screenshot = None;
        out.actions = out.actions.iter().map(Action::pruned).collect();
        out
    }

    /// Shape a stored result for a cache hit: capture data pruned,
    /// usage zeroed (replay consumes no model tokens), and provenance
    /// pointing back at the original recording.
    pub fn from_cache(stored: &AgentResult, timestamp: impl Into<String>) -> Self {
        let mut out = stored.pruned();
        out.usage = AgentUsage::default();
        out.metadata = ResultMetadata::cached(timestamp);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_accumulate() {
        let mut usage = AgentUsage::new(100, 40);
        usage.accumulate(&AgentUsage::new(10, 5));
        assert_eq!(usage.prompt_tokens, 110);
        assert_eq!(usage.completion_tokens, 45);
        assert_eq!(usage.total_tokens, 155);

        usage += AgentUsage::new(1, 1);
        assert_eq!(usage.total_tokens, 157);
        assert!(!usage.is_empty());
        assert!(AgentUsage::default().is_empty());
    }

    #[test]
    fn test_from_cache_zeroes_usage() {
        let stored = AgentResult::success("logged in")
            .with_actions(vec![Action::new("#login", "click").with_screenshot("png")])
            .with_usage(AgentUsage::new(500, 120))
            .with_screenshot("final")
            .with_completed(true);

        let hit = AgentResult::from_cache(&stored, "2026-08-01T12:00:00Z");
        assert!(hit.success);
        assert!(hit.completed);
        assert!(hit.usage.is_empty());
        assert!(hit.screenshot.is_none());
        assert!(hit.actions[0].screenshot.is_none());
        assert!(hit.metadata.cache_hit);
        assert_eq!(
            hit.metadata.cache_timestamp.as_deref(),
            Some("2026-08-01T12:00:00Z")
        );
    }

    #[test]
    fn test_pruned_is_idempotent() {
        let result = AgentResult::success("done")
            .with_actions(vec![Action::new("#a", "click").with_screenshot("x")])
            .with_screenshot("y");
        let once = result.pruned();
        assert_eq!(once.pruned(), once);
    }

    #[test]
    fn test_metadata_defaults_to_live() {
        let result = AgentResult::success("ok");
        assert!(!result.metadata.cache_hit);
        assert!(result.metadata.cache_timestamp.is_none());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["metadata"]["cacheHit"], false);
    }
}

//! Replayable step variants recorded during live execution.

use crate::Action;
use serde::{Deserialize, Serialize};

/// Navigation settle condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// Wait for the load event.
    #[default]
    Load,
    /// Wait for DOMContentLoaded.
    Domcontentloaded,
    /// Wait until the network goes idle.
    Networkidle,
}

/// A page coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal offset in CSS pixels.
    pub x: f64,
    /// Vertical offset in CSS pixels.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Keyboard input mode for a recorded key step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyInput {
    /// Type a text string.
    #[default]
    Type,
    /// Press one or more named keys.
    Press,
}

fn default_repeat() -> u32 {
    1
}

/// One recorded step of an agent execution.
///
/// The closed set of step shapes the engine knows how to replay. The
/// wire tag lives in a `type` field; unknown tags fail deserialization,
/// which callers treat as a cache miss. Steps carrying no payload
/// (`close`, `extract`, `screenshot`, `ariaTree`) replay as no-ops:
/// their live output cannot be reproduced from a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReplayStep {
    /// A natural-language instruction resolved into concrete actions.
    #[serde(rename_all = "camelCase")]
    Act {
        /// The instruction the model planned from.
        #[serde(default)]
        instruction: String,
        /// The resolved actions, in execution order.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        actions: Vec<Action>,
        /// Per-step timeout override.
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// A multi-field form fill.
    FillForm {
        /// Per-field resolved actions. Older recordings stored these
        /// under `observeResults`.
        #[serde(default, alias = "observeResults", skip_serializing_if = "Vec::is_empty")]
        actions: Vec<Action>,
    },
    /// Direct navigation.
    #[serde(rename_all = "camelCase")]
    Goto {
        /// Destination URL.
        url: String,
        /// Settle condition.
        #[serde(default)]
        wait_until: WaitUntil,
    },
    /// Viewport scroll.
    #[serde(rename_all = "camelCase")]
    Scroll {
        /// Anchor the scroll originated from. Recomputed from the live
        /// viewport center when absent.
        #[serde(skip_serializing_if = "Option::is_none")]
        anchor: Option<Point>,
        /// Horizontal scroll distance.
        #[serde(default)]
        delta_x: f64,
        /// Vertical scroll distance.
        #[serde(default)]
        delta_y: f64,
    },
    /// Passive delay.
    #[serde(rename_all = "camelCase")]
    Wait {
        /// Delay in milliseconds.
        time_ms: u64,
    },
    /// Browser history back navigation.
    #[serde(rename_all = "camelCase")]
    Navback {
        /// Settle condition.
        #[serde(default)]
        wait_until: WaitUntil,
    },
    /// Keyboard input.
    Keys {
        /// Input mode.
        #[serde(default)]
        method: KeyInput,
        /// Text to type (for `type`).
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Named keys to press (for `press`).
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        keys: Vec<String>,
        /// How many times the input repeats.
        #[serde(default = "default_repeat")]
        repeat: u32,
    },
    /// Session close marker.
    Close,
    /// Data extraction marker. Fresh data must be re-acquired live.
    Extract,
    /// Screenshot marker. Captures are never replayed from cache.
    Screenshot,
    /// Accessibility-tree read marker.
    AriaTree,
}

impl ReplayStep {
    /// Create an act step.
    pub fn act(instruction: impl Into<String>, actions: Vec<Action>) -> Self {
        Self::Act {
            instruction: instruction.into(),
            actions,
            timeout_ms: None,
        }
    }

    /// Create a form-fill step.
    pub fn fill_form(actions: Vec<Action>) -> Self {
        Self::FillForm { actions }
    }

    /// Create a navigation step.
    pub fn goto(url: impl Into<String>) -> Self {
        Self::Goto {
            url: url.into(),
            wait_until: WaitUntil::default(),
        }
    }

    /// Create a wait step.
    pub fn wait(time_ms: u64) -> Self {
        Self::Wait { time_ms }
    }

    /// The wire tag for this step.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Act { .. } => "act",
            Self::FillForm { .. } => "fillForm",
            Self::Goto { .. } => "goto",
            Self::Scroll { .. } => "scroll",
            Self::Wait { .. } => "wait",
            Self::Navback { .. } => "navback",
            Self::Keys { .. } => "keys",
            Self::Close => "close",
            Self::Extract => "extract",
            Self::Screenshot => "screenshot",
            Self::AriaTree => "ariaTree",
        }
    }

    /// Stored actions for steps that carry them.
    pub fn actions(&self) -> Option<&[Action]> {
        match self {
            Self::Act { actions, .. } | Self::FillForm { actions } => Some(actions),
            _ => None,
        }
    }

    /// Copy of this step with transient capture data stripped from any
    /// stored actions.
    pub fn pruned(&self) -> Self {
        match self {
            Self::Act {
                instruction,
                actions,
                timeout_ms,
            } => Self::Act {
                instruction: instruction.clone(),
                actions: actions.iter().map(Action::pruned).collect(),
                timeout_ms: *timeout_ms,
            },
            Self::FillForm { actions } => Self::FillForm {
                actions: actions.iter().map(Action::pruned).collect(),
            },
            other => other.clone(),
        }
    }
}

impl std::fmt::Display for ReplayStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}

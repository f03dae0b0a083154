//! Collaborator contracts for live page interaction.
//!
//! The engine owns no browser. Replay runs against whatever implements
//! [`PageHandle`], deterministic re-execution goes through an injected
//! [`ActionExecutor`], and the last-resort live fallback goes through an
//! [`ActHandler`]. All three are narrow on purpose: the host keeps its
//! own driver, planner, and tool surface.

use crate::error::CacheResult;
use crate::llm::ModelClient;
use async_trait::async_trait;
use reprise_types::{Action, Point, WaitUntil};

/// Viewport dimensions reported by a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
}

impl Viewport {
    /// Center point of the viewport.
    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Narrow handle onto the live page replay runs against.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Current page URL, best effort. Implementations return an empty
    /// string when the page cannot report one; this never errors.
    async fn current_url(&self) -> String;

    /// Navigate to a URL.
    async fn goto(&self, url: &str, wait_until: WaitUntil) -> CacheResult<()>;

    /// Scroll from an anchor point by the given deltas.
    async fn scroll(&self, anchor: Point, delta_x: f64, delta_y: f64) -> CacheResult<()>;

    /// Type a text string into the focused element.
    async fn type_text(&self, text: &str) -> CacheResult<()>;

    /// Press one or more named keys.
    async fn press_keys(&self, keys: &[String]) -> CacheResult<()>;

    /// Navigate back in history.
    async fn back(&self, wait_until: WaitUntil) -> CacheResult<()>;

    /// Viewport dimensions, when the page can report them.
    async fn viewport(&self) -> Option<Viewport>;
}

/// Result of one deterministic action execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Whether the action executed.
    pub success: bool,
    /// Refreshed action records. Empty on success means the recorded
    /// action worked exactly as stored.
    pub actions: Vec<Action>,
    /// Failure description.
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Successful execution, optionally with refreshed records.
    pub fn success(actions: Vec<Action>) -> Self {
        Self {
            success: true,
            actions,
            error: None,
        }
    }

    /// Failed execution.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            actions: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Deterministic executor for previously resolved actions.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute one recorded action exactly as resolved.
    ///
    /// Implementations report failure in the result instead of erroring
    /// so the caller can keep the original record and continue.
    async fn execute(&self, page: &dyn PageHandle, action: &Action) -> ExecutionResult;
}

/// Outcome of running an instruction live.
#[derive(Debug, Clone, Default)]
pub struct ActOutcome {
    /// Whether the instruction was fulfilled.
    pub success: bool,
    /// The actions the live run resolved and performed.
    pub actions: Vec<Action>,
}

impl ActOutcome {
    /// Successful outcome with the resolved actions.
    pub fn success(actions: Vec<Action>) -> Self {
        Self {
            success: true,
            actions,
        }
    }

    /// Failed outcome.
    pub fn failure() -> Self {
        Self::default()
    }
}

/// Live planning fallback: resolve a natural-language instruction
/// against the current page and perform it.
///
/// Invoked when a recorded step carries no actions, or when every
/// deterministic attempt within a step failed. This path may consume
/// model tokens through the supplied client.
#[async_trait]
pub trait ActHandler: Send + Sync {
    /// Resolve and perform an instruction on the live page.
    async fn act(
        &self,
        page: &dyn PageHandle,
        instruction: &str,
        timeout_ms: Option<u64>,
        model: Option<&dyn ModelClient>,
    ) -> CacheResult<ActOutcome>;
}

//! Versioned cache entries persisted to disk.

use crate::{AgentResult, ReplayStep, SanitizedOptions};
use serde::{Deserialize, Serialize};

/// Schema version written into every entry. Readers treat any other
/// value as a cache miss rather than attempting migration.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// One persisted recording of an agent execution.
///
/// The identity fields (instruction, start URL, sanitized options,
/// configuration signature) are stored alongside the hashed file name
/// so entries remain self-describing. Step order is load-bearing:
/// steps replay strictly in recorded order and are never reordered.
/// Entries are immutable once loaded; healing builds a new entry value
/// before anything is written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Schema version.
    pub version: u32,
    /// The trimmed instruction this recording fulfilled.
    pub instruction: String,
    /// URL the execution started from.
    pub start_url: String,
    /// Cache-relevant option subset at recording time.
    #[serde(default)]
    pub options: SanitizedOptions,
    /// Configuration signature at recording time.
    pub config_signature: String,
    /// Recorded steps, in execution order.
    #[serde(default)]
    pub steps: Vec<ReplayStep>,
    /// The pruned final result of the recorded execution.
    pub result: AgentResult,
    /// When the entry was recorded (RFC 3339).
    pub timestamp: String,
}

impl CacheEntry {
    /// Create an entry at the current schema version.
    pub fn new(
        instruction: impl Into<String>,
        start_url: impl Into<String>,
        options: SanitizedOptions,
        config_signature: impl Into<String>,
    ) -> Self {
        Self {
            version: CACHE_SCHEMA_VERSION,
            instruction: instruction.into(),
            start_url: start_url.into(),
            options,
            config_signature: config_signature.into(),
            steps: Vec::new(),
            result: AgentResult::default(),
            timestamp: String::new(),
        }
    }

    /// Set the recorded steps.
    pub fn with_steps(mut self, steps: Vec<ReplayStep>) -> Self {
        self.steps = steps;
        self
    }

    /// Set the recorded result.
    pub fn with_result(mut self, result: AgentResult) -> Self {
        self.result = result;
        self
    }

    /// Set the recording timestamp.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Whether this entry was written at the current schema version.
    pub fn is_current_version(&self) -> bool {
        self.version == CACHE_SCHEMA_VERSION
    }
}

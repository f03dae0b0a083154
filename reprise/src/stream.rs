//! Streaming call convention for cached executions.
//!
//! Both calling conventions resolve to the same [`AgentResult`]; the
//! streaming one additionally yields incremental events. A cache hit is
//! served as a synthetic stream so callers cannot tell a replayed
//! execution from a live one by its shape.

use crate::error::CacheResult;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use reprise_types::AgentResult;
use serde::{Deserialize, Serialize};

/// Why a stream stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Normal completion.
    Stop,
    /// The execution errored.
    Error,
    /// Output was cut by a content filter.
    ContentFilter,
}

/// One event in a streamed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental message text.
    Delta {
        /// The text fragment.
        text: String,
    },
    /// Terminal event.
    Finish {
        /// Why the stream ended.
        reason: FinishReason,
    },
}

/// A streamed execution: ordered events plus a completion future that
/// resolves to the final result once the stream has ended.
pub struct StreamResult {
    /// Ordered stream of events.
    pub events: BoxStream<'static, StreamEvent>,
    /// Resolves to the final result.
    pub completion: BoxFuture<'static, CacheResult<AgentResult>>,
}

impl StreamResult {
    /// Build from parts.
    pub fn new(
        events: BoxStream<'static, StreamEvent>,
        completion: BoxFuture<'static, CacheResult<AgentResult>>,
    ) -> Self {
        Self { events, completion }
    }

    /// Wrap an already-materialized result as a synthetic stream: the
    /// full message as a single delta, a stop event, and an
    /// already-resolved completion.
    pub fn from_result(result: AgentResult) -> Self {
        let events = futures::stream::iter(vec![
            StreamEvent::Delta {
                text: result.message.clone(),
            },
            StreamEvent::Finish {
                reason: FinishReason::Stop,
            },
        ])
        .boxed();
        let completion = futures::future::ready(Ok(result)).boxed();
        Self { events, completion }
    }
}

impl std::fmt::Debug for StreamResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResult").finish_non_exhaustive()
    }
}

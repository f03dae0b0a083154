//! # Reprise
//!
//! Action cache and deterministic replay for LLM-driven web automation.
//!
//! The first execution of an instruction records every action the model
//! resolved. Later executions with the same instruction, start URL,
//! options, and agent configuration replay those actions directly
//! against the live page, consulting the model again only when a
//! recorded target no longer resolves (self-healing). A hit costs zero
//! model tokens and reports itself as a hit in the result metadata.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reprise::{AgentCache, ExecuteOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = Arc::new(AgentCache::builder()
//!         .with_cache_dir("/tmp/agent-cache")
//!         .with_executor(executor)
//!         .with_act_handler(act_handler)
//!         .build());
//!
//!     let signature = reprise::build_config_signature(&agent_options);
//!     let options = ExecuteOptions::new().with_max_steps(15);
//!
//!     if let Some(context) = cache
//!         .prepare_context("log in with the test account", &options, &signature, Some(&page))
//!         .await
//!     {
//!         if let Some(result) = cache.try_replay(&context, None, Some(&page)).await {
//!             println!("served from cache: {}", result.message);
//!             return;
//!         }
//!         // ... run live, recording steps as they execute ...
//!         cache.store(&context, recorded_steps, &live_result).await;
//!     }
//! }
//! ```
//!
//! The engine owns no browser and no provider client: page control,
//! deterministic action execution, live planning fallback, and the
//! model client are all injected through narrow traits.

#![warn(missing_docs)]

mod cache;
mod compressor;
mod error;
mod helpers;
mod llm;
mod mapper;
mod page;
mod replay;
mod signature;
mod storage;
mod stream;

// Re-exports
pub use cache::{AgentCache, AgentCacheBuilder, ReplayContext};
pub use compressor::MessageCompressor;
pub use error::{CacheError, CacheResult};
pub use helpers::clone_for_cache;
pub use llm::{
    ChatMessage, CompletionOptions, CompletionResponse, ContentPart, ImageUrl, MessageContent,
    ModelClient, ToolOutput,
};
pub use mapper::ActionMapper;
pub use page::{ActHandler, ActOutcome, ActionExecutor, ExecutionResult, PageHandle, Viewport};
pub use signature::{build_config_signature, cache_key, entry_file_name, strip_secret_keys};
pub use storage::{CacheStorage, ReadOutcome, WriteOutcome};
pub use stream::{FinishReason, StreamEvent, StreamResult};

// Shared data types
pub use reprise_types::{
    actions_equivalent, Action, AgentOptions, AgentResult, AgentUsage, CacheEntry, ExecuteOptions,
    KeyInput, Point, ReplayStep, ResultMetadata, SanitizedOptions, WaitUntil,
    CACHE_SCHEMA_VERSION,
};

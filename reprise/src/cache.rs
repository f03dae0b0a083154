//! The action cache orchestrator.
//!
//! [`AgentCache`] owns cache identity, the disk store, the recording
//! session for live runs, and replay with healing for cache hits. It is
//! built for a single execution flow at a time: concurrent executions
//! on one instance must be serialized by the caller, though recording
//! calls themselves are internally locked.

use crate::helpers::{clone_for_cache, now_rfc3339};
use crate::llm::ModelClient;
use crate::page::{ActHandler, ActionExecutor, PageHandle};
use crate::replay::{replay_steps, steps_changed, ReplaySession};
use crate::signature::{cache_key, entry_file_name};
use crate::storage::CacheStorage;
use crate::stream::StreamResult;
use futures::FutureExt;
use parking_lot::Mutex;
use reprise_types::{AgentResult, CacheEntry, ExecuteOptions, ReplayStep, SanitizedOptions};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identity of one cacheable execution.
///
/// Produced by [`AgentCache::prepare_context`] and threaded through
/// every later cache operation so replay, wrapping, and storage all
/// agree on the same key.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayContext {
    /// The instruction being executed, whitespace-trimmed.
    pub instruction: String,
    /// URL the execution starts from (empty when unknown).
    pub start_url: String,
    /// Cache-relevant option subset.
    pub options: SanitizedOptions,
    /// Configuration signature.
    pub config_signature: String,
    /// Derived cache key (lowercase hex SHA-256).
    pub key: String,
}

/// Builder for [`AgentCache`].
#[derive(Default)]
pub struct AgentCacheBuilder {
    cache_dir: Option<PathBuf>,
    executor: Option<Arc<dyn ActionExecutor>>,
    act_handler: Option<Arc<dyn ActHandler>>,
    model: Option<Arc<dyn ModelClient>>,
}

impl AgentCacheBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache directory. Without one the cache is disabled and
    /// every operation silently no-ops.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set the deterministic action executor used during replay.
    pub fn with_executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set the live-planning fallback handler.
    pub fn with_act_handler(mut self, act_handler: Arc<dyn ActHandler>) -> Self {
        self.act_handler = Some(act_handler);
        self
    }

    /// Set the default model client handed to the fallback handler.
    pub fn with_model(mut self, model: Arc<dyn ModelClient>) -> Self {
        self.model = Some(model);
        self
    }

    /// Build the cache.
    pub fn build(self) -> AgentCache {
        AgentCache {
            storage: CacheStorage::new(self.cache_dir),
            executor: self.executor,
            act_handler: self.act_handler,
            model: self.model,
            recording: Mutex::new(None),
            replay_active: AtomicBool::new(false),
        }
    }
}

/// Action cache with deterministic, self-healing replay.
pub struct AgentCache {
    storage: CacheStorage,
    executor: Option<Arc<dyn ActionExecutor>>,
    act_handler: Option<Arc<dyn ActHandler>>,
    model: Option<Arc<dyn ModelClient>>,
    recording: Mutex<Option<Vec<ReplayStep>>>,
    replay_active: AtomicBool,
}

impl AgentCache {
    /// Start building a cache.
    pub fn builder() -> AgentCacheBuilder {
        AgentCacheBuilder::new()
    }

    /// Whether a backing cache directory is configured and usable.
    pub fn is_enabled(&self) -> bool {
        self.storage.is_enabled()
    }

    /// Whether a recording session is open.
    pub fn is_recording(&self) -> bool {
        self.recording.lock().is_some()
    }

    /// Whether a replay is currently executing.
    pub fn is_replay_active(&self) -> bool {
        self.replay_active.load(Ordering::SeqCst)
    }

    /// Resolve the cache identity for an execution.
    ///
    /// The instruction is trimmed before keying so whitespace variants
    /// of the same task share one entry. Returns `None` only when
    /// nothing remains after trimming; a cache without a usable
    /// directory still resolves identity, and the degradation happens
    /// in [`try_replay`](Self::try_replay) and [`store`](Self::store).
    /// The start URL is resolved from the page best effort and an
    /// absent page reads as an empty URL rather than an error.
    pub async fn prepare_context(
        &self,
        instruction: &str,
        options: &ExecuteOptions,
        config_signature: &str,
        page: Option<&dyn PageHandle>,
    ) -> Option<ReplayContext> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            log::debug!("caching skipped: empty instruction");
            return None;
        }
        let start_url = match page {
            Some(page) => page.current_url().await,
            None => String::new(),
        };
        let sanitized = options.sanitized();
        let key = cache_key(instruction, &start_url, &sanitized, config_signature);
        Some(ReplayContext {
            instruction: instruction.to_string(),
            start_url,
            options: sanitized,
            config_signature: config_signature.to_string(),
            key,
        })
    }

    async fn load_entry(&self, context: &ReplayContext) -> Option<CacheEntry> {
        let outcome = self
            .storage
            .read_json::<CacheEntry>(&entry_file_name(&context.key))
            .await;
        if let Some(error) = &outcome.error {
            log::warn!(
                "cache read failed at {}: {error}",
                outcome
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
            return None;
        }
        let entry = outcome.value?;
        if !entry.is_current_version() {
            log::debug!(
                "cache entry version {} does not match current {}, treating as miss",
                entry.version,
                reprise_types::CACHE_SCHEMA_VERSION
            );
            return None;
        }
        Some(entry)
    }

    /// Attempt to serve an execution from the cache.
    ///
    /// A hit replays every recorded step against the live page, healing
    /// stale actions along the way, rewrites the entry if the plan
    /// changed, and returns the stored result in zero-cost shape. Any
    /// miss, version mismatch, read failure, or replay failure returns
    /// `None` and the caller proceeds with a live run.
    pub async fn try_replay(
        &self,
        context: &ReplayContext,
        model: Option<&dyn ModelClient>,
        page: Option<&dyn PageHandle>,
    ) -> Option<AgentResult> {
        let entry = self.load_entry(context).await?;
        let Some(page) = page else {
            log::debug!("replay skipped: no page handle");
            return None;
        };

        self.replay_active.store(true, Ordering::SeqCst);
        let _guard = ReplayFlagGuard(&self.replay_active);

        let session = ReplaySession {
            page,
            executor: self.executor.as_deref(),
            act_handler: self.act_handler.as_deref(),
            model: model.or(self.model.as_deref()),
        };
        let replayed = match replay_steps(&session, &entry.steps).await {
            Ok(replayed) => replayed,
            Err(error) => {
                log::warn!("replay abandoned, falling back to live execution: {error}");
                return None;
            }
        };

        if steps_changed(&entry.steps, &replayed) {
            self.rewrite_entry(context, &entry, replayed).await;
        } else {
            log::debug!("replay completed without healing, entry left untouched");
        }

        Some(AgentResult::from_cache(&entry.result, &entry.timestamp))
    }

    /// Streaming twin of [`AgentCache::try_replay`]: a hit comes back
    /// as a synthetic single-delta stream.
    pub async fn try_replay_as_stream(
        &self,
        context: &ReplayContext,
        model: Option<&dyn ModelClient>,
        page: Option<&dyn PageHandle>,
    ) -> Option<StreamResult> {
        let result = self.try_replay(context, model, page).await?;
        Some(StreamResult::from_result(result))
    }

    async fn rewrite_entry(
        &self,
        context: &ReplayContext,
        original: &CacheEntry,
        replayed: Vec<ReplayStep>,
    ) {
        let healed = CacheEntry::new(
            &context.instruction,
            &context.start_url,
            context.options,
            &context.config_signature,
        )
        .with_steps(replayed.iter().map(ReplayStep::pruned).collect())
        .with_result(original.result.clone())
        .with_timestamp(now_rfc3339());

        let outcome = self
            .storage
            .write_json(&entry_file_name(&context.key), &healed)
            .await;
        match outcome.error {
            Some(error) => log::warn!("healed entry rewrite failed: {error}"),
            None => log::debug!("healed entry rewritten for key {}", context.key),
        }
    }

    /// Persist a completed live execution.
    ///
    /// Steps and the result are pruned of capture data before the
    /// write. The write is awaited but failures are logged and
    /// swallowed; callers never see a storage error.
    pub async fn store(
        &self,
        context: &ReplayContext,
        steps: Vec<ReplayStep>,
        result: &AgentResult,
    ) {
        if !self.storage.is_enabled() {
            return;
        }
        let entry = CacheEntry::new(
            &context.instruction,
            &context.start_url,
            context.options,
            &context.config_signature,
        )
        .with_steps(steps.iter().map(ReplayStep::pruned).collect())
        .with_result(result.pruned())
        .with_timestamp(now_rfc3339());

        let outcome = self
            .storage
            .write_json(&entry_file_name(&context.key), &entry)
            .await;
        match outcome.error {
            Some(error) => log::warn!("cache write failed: {error}"),
            None => log::debug!(
                "cached {} steps for key {}",
                entry.steps.len(),
                context.key
            ),
        }
    }

    /// Open a fresh recording session, replacing any previous buffer.
    pub fn begin_recording(&self) {
        *self.recording.lock() = Some(Vec::new());
    }

    /// Append one step to the open recording session.
    ///
    /// The step is deep-copied on entry; a step that cannot be copied
    /// is dropped with a warning and recording continues. Without an
    /// open session this is a no-op.
    pub fn record_step(&self, step: &ReplayStep) {
        let mut recording = self.recording.lock();
        let Some(buffer) = recording.as_mut() else {
            return;
        };
        match clone_for_cache(step) {
            Ok(copy) => buffer.push(copy),
            Err(error) => log::warn!("dropping unrecordable step ({}): {error}", step.kind()),
        }
    }

    /// Close the recording session and take its steps.
    pub fn end_recording(&self) -> Vec<ReplayStep> {
        self.recording.lock().take().unwrap_or_default()
    }

    /// Drop the recording session and its buffered steps.
    pub fn discard_recording(&self) {
        *self.recording.lock() = None;
    }

    /// Wrap a live streaming execution so its outcome lands in the
    /// cache.
    ///
    /// Opens a recording session immediately; the host records steps as
    /// it executes them. When the wrapped completion resolves
    /// successfully with at least one recorded step the entry is
    /// persisted; an unsuccessful result, an empty recording, or a
    /// completion error discards the session. Events pass through
    /// untouched.
    pub fn wrap_stream_for_caching(
        self: &Arc<Self>,
        context: &ReplayContext,
        stream: StreamResult,
    ) -> StreamResult {
        self.begin_recording();
        let cache = Arc::clone(self);
        let context = context.clone();
        let inner = stream.completion;
        let completion = async move {
            match inner.await {
                Ok(result) => {
                    let steps = cache.end_recording();
                    if result.success && !steps.is_empty() {
                        cache.store(&context, steps, &result).await;
                    } else {
                        log::debug!(
                            "discarding recording ({} steps, success={})",
                            steps.len(),
                            result.success
                        );
                    }
                    Ok(result)
                }
                Err(error) => {
                    cache.discard_recording();
                    Err(error)
                }
            }
        }
        .boxed();
        StreamResult::new(stream.events, completion)
    }
}

struct ReplayFlagGuard<'a>(&'a AtomicBool);

impl Drop for ReplayFlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reprise_types::Action;

    #[test]
    fn test_disabled_cache_defaults() {
        let cache = AgentCache::builder().build();
        assert!(!cache.is_enabled());
        assert!(!cache.is_recording());
        assert!(!cache.is_replay_active());
    }

    #[tokio::test]
    async fn test_prepare_context_requires_an_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AgentCache::builder().with_cache_dir(dir.path()).build();
        let options = ExecuteOptions::new();

        assert!(cache
            .prepare_context("   ", &options, "sig", None)
            .await
            .is_none());

        let context = cache
            .prepare_context("click the button", &options, "sig", None)
            .await
            .unwrap();
        assert_eq!(context.instruction, "click the button");
        assert_eq!(context.start_url, "");
        assert_eq!(context.key.len(), 64);
    }

    #[tokio::test]
    async fn test_prepare_context_works_without_a_cache_directory() {
        let dir = tempfile::tempdir().unwrap();
        let enabled = AgentCache::builder().with_cache_dir(dir.path()).build();
        let disabled = AgentCache::builder().build();
        let options = ExecuteOptions::new();

        // Identity resolution never touches storage; the key matches
        // the one an enabled cache would compute.
        let offline = disabled
            .prepare_context("click the button", &options, "sig", None)
            .await
            .unwrap();
        let online = enabled
            .prepare_context("click the button", &options, "sig", None)
            .await
            .unwrap();
        assert_eq!(offline.key, online.key);
    }

    #[tokio::test]
    async fn test_prepare_context_trims_the_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AgentCache::builder().with_cache_dir(dir.path()).build();
        let options = ExecuteOptions::new();

        let padded = cache
            .prepare_context("  log in \n", &options, "sig", None)
            .await
            .unwrap();
        let clean = cache
            .prepare_context("log in", &options, "sig", None)
            .await
            .unwrap();
        assert_eq!(padded.instruction, "log in");
        assert_eq!(padded.key, clean.key);
    }

    #[tokio::test]
    async fn test_prepare_context_key_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AgentCache::builder().with_cache_dir(dir.path()).build();
        let options = ExecuteOptions::new().with_max_steps(5);

        let a = cache
            .prepare_context("log in", &options, "sig", None)
            .await
            .unwrap();
        let b = cache
            .prepare_context("log in", &options, "sig", None)
            .await
            .unwrap();
        assert_eq!(a.key, b.key);

        let other = cache
            .prepare_context("log in", &ExecuteOptions::new(), "sig", None)
            .await
            .unwrap();
        assert_ne!(a.key, other.key);
    }

    #[test]
    fn test_recording_session_lifecycle() {
        let cache = AgentCache::builder().build();
        let step = ReplayStep::act("click", vec![Action::new("#a", "click")]);

        // No session open: recording is a no-op.
        cache.record_step(&step);
        assert!(cache.end_recording().is_empty());

        cache.begin_recording();
        assert!(cache.is_recording());
        cache.record_step(&step);
        cache.record_step(&ReplayStep::Screenshot);

        let steps = cache.end_recording();
        assert_eq!(steps.len(), 2);
        assert!(!cache.is_recording());
        assert!(cache.end_recording().is_empty());
    }

    #[test]
    fn test_unrecordable_step_is_dropped_not_fatal() {
        let cache = AgentCache::builder().build();
        cache.begin_recording();

        cache.record_step(&ReplayStep::wait(1));
        // NaN has no JSON representation, so the deep copy fails.
        cache.record_step(&ReplayStep::Scroll {
            anchor: None,
            delta_x: 0.0,
            delta_y: f64::NAN,
        });
        cache.record_step(&ReplayStep::wait(2));

        let steps = cache.end_recording();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], ReplayStep::wait(1));
        assert_eq!(steps[1], ReplayStep::wait(2));
    }

    #[test]
    fn test_discard_recording_drops_buffer() {
        let cache = AgentCache::builder().build();
        cache.begin_recording();
        cache.record_step(&ReplayStep::wait(10));
        cache.discard_recording();
        assert!(!cache.is_recording());
        assert!(cache.end_recording().is_empty());
    }

    #[test]
    fn test_recorded_steps_are_deep_copies() {
        let cache = AgentCache::builder().build();
        cache.begin_recording();

        let mut step = ReplayStep::act("click", vec![Action::new("#orig", "click")]);
        cache.record_step(&step);
        if let ReplayStep::Act { actions, .. } = &mut step {
            actions[0].selector = "#mutated".into();
        }

        let recorded = cache.end_recording();
        assert_eq!(recorded[0].actions().unwrap()[0].selector, "#orig");
    }

    #[tokio::test]
    async fn test_store_noops_when_disabled() {
        let cache = AgentCache::builder().build();
        let context = cache
            .prepare_context("click", &ExecuteOptions::new(), "sig", None)
            .await
            .unwrap();
        cache
            .store(&context, vec![ReplayStep::wait(1)], &AgentResult::success("ok"))
            .await;
        assert!(cache.try_replay(&context, None, None).await.is_none());
    }
}

//! Deterministic replay of recorded steps with self-healing.
//!
//! Steps replay strictly in recorded order. Stored actions re-execute
//! through the injected executor; a failed action keeps its recorded
//! form, and only when an entire act step fails deterministically (or
//! never carried actions) does the engine fall back to running the
//! step's instruction live. Any step-level error abandons the whole
//! replay so the caller can treat the entry as a miss.

use crate::error::{CacheError, CacheResult};
use crate::llm::ModelClient;
use crate::page::{ActHandler, ActionExecutor, PageHandle};
use reprise_types::{actions_equivalent, Action, KeyInput, ReplayStep};
use std::time::Duration;

/// Collaborators one replay runs against.
pub(crate) struct ReplaySession<'a> {
    /// Live page being driven.
    pub page: &'a dyn PageHandle,
    /// Deterministic per-action executor.
    pub executor: Option<&'a dyn ActionExecutor>,
    /// Live instruction fallback.
    pub act_handler: Option<&'a dyn ActHandler>,
    /// Model client handed to the fallback.
    pub model: Option<&'a dyn ModelClient>,
}

/// Replay every step in recorded order, returning the possibly healed
/// step list.
pub(crate) async fn replay_steps(
    session: &ReplaySession<'_>,
    steps: &[ReplayStep],
) -> CacheResult<Vec<ReplayStep>> {
    let mut replayed = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        log::debug!("replaying step {index} ({})", step.kind());
        let healed = replay_step(session, step)
            .await
            .map_err(|e| CacheError::Replay(format!("step {index} ({}): {e}", step.kind())))?;
        replayed.push(healed);
    }
    Ok(replayed)
}

async fn replay_step(session: &ReplaySession<'_>, step: &ReplayStep) -> CacheResult<ReplayStep> {
    match step {
        ReplayStep::Act {
            instruction,
            actions,
            timeout_ms,
        } => replay_act(session, instruction, actions, *timeout_ms).await,
        ReplayStep::FillForm { actions } => replay_fill_form(session, actions).await,
        ReplayStep::Goto { url, wait_until } => {
            session.page.goto(url, *wait_until).await?;
            Ok(step.clone())
        }
        ReplayStep::Scroll {
            anchor,
            delta_x,
            delta_y,
        } => {
            let origin = match anchor {
                Some(point) => *point,
                None => session
                    .page
                    .viewport()
                    .await
                    .map(|v| v.center())
                    .unwrap_or_default(),
            };
            session.page.scroll(origin, *delta_x, *delta_y).await?;
            Ok(step.clone())
        }
        ReplayStep::Wait { time_ms } => {
            tokio::time::sleep(Duration::from_millis(*time_ms)).await;
            Ok(step.clone())
        }
        ReplayStep::Navback { wait_until } => {
            session.page.back(*wait_until).await?;
            Ok(step.clone())
        }
        ReplayStep::Keys {
            method,
            text,
            keys,
            repeat,
        } => {
            for _ in 0..*repeat {
                match method {
                    KeyInput::Type => {
                        session
                            .page
                            .type_text(text.as_deref().unwrap_or_default())
                            .await?
                    }
                    KeyInput::Press => session.page.press_keys(keys).await?,
                }
            }
            Ok(step.clone())
        }
        // Opaque markers: their live output cannot be reproduced from a
        // recording, so replay passes through and the host re-acquires
        // fresh data.
        ReplayStep::Close | ReplayStep::Extract | ReplayStep::Screenshot | ReplayStep::AriaTree => {
            Ok(step.clone())
        }
    }
}

async fn replay_act(
    session: &ReplaySession<'_>,
    instruction: &str,
    actions: &[Action],
    timeout_ms: Option<u64>,
) -> CacheResult<ReplayStep> {
    if actions.is_empty() {
        if instruction.trim().is_empty() {
            return Ok(ReplayStep::Act {
                instruction: instruction.to_string(),
                actions: Vec::new(),
                timeout_ms,
            });
        }
        let live = run_instruction(session, instruction, timeout_ms).await?;
        return Ok(ReplayStep::Act {
            instruction: instruction.to_string(),
            actions: live,
            timeout_ms,
        });
    }

    let executor = session
        .executor
        .ok_or(CacheError::NotConfigured("action executor"))?;
    let (healed, successes) = heal_actions(executor, session.page, actions).await;

    if successes == 0 && !instruction.trim().is_empty() {
        log::debug!("all deterministic attempts failed, re-running instruction live");
        let live = run_instruction(session, instruction, timeout_ms).await?;
        return Ok(ReplayStep::Act {
            instruction: instruction.to_string(),
            actions: live,
            timeout_ms,
        });
    }

    Ok(ReplayStep::Act {
        instruction: instruction.to_string(),
        actions: healed,
        timeout_ms,
    })
}

async fn replay_fill_form(
    session: &ReplaySession<'_>,
    actions: &[Action],
) -> CacheResult<ReplayStep> {
    let executor = session
        .executor
        .ok_or(CacheError::NotConfigured("action executor"))?;
    let (healed, _) = heal_actions(executor, session.page, actions).await;
    Ok(ReplayStep::fill_form(healed))
}

/// Re-execute each action deterministically. Success swaps in the
/// executor's refreshed records (or confirms the original); failure
/// keeps the recorded action untouched.
async fn heal_actions(
    executor: &dyn ActionExecutor,
    page: &dyn PageHandle,
    actions: &[Action],
) -> (Vec<Action>, usize) {
    let mut healed = Vec::with_capacity(actions.len());
    let mut successes = 0;
    for action in actions {
        let result = executor.execute(page, action).await;
        if result.success {
            successes += 1;
            if result.actions.is_empty() {
                healed.push(action.clone());
            } else {
                healed.extend(result.actions);
            }
        } else {
            log::debug!(
                "action replay failed for {} ({}): {}",
                action.selector,
                action.method,
                result.error.as_deref().unwrap_or("unknown error")
            );
            healed.push(action.clone());
        }
    }
    (healed, successes)
}

async fn run_instruction(
    session: &ReplaySession<'_>,
    instruction: &str,
    timeout_ms: Option<u64>,
) -> CacheResult<Vec<Action>> {
    let handler = session
        .act_handler
        .ok_or(CacheError::NotConfigured("act handler"))?;
    let outcome = handler
        .act(session.page, instruction, timeout_ms, session.model)
        .await?;
    if !outcome.success {
        return Err(CacheError::msg(format!(
            "live fallback failed for instruction: {instruction}"
        )));
    }
    Ok(outcome.actions)
}

/// Whether replay changed the recorded plan.
///
/// Only the action lists of act and form-fill steps participate; the
/// comparison uses the replay-relevant action fields and treats a
/// length change as a change.
pub(crate) fn steps_changed(original: &[ReplayStep], replayed: &[ReplayStep]) -> bool {
    if original.len() != replayed.len() {
        return true;
    }
    original
        .iter()
        .zip(replayed.iter())
        .any(|(a, b)| match (a.actions(), b.actions()) {
            (Some(left), Some(right)) => !actions_equivalent(left, right),
            (None, None) => false,
            _ => true,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{ActOutcome, ExecutionResult, Viewport};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use reprise_types::{Point, WaitUntil};
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingPage {
        calls: Mutex<Vec<String>>,
        fail_goto: bool,
    }

    impl RecordingPage {
        fn log(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl PageHandle for RecordingPage {
        async fn current_url(&self) -> String {
            "https://example.com".into()
        }

        async fn goto(&self, url: &str, wait_until: WaitUntil) -> CacheResult<()> {
            if self.fail_goto {
                return Err(CacheError::Page("navigation refused".into()));
            }
            self.calls.lock().push(format!("goto {url} {wait_until:?}"));
            Ok(())
        }

        async fn scroll(&self, anchor: Point, delta_x: f64, delta_y: f64) -> CacheResult<()> {
            self.calls.lock().push(format!(
                "scroll ({},{}) by ({delta_x},{delta_y})",
                anchor.x, anchor.y
            ));
            Ok(())
        }

        async fn type_text(&self, text: &str) -> CacheResult<()> {
            self.calls.lock().push(format!("type {text}"));
            Ok(())
        }

        async fn press_keys(&self, keys: &[String]) -> CacheResult<()> {
            self.calls.lock().push(format!("press {}", keys.join("+")));
            Ok(())
        }

        async fn back(&self, _wait_until: WaitUntil) -> CacheResult<()> {
            self.calls.lock().push("back".into());
            Ok(())
        }

        async fn viewport(&self) -> Option<Viewport> {
            Some(Viewport {
                width: 1000.0,
                height: 600.0,
            })
        }
    }

    /// Executor scripted per selector; unknown selectors fail.
    #[derive(Default)]
    struct ScriptedExecutor {
        outcomes: HashMap<String, ExecutionResult>,
    }

    impl ScriptedExecutor {
        fn with(mut self, selector: &str, outcome: ExecutionResult) -> Self {
            self.outcomes.insert(selector.to_string(), outcome);
            self
        }
    }

    #[async_trait]
    impl ActionExecutor for ScriptedExecutor {
        async fn execute(&self, _page: &dyn PageHandle, action: &Action) -> ExecutionResult {
            self.outcomes
                .get(&action.selector)
                .cloned()
                .unwrap_or_else(|| {
                    ExecutionResult::failure(format!("no element for {}", action.selector))
                })
        }
    }

    struct ScriptedActHandler {
        outcome: ActOutcome,
        calls: Mutex<usize>,
    }

    impl ScriptedActHandler {
        fn new(outcome: ActOutcome) -> Self {
            Self {
                outcome,
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl ActHandler for ScriptedActHandler {
        async fn act(
            &self,
            _page: &dyn PageHandle,
            _instruction: &str,
            _timeout_ms: Option<u64>,
            _model: Option<&dyn ModelClient>,
        ) -> CacheResult<ActOutcome> {
            *self.calls.lock() += 1;
            Ok(self.outcome.clone())
        }
    }

    fn session<'a>(
        page: &'a RecordingPage,
        executor: Option<&'a dyn ActionExecutor>,
        act_handler: Option<&'a dyn ActHandler>,
    ) -> ReplaySession<'a> {
        ReplaySession {
            page,
            executor,
            act_handler,
            model: None,
        }
    }

    #[tokio::test]
    async fn test_direct_steps_drive_the_page() {
        let page = RecordingPage::default();
        let steps = vec![
            ReplayStep::goto("https://example.com/start"),
            ReplayStep::Scroll {
                anchor: None,
                delta_x: 0.0,
                delta_y: 400.0,
            },
            ReplayStep::wait(5),
            ReplayStep::Navback {
                wait_until: WaitUntil::Load,
            },
            ReplayStep::Keys {
                method: KeyInput::Type,
                text: Some("hi".into()),
                keys: Vec::new(),
                repeat: 2,
            },
            ReplayStep::Keys {
                method: KeyInput::Press,
                text: None,
                keys: vec!["Enter".into()],
                repeat: 1,
            },
        ];

        let replayed = replay_steps(&session(&page, None, None), &steps)
            .await
            .unwrap();
        assert_eq!(replayed, steps);
        assert_eq!(
            page.log(),
            vec![
                "goto https://example.com/start Load",
                "scroll (500,300) by (0,400)",
                "back",
                "type hi",
                "type hi",
                "press Enter",
            ]
        );
    }

    #[tokio::test]
    async fn test_opaque_steps_are_noops() {
        let page = RecordingPage::default();
        let steps = vec![
            ReplayStep::Close,
            ReplayStep::Extract,
            ReplayStep::Screenshot,
            ReplayStep::AriaTree,
        ];
        let replayed = replay_steps(&session(&page, None, None), &steps)
            .await
            .unwrap();
        assert_eq!(replayed, steps);
        assert!(page.log().is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_original_record() {
        let page = RecordingPage::default();
        let executor = ScriptedExecutor::default().with(
            "#ok",
            ExecutionResult::success(vec![Action::new("#ok-refreshed", "click")]),
        );
        let handler = ScriptedActHandler::new(ActOutcome::success(vec![]));

        let steps = vec![ReplayStep::act(
            "press both buttons",
            vec![Action::new("#ok", "click"), Action::new("#gone", "click")],
        )];
        let replayed = replay_steps(&session(&page, Some(&executor), Some(&handler)), &steps)
            .await
            .unwrap();

        let healed = replayed[0].actions().unwrap();
        assert_eq!(healed.len(), 2);
        assert_eq!(healed[0].selector, "#ok-refreshed");
        assert_eq!(healed[1].selector, "#gone");
        assert_eq!(handler.call_count(), 0, "no model fallback on partial failure");
    }

    #[tokio::test]
    async fn test_confirmed_action_is_kept_verbatim() {
        let page = RecordingPage::default();
        let executor = ScriptedExecutor::default()
            .with("#same", ExecutionResult::success(Vec::new()));

        let steps = vec![ReplayStep::act(
            "click it",
            vec![Action::new("#same", "click").with_description("the button")],
        )];
        let replayed = replay_steps(&session(&page, Some(&executor), None), &steps)
            .await
            .unwrap();
        assert!(!steps_changed(&steps, &replayed));
    }

    #[tokio::test]
    async fn test_total_failure_falls_back_to_instruction() {
        let page = RecordingPage::default();
        let executor = ScriptedExecutor::default();
        let handler =
            ScriptedActHandler::new(ActOutcome::success(vec![Action::new("#fresh", "click")]));

        let steps = vec![ReplayStep::act(
            "submit the form",
            vec![Action::new("#submit", "click")],
        )];
        let replayed = replay_steps(&session(&page, Some(&executor), Some(&handler)), &steps)
            .await
            .unwrap();

        assert_eq!(handler.call_count(), 1);
        assert_eq!(replayed[0].actions().unwrap()[0].selector, "#fresh");
        assert!(steps_changed(&steps, &replayed));
    }

    #[tokio::test]
    async fn test_act_without_actions_runs_live() {
        let page = RecordingPage::default();
        let handler =
            ScriptedActHandler::new(ActOutcome::success(vec![Action::new("#planned", "click")]));

        let steps = vec![ReplayStep::act("accept the cookie banner", Vec::new())];
        let replayed = replay_steps(&session(&page, None, Some(&handler)), &steps)
            .await
            .unwrap();
        assert_eq!(handler.call_count(), 1);
        assert_eq!(replayed[0].actions().unwrap()[0].selector, "#planned");
    }

    #[tokio::test]
    async fn test_failed_fallback_aborts_replay() {
        let page = RecordingPage::default();
        let executor = ScriptedExecutor::default();
        let handler = ScriptedActHandler::new(ActOutcome::failure());

        let steps = vec![ReplayStep::act(
            "submit the form",
            vec![Action::new("#submit", "click")],
        )];
        let error = replay_steps(&session(&page, Some(&executor), Some(&handler)), &steps)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("step 0 (act)"), "got: {error}");
    }

    #[tokio::test]
    async fn test_fill_form_never_falls_back() {
        let page = RecordingPage::default();
        let executor = ScriptedExecutor::default().with(
            "#email",
            ExecutionResult::success(vec![Action::new("#email-field", "fill")]),
        );
        let handler = ScriptedActHandler::new(ActOutcome::success(vec![]));

        let steps = vec![ReplayStep::fill_form(vec![
            Action::new("#email", "fill"),
            Action::new("#missing", "fill"),
        ])];
        let replayed = replay_steps(&session(&page, Some(&executor), Some(&handler)), &steps)
            .await
            .unwrap();

        let healed = replayed[0].actions().unwrap();
        assert_eq!(healed[0].selector, "#email-field");
        assert_eq!(healed[1].selector, "#missing");
        assert_eq!(handler.call_count(), 0);
    }

    #[tokio::test]
    async fn test_page_error_aborts_with_step_context() {
        let page = RecordingPage {
            fail_goto: true,
            ..Default::default()
        };
        let steps = vec![ReplayStep::goto("https://example.com")];
        let error = replay_steps(&session(&page, None, None), &steps)
            .await
            .unwrap_err();
        let message = error.to_string();
        assert!(message.contains("step 0 (goto)"), "got: {message}");
        assert!(message.contains("navigation refused"), "got: {message}");
    }

    #[tokio::test]
    async fn test_missing_executor_aborts_action_steps() {
        let page = RecordingPage::default();
        let steps = vec![ReplayStep::act(
            "click",
            vec![Action::new("#a", "click")],
        )];
        let error = replay_steps(&session(&page, None, None), &steps)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("not configured"));
    }

    #[test]
    fn test_steps_changed_comparisons() {
        let original = vec![
            ReplayStep::goto("https://example.com"),
            ReplayStep::act("click", vec![Action::new("#a", "click")]),
        ];
        assert!(!steps_changed(&original, &original.clone()));

        let mut healed = original.clone();
        healed[1] = ReplayStep::act("click", vec![Action::new("#b", "click")]);
        assert!(steps_changed(&original, &healed));

        let mut grown = original.clone();
        if let ReplayStep::Act { actions, .. } = &mut grown[1] {
            actions.push(Action::new("#extra", "click"));
        }
        assert!(steps_changed(&original, &grown));

        let shorter = vec![original[0].clone()];
        assert!(steps_changed(&original, &shorter));
    }
}

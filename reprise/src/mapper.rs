//! Mapping tool executions into replayable action records.
//!
//! Tool outputs arrive as loose JSON from whatever tool surface the
//! host exposes. The mapper folds them into [`Action`] records strict
//! enough to replay later: per-field expansion for form fills, a
//! constant marker instead of screenshot bytes, nothing at all for
//! accessibility-tree reads, and an argument merge for everything else.

use reprise_types::Action;
use serde_json::{Map, Value};

/// Keys holding bulky payloads that never belong in a replay log.
const BULKY_KEYS: [&str; 5] = ["screenshot", "image", "tree", "ariaTree", "base64"];

const SCREENSHOT_MARKER: &str = "screenshot taken";

/// Stateless translator from tool executions to action records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionMapper;

impl ActionMapper {
    /// Map one tool execution into replayable actions.
    ///
    /// `raw` is the tool's output, `input_args` the arguments the model
    /// called it with, `reasoning` the model's stated intent, and
    /// `is_final` whether the planning loop terminated on this call.
    pub fn map_tool_result(
        tool_name: &str,
        raw: &Value,
        input_args: &Value,
        reasoning: Option<&str>,
        is_final: bool,
    ) -> Vec<Action> {
        match tool_name {
            "fillForm" | "fill_form" => Self::map_fill_form(raw, reasoning, is_final),
            "screenshot" => vec![Self::screenshot_marker(is_final)],
            // Aria trees are huge, page-state dependent, and cheap to
            // re-read live. They never enter the replay log.
            "ariaTree" | "aria_tree" => Vec::new(),
            _ => vec![Self::map_generic(
                tool_name, raw, input_args, reasoning, is_final,
            )],
        }
    }

    /// Expand a form-fill result into one summary action plus one
    /// independently replayable action per performed field write.
    fn map_fill_form(raw: &Value, reasoning: Option<&str>, is_final: bool) -> Vec<Action> {
        let fields = raw
            .get("fields")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut actions = Vec::with_capacity(fields.len() + 1);

        let mut summary = Action::new("", "fillForm").with_description(
            reasoning
                .map(str::to_string)
                .unwrap_or_else(|| format!("fill {} form fields", fields.len())),
        );
        summary.task_completed = is_final;
        actions.push(summary);

        for field in fields {
            let Some(selector) = field.get("selector").and_then(Value::as_str) else {
                log::debug!("skipping form field without selector: {field}");
                continue;
            };
            let method = field
                .get("method")
                .and_then(Value::as_str)
                .unwrap_or("fill");
            let description = field
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("fill {selector}"));
            let mut action = Action::new(selector, method).with_description(description);
            if let Some(value) = field.get("value") {
                action = action.with_arguments(vec![value.clone()]);
            }
            actions.push(action);
        }

        actions
    }

    /// Marker action for a screenshot capture. Image bytes never enter
    /// the replay log.
    fn screenshot_marker(is_final: bool) -> Action {
        let mut action = Action::new("", "screenshot").with_description(SCREENSHOT_MARKER);
        action.task_completed = is_final;
        action
    }

    /// Generic mapping: one action whose arguments merge the declared
    /// inputs with the tool's structural output, minus bulky payloads.
    fn map_generic(
        tool_name: &str,
        raw: &Value,
        input_args: &Value,
        reasoning: Option<&str>,
        is_final: bool,
    ) -> Action {
        let mut merged = Map::new();
        if let Some(args) = input_args.as_object() {
            for (key, value) in args {
                merged.insert(key.clone(), value.clone());
            }
        }
        if let Some(output) = raw.as_object() {
            for (key, value) in output {
                if BULKY_KEYS.contains(&key.as_str()) {
                    continue;
                }
                merged.insert(key.clone(), value.clone());
            }
        }

        let selector = raw
            .get("selector")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let mut action = Action::new(selector, tool_name).with_description(
            reasoning
                .map(str::to_string)
                .unwrap_or_else(|| tool_name.to_string()),
        );
        if !merged.is_empty() {
            action = action.with_arguments(vec![Value::Object(merged)]);
        }
        action.task_completed = is_final;
        action
    }
}

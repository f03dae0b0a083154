//! Transcript compaction between planning turns.
//!
//! Screenshots and accessibility trees dominate transcript size but go
//! stale the moment the page changes. The compressor keeps only the
//! freshest of each in the model-facing message history and swaps the
//! rest for short placeholders, leaving every textual part untouched.

use crate::llm::{ChatMessage, ContentPart, MessageContent, ToolOutput};

const VISUAL_PLACEHOLDER: &str = "[screenshot removed to conserve context]";
const STRUCTURAL_PLACEHOLDER: &str = "[aria tree removed to conserve context]";

/// In-place transcript compressor.
#[derive(Debug, Clone, Copy)]
pub struct MessageCompressor {
    /// How many of the most recent visual tool results survive intact.
    keep_visual: usize,
    /// How many of the most recent accessibility-tree results survive.
    keep_structural: usize,
}

impl Default for MessageCompressor {
    fn default() -> Self {
        Self {
            keep_visual: 2,
            keep_structural: 1,
        }
    }
}

impl MessageCompressor {
    /// Compressor with the default retention (2 visual, 1 structural).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many recent visual results to keep.
    pub fn with_keep_visual(mut self, keep: usize) -> Self {
        self.keep_visual = keep;
        self
    }

    /// Set how many recent accessibility-tree results to keep.
    pub fn with_keep_structural(mut self, keep: usize) -> Self {
        self.keep_structural = keep;
        self
    }

    /// Compress older bulky tool results in place.
    ///
    /// Visual results (screenshot tool output, or any tool result
    /// carrying media) beyond the retention window have their media
    /// payloads replaced by a placeholder; accompanying text survives.
    /// Accessibility-tree results beyond their window are replaced
    /// entirely. Returns the number of tool results compressed; running
    /// twice is stable and the second pass returns 0.
    pub fn compress(&self, messages: &mut [ChatMessage]) -> usize {
        let mut visual: Vec<(usize, usize)> = Vec::new();
        let mut structural: Vec<(usize, usize)> = Vec::new();

        for (m, message) in messages.iter().enumerate() {
            let MessageContent::MultiPart(parts) = &message.content else {
                continue;
            };
            for (p, part) in parts.iter().enumerate() {
                let ContentPart::ToolResult { tool_name, output } = part else {
                    continue;
                };
                if tool_name == "ariaTree" || tool_name == "aria_tree" {
                    structural.push((m, p));
                } else if tool_name == "screenshot" || output.iter().any(ToolOutput::is_media) {
                    visual.push((m, p));
                }
            }
        }

        let visual_cutoff = visual.len().saturating_sub(self.keep_visual);
        let structural_cutoff = structural.len().saturating_sub(self.keep_structural);

        let mut compressed = 0;
        for at in &visual[..visual_cutoff] {
            if strip_media(messages, *at) {
                compressed += 1;
            }
        }
        for at in &structural[..structural_cutoff] {
            if replace_structural(messages, *at) {
                compressed += 1;
            }
        }

        if compressed > 0 {
            log::debug!("compressed {compressed} tool results in transcript");
        }
        compressed
    }
}

fn output_mut(messages: &mut [ChatMessage], at: (usize, usize)) -> Option<&mut Vec<ToolOutput>> {
    let MessageContent::MultiPart(parts) = &mut messages[at.0].content else {
        return None;
    };
    match parts.get_mut(at.1) {
        Some(ContentPart::ToolResult { output, .. }) => Some(output),
        _ => None,
    }
}

fn strip_media(messages: &mut [ChatMessage], at: (usize, usize)) -> bool {
    let Some(output) = output_mut(messages, at) else {
        return false;
    };
    let mut changed = false;
    for slot in output.iter_mut() {
        if slot.is_media() {
            *slot = ToolOutput::Text {
                text: VISUAL_PLACEHOLDER.to_string(),
            };
            changed = true;
        }
    }
    changed
}

fn replace_structural(messages: &mut [ChatMessage], at: (usize, usize)) -> bool {
    let Some(output) = output_mut(messages, at) else {
        return false;
    };
    let already = output.len() == 1
        && matches!(&output[0], ToolOutput::Text { text } if text == STRUCTURAL_PLACEHOLDER);
    if already {
        return false;
    }
    *output = vec![ToolOutput::Text {
        text: STRUCTURAL_PLACEHOLDER.to_string(),
    }];
    true
}

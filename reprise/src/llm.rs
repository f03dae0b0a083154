//! Model client abstractions for the replay engine.
//!
//! The engine never talks to a provider directly. It holds a default
//! [`ModelClient`] chosen at construction, accepts a per-call override,
//! and hands whichever wins to the live-planning fallback when healing
//! needs the model again. The message types here are also the transcript
//! shape [`crate::MessageCompressor`] compacts between planning turns.

use crate::error::CacheResult;
use async_trait::async_trait;
use reprise_types::AgentUsage;
use serde::{Deserialize, Serialize};

/// Chat-completion client trait for abstracting model providers.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a completion request and return the response text.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> CacheResult<CompletionResponse>;

    /// Model identifier for logging and configuration signatures.
    fn model_name(&self) -> &str;
}

/// A message in a model-facing conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", "assistant", or "tool".
    pub role: String,
    /// Message content.
    pub content: MessageContent,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a tool-result message.
    pub fn tool_result(tool_name: impl Into<String>, output: Vec<ToolOutput>) -> Self {
        Self {
            role: "tool".to_string(),
            content: MessageContent::MultiPart(vec![ContentPart::ToolResult {
                tool_name: tool_name.into(),
                output,
            }]),
        }
    }
}

/// Message content, either plain text or multi-part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content.
    Text(String),
    /// Multi-part content (text, images, tool results).
    MultiPart(Vec<ContentPart>),
}

/// A part of multi-part content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text part.
    Text {
        /// The text.
        text: String,
    },
    /// Image URL part.
    ImageUrl {
        /// The image reference.
        image_url: ImageUrl,
    },
    /// Result of a tool execution.
    ToolResult {
        /// Name of the tool that produced the result.
        tool_name: String,
        /// Tool output payloads.
        output: Vec<ToolOutput>,
    },
}

/// Image URL for vision models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// URL (can be a data URL with base64).
    pub url: String,
}

/// One payload inside a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutput {
    /// Textual output.
    Text {
        /// The text.
        text: String,
    },
    /// Binary media output, base64-encoded.
    Media {
        /// Encoded payload.
        data: String,
        /// Payload MIME type.
        mime_type: String,
    },
    /// Structured output.
    Json {
        /// The structured value.
        value: serde_json::Value,
    },
}

impl ToolOutput {
    /// Whether this payload carries media bytes.
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Media { .. })
    }
}

/// Options for completion requests.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Temperature (0.0 - 2.0).
    pub temperature: f32,
    /// Max tokens to generate.
    pub max_tokens: u16,
    /// Request JSON output.
    pub json_mode: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 4096,
            json_mode: true,
        }
    }
}

/// Response from a completion request.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The generated text.
    pub content: String,
    /// Token usage.
    pub usage: AgentUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
        assert_eq!(ChatMessage::assistant("a").role, "assistant");

        let tool = ChatMessage::tool_result(
            "screenshot",
            vec![ToolOutput::Media {
                data: "aGk=".into(),
                mime_type: "image/png".into(),
            }],
        );
        assert_eq!(tool.role, "tool");
        match &tool.content {
            MessageContent::MultiPart(parts) => match &parts[0] {
                ContentPart::ToolResult { tool_name, output } => {
                    assert_eq!(tool_name, "screenshot");
                    assert!(output[0].is_media());
                }
                other => panic!("unexpected part: {:?}", other),
            },
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[test]
    fn test_content_part_wire_tags() {
        let part = ContentPart::ToolResult {
            tool_name: "ariaTree".into(),
            output: vec![ToolOutput::Text { text: "tree".into() }],
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["output"][0]["type"], "text");

        let image = ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: "data:image/png;base64,aGk=".into(),
            },
        };
        assert_eq!(serde_json::to_value(&image).unwrap()["type"], "image_url");
    }

    #[test]
    fn test_plain_text_content_is_untagged() {
        let message = ChatMessage::user("hello");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["content"], "hello");
        let back: ChatMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);
    }
}

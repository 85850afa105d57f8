use super::errors::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Identifier the matching result must carry.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments as JSON.
    pub input: Value,
}

/// The answer to a [`ToolUse`], correlated by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_use_id: String,
    pub content: ToolResultContent,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful result.
    pub fn success(tool_use_id: impl Into<String>, content: impl Into<ToolResultContent>) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error result carrying a description of the failure.
    pub fn error(tool_use_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content: ToolResultContent::Text(message.into()),
            is_error: true,
        }
    }
}

/// Output of a tool: a single text payload or an ordered list of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Items(Vec<ToolContentItem>),
}

impl ToolResultContent {
    /// Concatenated text of the content, ignoring non-text items.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Items(items) => items
                .iter()
                .filter_map(|item| match item {
                    ToolContentItem::Text { text } => Some(text.as_str()),
                    ToolContentItem::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

impl From<String> for ToolResultContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolResultContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<ToolContentItem>> for ToolResultContent {
    fn from(items: Vec<ToolContentItem>) -> Self {
        Self::Items(items)
    }
}

/// One item of structured tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContentItem {
    Text { text: String },
    Image { source: ImageSource },
}

/// Binary image payload carried inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    Base64 { media_type: String, data: String },
}

/// A unit of turn content.
///
/// The serialized form mirrors the Messages API block shapes, so a persisted
/// transcript reads the same as what was exchanged on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text content.
    Text { text: String },
    /// Tool call from the assistant.
    ToolUse(ToolUse),
    /// Tool result from the user side.
    ToolResult(ToolResult),
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }
}

/// One message of the conversation: a role and its ordered content blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Turn {
    /// Create a user turn holding a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create an assistant turn from blocks.
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// Create a user turn carrying one tool result.
    pub fn tool_result(result: ToolResult) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::ToolResult(result)],
        }
    }

    /// Get combined text content from all text blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// The tool request carried by the final block, if any.
    ///
    /// Only the last block of a turn is ever acted upon.
    pub fn trailing_tool_use(&self) -> Option<&ToolUse> {
        match self.content.last() {
            Some(ContentBlock::ToolUse(tool_use)) => Some(tool_use),
            _ => None,
        }
    }

    /// Iterate over the tool results in this turn.
    pub fn tool_results(&self) -> impl Iterator<Item = &ToolResult> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolResult(result) => Some(result),
            _ => None,
        })
    }
}

/// A tool definition as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name.
    pub name: String,
    /// Human- and model-readable description.
    pub description: String,
    /// JSON Schema for input parameters.
    pub input_schema: Value,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens = self.input_tokens.saturating_add(rhs.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(rhs.output_tokens);
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Natural end of response.
    EndTurn,
    /// Model wants to call a tool.
    ToolUse,
    /// Hit the output token limit.
    MaxTokens,
    /// Hit a stop sequence.
    StopSequence,
    /// Unknown reason (forward compatibility).
    Other(String),
}

/// Everything needed for a model request.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    /// Ordered system prompt text blocks.
    pub system: &'a [String],
    pub tools: &'a [ToolSpec],
    pub turns: &'a [Turn],
}

/// The response from a model.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    /// The assistant turn, holding at least one block.
    pub turn: Turn,
    pub usage: Usage,
    pub stop_reason: Option<StopReason>,
}

/// Trait for model transports.
///
/// Implementations own network transmission and authentication, and report
/// every transport-level fault as a [`ModelError`].
pub trait Backend: Send + Sync {
    fn call(
        &self,
        request: ModelRequest<'_>,
    ) -> impl Future<Output = Result<ModelResponse, ModelError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn turn_text_extraction() {
        let turn = Turn::assistant(vec![
            ContentBlock::text("Hello "),
            ContentBlock::ToolUse(ToolUse {
                id: "1".into(),
                name: "test".into(),
                input: Value::Null,
            }),
            ContentBlock::text("world"),
        ]);
        assert_eq!(turn.text(), "Hello world");
    }

    #[test]
    fn only_final_block_counts_as_tool_request() {
        let tool_use = ToolUse {
            id: "t1".into(),
            name: "list_paths".into(),
            input: json!({"path": "."}),
        };

        let trailing = Turn::assistant(vec![
            ContentBlock::text("Let me look"),
            ContentBlock::ToolUse(tool_use.clone()),
        ]);
        assert_eq!(trailing.trailing_tool_use(), Some(&tool_use));

        let leading = Turn::assistant(vec![
            ContentBlock::ToolUse(tool_use),
            ContentBlock::text("done"),
        ]);
        assert_eq!(leading.trailing_tool_use(), None);
    }

    #[test]
    fn blocks_serialize_in_wire_shape() {
        let turn = Turn {
            role: Role::User,
            content: vec![ContentBlock::ToolResult(ToolResult::error("t1", "boom"))],
        };
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [{
                    "type": "tool_result",
                    "tool_use_id": "t1",
                    "content": "boom",
                    "is_error": true
                }]
            })
        );
    }

    #[test]
    fn structured_tool_content_keeps_item_order() {
        let content = ToolResultContent::Items(vec![
            ToolContentItem::Text { text: "a".into() },
            ToolContentItem::Image {
                source: ImageSource::Base64 {
                    media_type: "image/png".into(),
                    data: "AAAA".into(),
                },
            },
            ToolContentItem::Text { text: "b".into() },
        ]);
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value[1]["source"]["type"], "base64");

        let back: ToolResultContent = serde_json::from_value(value).unwrap();
        assert_eq!(back, content);
        assert_eq!(back.text(), "ab");
    }

    #[test]
    fn missing_is_error_defaults_to_false() {
        let block: ContentBlock = serde_json::from_value(json!({
            "type": "tool_result",
            "tool_use_id": "t1",
            "content": "ok"
        }))
        .unwrap();
        assert!(matches!(block, ContentBlock::ToolResult(ToolResult { is_error: false, .. })));
    }

    #[test]
    fn usage_accumulates() {
        let mut usage = Usage::default();
        usage += Usage {
            input_tokens: 100,
            output_tokens: 50,
        };
        usage += Usage {
            input_tokens: 10,
            output_tokens: 5,
        };
        assert_eq!(usage.total_tokens(), 165);
    }
}

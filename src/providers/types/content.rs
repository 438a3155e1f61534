use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plain text content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
}

/// A tool invocation requested by the model.
///
/// `is_error` marks requests the provider could not decode (invalid function
/// name, unparseable arguments); these are never dispatched, the error is
/// reflected back to the model instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub parameters: Value,
    #[serde(default)]
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// The outcome of one tool invocation, correlated by `tool_use_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_use_id: String,
    pub output: String,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    Text(Text),
    ToolUse(ToolUse),
    ToolResult(ToolResult),
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text(Text { text: text.into() })
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, parameters: Value) -> Self {
        Content::ToolUse(ToolUse {
            id: id.into(),
            name: name.into(),
            parameters,
            is_error: false,
            error_message: None,
        })
    }

    pub fn tool_result(tool_use_id: impl Into<String>, output: impl Into<String>) -> Self {
        Content::ToolResult(ToolResult {
            tool_use_id: tool_use_id.into(),
            output: output.into(),
            is_error: false,
        })
    }

    pub fn tool_error(tool_use_id: impl Into<String>, output: impl Into<String>) -> Self {
        Content::ToolResult(ToolResult {
            tool_use_id: tool_use_id.into(),
            output: output.into(),
            is_error: true,
        })
    }
}

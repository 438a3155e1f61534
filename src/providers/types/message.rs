use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::{Content, ToolResult, ToolUse};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One unit of conversation: a user turn, an assistant turn (which may carry
/// tool requests), or a user turn carrying tool results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub id: String,
    pub created: i64,
    pub content: Vec<Content>,
}

impl Message {
    pub fn new(role: Role, content: Vec<Content>) -> Result<Self> {
        let msg = Self {
            role,
            id: format!("msg_{}", Uuid::new_v4().simple()),
            created: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs() as i64,
            content,
        };
        msg.validate()?;
        Ok(msg)
    }

    pub fn user(text: &str) -> Result<Self> {
        Self::new(Role::User, vec![Content::text(text)])
    }

    pub fn assistant(text: &str) -> Result<Self> {
        Self::new(Role::Assistant, vec![Content::text(text)])
    }

    /// Wrap a round of tool results as the user turn that answers an
    /// assistant's tool requests.
    pub fn tool_results(results: Vec<ToolResult>) -> Result<Self> {
        Self::new(Role::User, results.into_iter().map(Content::ToolResult).collect())
    }

    // Tool requests only flow from the model, tool results only flow back to it.
    fn validate(&self) -> Result<()> {
        match self.role {
            Role::User => {
                if !self.has_text() && !self.has_tool_result() {
                    return Err(anyhow!("User message must include a Text or ToolResult"));
                }
                if self.has_tool_use() {
                    return Err(anyhow!("User message does not support ToolUse"));
                }
            }
            Role::Assistant => {
                if !self.has_text() && !self.has_tool_use() {
                    return Err(anyhow!("Assistant message must include a Text or ToolUse"));
                }
                if self.has_tool_result() {
                    return Err(anyhow!("Assistant message does not support ToolResult"));
                }
            }
        }
        Ok(())
    }

    /// All text content joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|content| match content {
                Content::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tool invocations requested by this message, in emission order.
    pub fn tool_uses(&self) -> Vec<ToolUse> {
        self.content
            .iter()
            .filter_map(|content| match content {
                Content::ToolUse(tool_use) => Some(tool_use.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_results_content(&self) -> Vec<ToolResult> {
        self.content
            .iter()
            .filter_map(|content| match content {
                Content::ToolResult(result) => Some(result.clone()),
                _ => None,
            })
            .collect()
    }

    fn has_text(&self) -> bool {
        self.content.iter().any(|c| matches!(c, Content::Text(_)))
    }

    fn has_tool_use(&self) -> bool {
        self.content.iter().any(|c| matches!(c, Content::ToolUse(_)))
    }

    fn has_tool_result(&self) -> bool {
        self.content.iter().any(|c| matches!(c, Content::ToolResult(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_user_message() -> Result<()> {
        let message = Message::user("convert 10 INR to USD")?;
        assert!(matches!(message.role, Role::User));
        assert_eq!(message.text(), "convert 10 INR to USD");
        assert!(message.id.starts_with("msg_"));
        Ok(())
    }

    #[test]
    fn test_assistant_message() -> Result<()> {
        let message = Message::assistant("10 INR is 0.12 USD")?;
        assert!(matches!(message.role, Role::Assistant));
        assert_eq!(message.text(), "10 INR is 0.12 USD");
        Ok(())
    }

    #[test]
    fn test_message_ids_unique() -> Result<()> {
        let first = Message::user("a")?;
        let second = Message::user("a")?;
        assert_ne!(first.id, second.id);
        Ok(())
    }

    #[test]
    fn test_tool_uses_in_order() -> Result<()> {
        let message = Message::new(
            Role::Assistant,
            vec![
                Content::tool_use("1", "get_conversion_rate", json!({})),
                Content::tool_use("2", "convert_currency", json!({})),
            ],
        )?;

        let uses = message.tool_uses();
        assert_eq!(uses.len(), 2);
        assert_eq!(uses[0].name, "get_conversion_rate");
        assert_eq!(uses[1].name, "convert_currency");
        Ok(())
    }

    #[test]
    fn test_tool_results_message() -> Result<()> {
        let message = Message::tool_results(vec![ToolResult {
            tool_use_id: "1".to_string(),
            output: "{\"conversion_rate\": 0.012}".to_string(),
            is_error: false,
        }])?;

        assert!(matches!(message.role, Role::User));
        assert_eq!(message.tool_results_content().len(), 1);
        assert_eq!(message.tool_results_content()[0].tool_use_id, "1");
        Ok(())
    }

    #[test]
    fn test_message_validation() {
        // User messages never carry tool requests
        let result = Message::new(
            Role::User,
            vec![Content::tool_use("1", "convert_currency", json!({}))],
        );
        assert!(result.is_err());

        // Assistant messages never carry tool results
        let result = Message::new(Role::Assistant, vec![Content::tool_result("1", "0.12")]);
        assert!(result.is_err());

        // Empty content is invalid for either role
        assert!(Message::new(Role::User, vec![]).is_err());
        assert!(Message::new(Role::Assistant, vec![]).is_err());
    }

    #[test]
    fn test_serialization() -> Result<()> {
        let message = Message::new(
            Role::Assistant,
            vec![
                Content::text("Looking up the rate"),
                Content::tool_use("1", "get_conversion_rate", json!({"base_currency": "INR"})),
            ],
        )?;

        let serialized = serde_json::to_string(&message)?;
        let deserialized: Message = serde_json::from_str(&serialized)?;
        assert_eq!(message, deserialized);

        let value: Value = serde_json::from_str(&serialized)?;
        assert_eq!(value["role"], "assistant");
        assert!(value.get("id").is_some());
        assert!(value.get("created").is_some());
        Ok(())
    }
}

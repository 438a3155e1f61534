use anyhow::{anyhow, Result};
use regex::Regex;
use serde_json::{json, Value};

use super::types::{
    content::{Content, Text},
    message::{Message, Role},
};
use crate::tools::Tool;

/// Convert internal messages to the OpenAI-compatible chat message spec.
/// Tool results become their own `role: tool` entries keyed by call id.
pub fn messages_to_wire_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role
        });

        let mut tool_entries = Vec::new();

        for content in &message.content {
            match content {
                Content::Text(Text { text }) => {
                    converted["content"] = json!(text);
                }
                Content::ToolUse(tool_use) => {
                    let tool_calls = converted
                        .as_object_mut()
                        .unwrap()
                        .entry("tool_calls")
                        .or_insert(json!([]));

                    tool_calls.as_array_mut().unwrap().push(json!({
                        "id": tool_use.id,
                        "type": "function",
                        "function": {
                            "name": sanitize_function_name(&tool_use.name),
                            "arguments": tool_use.parameters.to_string(),
                        }
                    }));
                }
                Content::ToolResult(tool_result) => {
                    tool_entries.push(json!({
                        "role": "tool",
                        "content": tool_result.output,
                        "tool_call_id": tool_result.tool_use_id
                    }));
                }
            }
        }

        if converted.get("content").is_some() || converted.get("tool_calls").is_some() {
            messages_spec.push(converted);
        }
        messages_spec.extend(tool_entries);
    }

    messages_spec
}

/// Convert registered tools to the wire tool spec.
pub fn tools_to_wire_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// Parse a chat-completions response into an assistant message. Tool calls
/// that cannot be decoded are kept but flagged `is_error` so the loop can
/// reflect the problem back to the model instead of dispatching them.
pub fn wire_response_to_message(response: Value) -> Result<Message> {
    let original = response["choices"][0]["message"].clone();
    let mut content = Vec::new();

    if let Some(text) = original.get("content").and_then(|v| v.as_str()) {
        content.push(Content::text(text));
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|v| v.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default().to_string();
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default()
                .to_string();

            if !is_valid_function_name(&function_name) {
                content.push(Content::ToolUse(super::types::content::ToolUse {
                    id,
                    name: function_name.clone(),
                    parameters: json!(arguments),
                    is_error: true,
                    error_message: Some(format!(
                        "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                        function_name
                    )),
                }));
            } else {
                match serde_json::from_str::<Value>(&arguments) {
                    Ok(params) => content.push(Content::tool_use(id, function_name, params)),
                    Err(_) => content.push(Content::ToolUse(super::types::content::ToolUse {
                        id: id.clone(),
                        name: function_name,
                        parameters: json!(arguments),
                        is_error: true,
                        error_message: Some(format!(
                            "Could not interpret tool use parameters for id {}: {}",
                            id, arguments
                        )),
                    })),
                }
            }
        }
    }

    Message::new(Role::Assistant, content)
}

fn sanitize_function_name(name: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    re.replace_all(name, "_").to_string()
}

fn is_valid_function_name(name: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
    re.is_match(name)
}

use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::{
    base::{Provider, Usage},
    configs::base::ProviderConfig,
    configs::groq::GroqProviderConfig,
    types::message::Message,
    utils::{messages_to_wire_spec, tools_to_wire_spec, wire_response_to_message},
};
use crate::tools::Tool;

/// Chat-completions provider for Groq, which serves the OpenAI-compatible
/// wire format under its `/openai` prefix.
pub struct GroqProvider {
    client: Client,
    config: GroqProviderConfig,
}

impl GroqProvider {
    pub fn new(config: GroqProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        let config = GroqProviderConfig::from_env()?;
        Self::new(config)
    }

    fn get_usage(data: &Value) -> Usage {
        let usage = data.get("usage");

        let input_tokens = usage
            .and_then(|u| u.get("prompt_tokens"))
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let output_tokens = usage
            .and_then(|u| u.get("completion_tokens"))
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let total_tokens = usage
            .and_then(|u| u.get("total_tokens"))
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
            .or_else(|| match (input_tokens, output_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            });

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()?;

        match response.status() {
            StatusCode::OK => Ok(response.json()?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            _ => Err(anyhow!("Request failed: {}", response.status())),
        }
    }
}

impl Provider for GroqProvider {
    fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        temperature: Option<f32>,
        max_tokens: Option<i32>,
    ) -> Result<(Message, Usage)> {
        let system_message = json!({
            "role": "system",
            "content": system
        });

        let messages_spec = messages_to_wire_spec(messages);
        let tools_spec = if !tools.is_empty() {
            tools_to_wire_spec(tools)?
        } else {
            vec![]
        };

        // system message first, then the transcript
        let mut messages_array = vec![system_message];
        messages_array.extend(messages_spec);

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_array
        });

        if !tools_spec.is_empty() {
            payload
                .as_object_mut()
                .unwrap()
                .insert("tools".to_string(), json!(tools_spec));
        }
        if let Some(temp) = temperature {
            payload
                .as_object_mut()
                .unwrap()
                .insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = max_tokens {
            payload
                .as_object_mut()
                .unwrap()
                .insert("max_tokens".to_string(), json!(tokens));
        }

        let response = self.post(payload)?;

        if let Some(error) = response.get("error") {
            return Err(anyhow!("Groq API error: {}", error));
        }

        let message = wire_response_to_message(response.clone())?;
        let usage = Self::get_usage(&response);

        Ok((message, usage))
    }
}

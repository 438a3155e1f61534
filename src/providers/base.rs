use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::types::message::Message;
use crate::tools::Tool;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Base trait for chat-completion providers.
///
/// One call submits the full ordered transcript plus the tool schemas and
/// returns the next assistant message. The model is part of the provider's
/// configuration; calls block until the provider responds or its client
/// timeout fires.
pub trait Provider: Send + Sync {
    fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        temperature: Option<f32>,
        max_tokens: Option<i32>,
    ) -> Result<(Message, Usage)>;
}

// Lets callers hold on to a provider (e.g. a scripted mock) while the agent
// owns a boxed clone of the same instance.
impl<P: Provider + ?Sized> Provider for std::sync::Arc<P> {
    fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        temperature: Option<f32>,
        max_tokens: Option<i32>,
    ) -> Result<(Message, Usage)> {
        (**self).complete(system, messages, tools, temperature, max_tokens)
    }
}

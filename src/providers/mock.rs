use std::sync::Mutex;

use anyhow::Result;

use super::base::{Provider, Usage};
use super::types::message::Message;
use crate::tools::Tool;

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Mutex<Vec<Message>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }

    /// Responses not yet consumed; lets tests assert the loop stopped early.
    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

impl Provider for MockProvider {
    fn complete(
        &self,
        _system: &str,
        _messages: &[Message],
        _tools: &[Tool],
        _temperature: Option<f32>,
        _max_tokens: Option<i32>,
    ) -> Result<(Message, Usage)> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            Ok((Message::assistant("")?, Usage::default()))
        } else {
            Ok((responses.remove(0), Usage::default()))
        }
    }
}

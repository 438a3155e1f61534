use serde_json::json;

use crate::errors::{AgentError, AgentResult};
use crate::providers::base::Provider;
use crate::providers::types::content::{ToolResult, ToolUse};
use crate::providers::types::message::Message;
use crate::tools::{convert, rates, ToolRegistry};

const SYSTEM_PROMPT: &str = "You are a currency conversion assistant. \
    Use the get_conversion_rate tool to fetch the conversion rate between two \
    currencies and the convert_currency tool to apply a rate to an amount. \
    Once you have the converted amount, reply with a short final answer in \
    plain language.";

pub const DEFAULT_MAX_TURNS: usize = 10;

/// Drives the conversation with the model: submit the transcript, execute the
/// tool calls it requests, feed the results back, and stop at the first
/// assistant turn that is a final answer.
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: ToolRegistry,
    max_turns: usize,
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, registry: ToolRegistry) -> Self {
        Self {
            provider,
            registry,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Run one request to completion and return every message generated along
    /// the way (assistant turns and tool-result turns). The last message is
    /// the terminal assistant answer.
    ///
    /// The transcript and the last observed conversion rate live and die with
    /// this call; nothing is shared across requests.
    pub fn reply(&self, messages: &[Message]) -> AgentResult<Vec<Message>> {
        let mut transcript = messages.to_vec();
        let mut generated = Vec::new();
        let mut last_rate: Option<f64> = None;

        for _ in 0..self.max_turns {
            let (response, _usage) = self
                .provider
                .complete(
                    SYSTEM_PROMPT,
                    &transcript,
                    self.registry.tools(),
                    Some(0.0),
                    None,
                )
                .map_err(|e| AgentError::Provider(e.to_string()))?;

            transcript.push(response.clone());
            generated.push(response.clone());

            let tool_uses = response.tool_uses();
            if tool_uses.is_empty() {
                // Terminal only on an actual answer. A turn with neither text
                // nor tool calls burns an iteration and asks again.
                if !response.text().trim().is_empty() {
                    return Ok(generated);
                }
                continue;
            }

            // Tool calls take precedence even when the turn also carries text.
            // Dispatch strictly in emission order, one result per call.
            let mut results = Vec::new();
            for tool_use in &tool_uses {
                results.push(self.dispatch_tool_use(tool_use, &mut last_rate)?);
            }

            let results_message =
                Message::tool_results(results).map_err(|e| AgentError::Internal(e.to_string()))?;
            transcript.push(results_message.clone());
            generated.push(results_message);
        }

        Err(AgentError::TurnLimit(self.max_turns))
    }

    /// Execute one tool call. Tool failures (including upstream rate errors)
    /// become failure results the model reads on its next turn; only protocol
    /// violations (unknown tool, unresolvable rate) abort the request.
    fn dispatch_tool_use(
        &self,
        tool_use: &ToolUse,
        last_rate: &mut Option<f64>,
    ) -> AgentResult<ToolResult> {
        if tool_use.is_error {
            let reason = tool_use
                .error_message
                .clone()
                .unwrap_or_else(|| "Malformed tool call".to_string());
            return Ok(ToolResult {
                tool_use_id: tool_use.id.clone(),
                output: reason,
                is_error: true,
            });
        }

        let tool = self
            .registry
            .get(&tool_use.name)
            .ok_or_else(|| AgentError::ToolNotFound(tool_use.name.clone()))?;

        let mut arguments = tool_use.parameters.clone();

        // The model often omits the rate and relies on us remembering it. An
        // explicitly supplied rate is always used as given.
        if tool_use.name == convert::TOOL_NAME && !has_rate_argument(&arguments) {
            let rate = last_rate.ok_or_else(|| {
                AgentError::MissingRate(
                    "conversion requested before any successful rate lookup".to_string(),
                )
            })?;
            arguments
                .as_object_mut()
                .ok_or_else(|| {
                    AgentError::InvalidParameters(format!(
                        "{} arguments must be an object",
                        convert::TOOL_NAME
                    ))
                })?
                .insert(convert::RATE_PARAM.to_string(), json!(rate));
        }

        match (tool.function)(&arguments) {
            Ok(output) => {
                if tool_use.name == rates::TOOL_NAME {
                    if let Some(rate) = rates::extract_rate(&output) {
                        *last_rate = Some(rate);
                    }
                }
                let serialized = serde_json::to_string(&output)
                    .map_err(|e| AgentError::Internal(e.to_string()))?;
                Ok(ToolResult {
                    tool_use_id: tool_use.id.clone(),
                    output: serialized,
                    is_error: false,
                })
            }
            Err(e) => Ok(ToolResult {
                tool_use_id: tool_use.id.clone(),
                output: e.to_string(),
                is_error: true,
            }),
        }
    }
}

fn has_rate_argument(arguments: &serde_json::Value) -> bool {
    arguments
        .get(convert::RATE_PARAM)
        .map(|v| !v.is_null())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::anyhow;
    use serde_json::{json, Value};

    use super::*;
    use crate::providers::mock::MockProvider;
    use crate::providers::types::content::Content;
    use crate::providers::types::message::Role;
    use crate::tools::Tool;

    fn stub_rate_tool(payload: Value) -> Tool {
        Tool::new(
            rates::TOOL_NAME,
            "Fetch a conversion rate",
            json!({"type": "object", "properties": {}}),
            move |_| Ok(payload.clone()),
        )
    }

    fn failing_rate_tool() -> Tool {
        Tool::new(
            rates::TOOL_NAME,
            "Fetch a conversion rate",
            json!({"type": "object", "properties": {}}),
            |_| Err(anyhow!("connection timed out")),
        )
    }

    fn registry_with(rate_tool: Tool) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(rate_tool).unwrap();
        registry.register(convert::tool()).unwrap();
        registry
    }

    fn success_payload() -> Value {
        json!({
            "result": "success",
            "base_code": "INR",
            "target_code": "USD",
            "conversion_rate": 0.012
        })
    }

    fn assistant_tool_use(id: &str, name: &str, args: Value) -> Message {
        Message::new(Role::Assistant, vec![Content::tool_use(id, name, args)]).unwrap()
    }

    fn agent_with(mock: Arc<MockProvider>, registry: ToolRegistry) -> Agent {
        Agent::new(Box::new(mock), registry)
    }

    #[test]
    fn test_simple_response() {
        let mock = Arc::new(MockProvider::new(vec![Message::assistant("Hello!").unwrap()]));
        let agent = agent_with(mock.clone(), registry_with(stub_rate_tool(success_payload())));

        let reply = agent.reply(&[Message::user("Hi").unwrap()]).unwrap();

        assert_eq!(reply.len(), 1);
        assert_eq!(reply[0].text(), "Hello!");
    }

    #[test]
    fn test_lookup_then_convert_with_rate_injection() {
        let mock = Arc::new(MockProvider::new(vec![
            assistant_tool_use(
                "call_1",
                rates::TOOL_NAME,
                json!({"base_currency": "INR", "target_currency": "USD"}),
            ),
            // the model omits the rate; the loop must supply 0.012
            assistant_tool_use("call_2", convert::TOOL_NAME, json!({"amount": 10.0})),
            Message::assistant("10 INR is about 0.12 USD.").unwrap(),
        ]));
        let agent = agent_with(mock.clone(), registry_with(stub_rate_tool(success_payload())));

        let reply = agent
            .reply(&[Message::user("convert 10 INR to USD").unwrap()])
            .unwrap();

        // lookup turn, its result, convert turn, its result, final answer
        assert_eq!(reply.len(), 5);

        let lookup_result = &reply[1].tool_results_content()[0];
        assert_eq!(lookup_result.tool_use_id, "call_1");
        assert!(!lookup_result.is_error);

        let convert_result = &reply[3].tool_results_content()[0];
        assert_eq!(convert_result.tool_use_id, "call_2");
        let converted: f64 = convert_result.output.parse().unwrap();
        assert!((converted - 0.12).abs() < 1e-9);

        assert_eq!(reply[4].text(), "10 INR is about 0.12 USD.");

        // exactly one lookup pair and one convert pair before the terminal turn
        let tool_use_names: Vec<String> = reply
            .iter()
            .flat_map(|m| m.tool_uses())
            .map(|t| t.name)
            .collect();
        assert_eq!(tool_use_names, vec![rates::TOOL_NAME, convert::TOOL_NAME]);
    }

    #[test]
    fn test_explicit_rate_is_used_as_given() {
        let mock = Arc::new(MockProvider::new(vec![
            assistant_tool_use(
                "call_1",
                rates::TOOL_NAME,
                json!({"base_currency": "INR", "target_currency": "USD"}),
            ),
            assistant_tool_use(
                "call_2",
                convert::TOOL_NAME,
                json!({"amount": 10.0, "conversion_rate": 2.0}),
            ),
            Message::assistant("Done.").unwrap(),
        ]));
        let agent = agent_with(mock.clone(), registry_with(stub_rate_tool(success_payload())));

        let reply = agent
            .reply(&[Message::user("convert 10 INR to USD at rate 2").unwrap()])
            .unwrap();

        let convert_result = &reply[3].tool_results_content()[0];
        let converted: f64 = convert_result.output.parse().unwrap();
        assert_eq!(converted, 20.0);
    }

    #[test]
    fn test_missing_rate_is_fatal() {
        let mock = Arc::new(MockProvider::new(vec![
            assistant_tool_use("call_1", convert::TOOL_NAME, json!({"amount": 10.0})),
            Message::assistant("never reached").unwrap(),
        ]));
        let agent = agent_with(mock.clone(), registry_with(stub_rate_tool(success_payload())));

        let err = agent
            .reply(&[Message::user("convert 10 INR to USD").unwrap()])
            .unwrap_err();

        assert!(matches!(err, AgentError::MissingRate(_)));
        // never silently defaults and never asks the model again
        assert_eq!(mock.remaining(), 1);
    }

    #[test]
    fn test_unknown_tool_aborts() {
        let mock = Arc::new(MockProvider::new(vec![
            assistant_tool_use("call_1", "transfer_funds", json!({})),
            Message::assistant("never reached").unwrap(),
        ]));
        let agent = agent_with(mock.clone(), registry_with(stub_rate_tool(success_payload())));

        let err = agent
            .reply(&[Message::user("convert 10 INR to USD").unwrap()])
            .unwrap_err();

        assert!(matches!(err, AgentError::ToolNotFound(name) if name == "transfer_funds"));
        assert_eq!(mock.remaining(), 1);
    }

    #[test]
    fn test_text_alongside_tool_calls_is_not_terminal() {
        let mock = Arc::new(MockProvider::new(vec![
            Message::new(
                Role::Assistant,
                vec![
                    Content::text("Let me look that up."),
                    Content::tool_use(
                        "call_1",
                        rates::TOOL_NAME,
                        json!({"base_currency": "INR", "target_currency": "USD"}),
                    ),
                ],
            )
            .unwrap(),
            Message::assistant("The rate is 0.012.").unwrap(),
        ]));
        let agent = agent_with(mock.clone(), registry_with(stub_rate_tool(success_payload())));

        let reply = agent
            .reply(&[Message::user("what is the INR to USD rate?").unwrap()])
            .unwrap();

        // the first turn dispatched its tool call instead of terminating
        assert_eq!(reply.len(), 3);
        assert_eq!(reply[2].text(), "The rate is 0.012.");
    }

    #[test]
    fn test_failed_lookup_surfaces_to_model() {
        let mock = Arc::new(MockProvider::new(vec![
            assistant_tool_use(
                "call_1",
                rates::TOOL_NAME,
                json!({"base_currency": "INR", "target_currency": "USD"}),
            ),
            Message::assistant("Sorry, the rate service is unavailable.").unwrap(),
        ]));
        let agent = agent_with(mock.clone(), registry_with(failing_rate_tool()));

        let reply = agent
            .reply(&[Message::user("convert 10 INR to USD").unwrap()])
            .unwrap();

        let lookup_result = &reply[1].tool_results_content()[0];
        assert!(lookup_result.is_error);
        assert!(lookup_result.output.contains("connection timed out"));
        assert_eq!(reply[2].text(), "Sorry, the rate service is unavailable.");
    }

    #[test]
    fn test_error_payload_never_becomes_a_rate() {
        let error_payload = json!({"result": "error", "error-type": "unsupported-code"});
        let mock = Arc::new(MockProvider::new(vec![
            assistant_tool_use(
                "call_1",
                rates::TOOL_NAME,
                json!({"base_currency": "XXX", "target_currency": "USD"}),
            ),
            assistant_tool_use("call_2", convert::TOOL_NAME, json!({"amount": 10.0})),
        ]));
        let agent = agent_with(mock.clone(), registry_with(stub_rate_tool(error_payload)));

        let err = agent
            .reply(&[Message::user("convert 10 XXX to USD").unwrap()])
            .unwrap_err();

        // the error payload reached the transcript but never last_rate
        assert!(matches!(err, AgentError::MissingRate(_)));
    }

    #[test]
    fn test_malformed_tool_call_reflected_back() {
        let malformed = Message::new(
            Role::Assistant,
            vec![Content::ToolUse(ToolUse {
                id: "call_1".to_string(),
                name: rates::TOOL_NAME.to_string(),
                parameters: json!("not json {"),
                is_error: true,
                error_message: Some("Could not interpret tool use parameters".to_string()),
            })],
        )
        .unwrap();
        let mock = Arc::new(MockProvider::new(vec![
            malformed,
            Message::assistant("Let me try again.").unwrap(),
        ]));
        let agent = agent_with(mock.clone(), registry_with(stub_rate_tool(success_payload())));

        let reply = agent
            .reply(&[Message::user("convert 10 INR to USD").unwrap()])
            .unwrap();

        let result = &reply[1].tool_results_content()[0];
        assert!(result.is_error);
        assert!(result.output.contains("Could not interpret"));
        assert_eq!(reply[2].text(), "Let me try again.");
    }

    #[test]
    fn test_turn_limit() {
        // an exhausted mock keeps answering with empty turns
        let mock = Arc::new(MockProvider::new(vec![]));
        let agent = agent_with(mock.clone(), registry_with(stub_rate_tool(success_payload())))
            .with_max_turns(3);

        let err = agent
            .reply(&[Message::user("convert 10 INR to USD").unwrap()])
            .unwrap_err();

        assert!(matches!(err, AgentError::TurnLimit(3)));
    }
}

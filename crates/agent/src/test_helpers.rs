//! Scripted collaborators for loop tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use flightdeck_core::error::{ProviderError, ToolError};
use flightdeck_core::message::{Message, MessageToolCall};
use flightdeck_core::provider::{ChatModel, ChatRequest, ChatResponse, Usage};
use flightdeck_core::tool::{ToolArgs, ToolProvider, ToolSpec};
use serde_json::Value;

/// A mock model that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Panics if more calls are made than responses
/// provided.
pub struct SequentialMockModel {
    responses: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl SequentialMockModel {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self::from_results(responses.into_iter().map(Ok).collect())
    }

    pub fn from_results(results: Vec<Result<ChatResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(results.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A model that answers immediately.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// A model that first requests tools, then answers.
    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, thought: &str, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(tool_calls, thought),
            make_text_response(answer),
        ])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for SequentialMockModel {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("SequentialMockModel: no more responses (call #{call})"))
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ChatResponse {
    ChatResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ChatResponse {
    let mut message = Message::assistant(thought);
    message.tool_calls = tool_calls;
    ChatResponse {
        message,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A tool call with id `call_<name>`.
pub fn make_tool_call(name: &str, args: Value) -> MessageToolCall {
    raw_tool_call(&format!("call_{name}"), name, &args.to_string())
}

/// A tool call with explicit id and unparsed arguments.
pub fn raw_tool_call(id: &str, name: &str, arguments: &str) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

enum Scripted {
    Value(Value),
    Fail(ToolError),
    Delay(Duration),
}

/// A tool provider with canned answers. Unscripted names are `NotFound`.
pub struct ScriptedTools {
    script: BTreeMap<String, Scripted>,
    fail_listing: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTools {
    pub fn new() -> Self {
        Self {
            script: BTreeMap::new(),
            fail_listing: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_result(mut self, name: &str, value: Value) -> Self {
        self.script.insert(name.into(), Scripted::Value(value));
        self
    }

    pub fn with_error(mut self, name: &str, error: ToolError) -> Self {
        self.script.insert(name.into(), Scripted::Fail(error));
        self
    }

    /// A tool that sleeps before returning `null`.
    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.script.insert(name.into(), Scripted::Delay(delay));
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Names passed to `call`, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolProvider for ScriptedTools {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        if self.fail_listing {
            return Err(ToolError::Transport("listing unavailable".into()));
        }
        Ok(self
            .script
            .keys()
            .map(|name| ToolSpec {
                name: name.clone(),
                description: format!("Scripted {name}"),
                input_schema: serde_json::json!({"type": "object"}),
            })
            .collect())
    }

    async fn call(&self, name: &str, _args: ToolArgs) -> Result<Value, ToolError> {
        self.calls.lock().unwrap().push(name.to_string());
        match self.script.get(name) {
            Some(Scripted::Value(value)) => Ok(value.clone()),
            Some(Scripted::Fail(error)) => Err(error.clone()),
            Some(Scripted::Delay(delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(Value::Null)
            }
            None => Err(ToolError::NotFound(name.to_string())),
        }
    }
}

//! Deterministic fakes for the model endpoint, the tool session and the
//! connector. Enabled for this crate's tests and, through the `test-utils`
//! feature, for downstream crates.

use crate::conversation::{ContentBlock, Message};
use crate::launch::LaunchSpec;
use crate::lifecycle::SessionConnector;
use crate::provider::{LlmError, ModelEndpoint, ModelResponse, StopReason};
use crate::tool::{SessionError, ToolDescriptor, ToolOutput, ToolSession};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A descriptor with a canned description and an empty object schema.
pub fn descriptor(name: &str) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: format!("{name} tool"),
        parameter_schema: serde_json::json!({"type": "object", "properties": {}}),
    }
}

// ── Model ───────────────────────────────────────────────────────────

/// What the scripted model saw on one call.
#[derive(Debug, Clone)]
pub struct RecordedModelCall {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

/// A model that replays queued responses in order.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<ModelResponse, String>>>,
    calls: Mutex<Vec<RecordedModelCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a lone text reply.
    pub fn then_text(self, text: &str) -> Self {
        self.then_response(
            ModelResponse::new(vec![ContentBlock::text(text)]).with_stop_reason(StopReason::EndTurn),
        )
    }

    /// Queue an arbitrary block sequence.
    pub fn then_blocks(self, blocks: Vec<ContentBlock>) -> Self {
        self.then_response(ModelResponse::new(blocks).with_stop_reason(StopReason::ToolUse))
    }

    pub fn then_response(self, response: ModelResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a failed call.
    pub fn then_fail(self, message: &str) -> Self {
        self.responses.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedModelCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelEndpoint for ScriptedModel {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ModelResponse, LlmError> {
        self.calls.lock().unwrap().push(RecordedModelCall {
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
        });
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(LlmError::ApiError { status: 529, message }),
            None => Err(LlmError::InvalidResponse("no scripted response left".to_string())),
        }
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

// ── Tool session ────────────────────────────────────────────────────

/// An in-memory tool session with canned outputs per tool name.
pub struct FakeToolSession {
    tools: Vec<ToolDescriptor>,
    outputs: HashMap<String, Result<ToolOutput, SessionError>>,
    fail_list: bool,
    fail_close: bool,
    calls: Mutex<Vec<(String, Value)>>,
    list_calls: AtomicUsize,
    lifecycle: Mutex<Vec<&'static str>>,
}

impl FakeToolSession {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            outputs: HashMap::new(),
            fail_list: false,
            fail_close: false,
            calls: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            lifecycle: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tool(mut self, desc: ToolDescriptor) -> Self {
        self.tools.push(desc);
        self
    }

    pub fn with_output(mut self, name: &str, payload: Value) -> Self {
        self.outputs.insert(name.to_string(), Ok(ToolOutput::new(payload)));
        self
    }

    /// A call that succeeds at the protocol level but is flagged as a tool error.
    pub fn with_error_output(mut self, name: &str, payload: Value) -> Self {
        self.outputs.insert(
            name.to_string(),
            Ok(ToolOutput {
                payload,
                is_error: true,
            }),
        );
        self
    }

    pub fn with_failure(mut self, name: &str, error: SessionError) -> Self {
        self.outputs.insert(name.to_string(), Err(error));
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Tool calls in the order they arrived.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// "close" / "release" in the order they happened.
    pub fn lifecycle_events(&self) -> Vec<&'static str> {
        self.lifecycle.lock().unwrap().clone()
    }

    pub fn was_released(&self) -> bool {
        self.lifecycle_events().contains(&"release")
    }
}

impl Default for FakeToolSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolSession for FakeToolSession {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, SessionError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list {
            return Err(SessionError::Transport("list_tools unavailable".to_string()));
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput, SessionError> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        match self.outputs.get(name) {
            Some(result) => result.clone(),
            None => Err(SessionError::Remote {
                code: -32602,
                message: format!("Unknown tool: {name}"),
            }),
        }
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.lifecycle.lock().unwrap().push("close");
        if self.fail_close {
            return Err(SessionError::Transport("close failed".to_string()));
        }
        Ok(())
    }

    async fn release(&self) {
        self.lifecycle.lock().unwrap().push("release");
    }
}

// ── Connector ───────────────────────────────────────────────────────

/// Hands out a shared [`FakeToolSession`], or fails, and records every attempt.
pub struct FakeConnector {
    session: Arc<FakeToolSession>,
    failure: Option<SessionError>,
    attempts: Mutex<Vec<LaunchSpec>>,
}

impl FakeConnector {
    pub fn new(session: Arc<FakeToolSession>) -> Self {
        Self {
            session,
            failure: None,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: SessionError) -> Self {
        Self {
            session: Arc::new(FakeToolSession::new()),
            failure: Some(error),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> Vec<LaunchSpec> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionConnector for FakeConnector {
    async fn connect(&self, launch: &LaunchSpec) -> Result<Arc<dyn ToolSession>, SessionError> {
        self.attempts.lock().unwrap().push(launch.clone());
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.session.clone() as Arc<dyn ToolSession>),
        }
    }
}

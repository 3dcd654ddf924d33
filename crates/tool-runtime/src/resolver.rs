use crate::catalog::ToolCatalog;
use crate::conversation::{ContentBlock, Conversation, Message};
use crate::error::ResolveError;
use crate::provider::{ModelEndpoint, ModelResponse};
use crate::tool::{SessionError, ToolDescriptor, ToolSession};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Phases of one resolution cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    AwaitingModel,
    Branching,
    ExecutingTools,
    Terminal,
}

/// Outcome of a single transition.
#[derive(Debug)]
pub enum Step {
    /// Tools ran; the model must be consulted again.
    Continue(Conversation),
    /// The model answered with a lone text block.
    Done(Conversation),
}

/// The model signals it is finished by replying with exactly one text block.
///
/// Anything else, including several text blocks, means more work.
pub fn is_terminal(response: &ModelResponse) -> bool {
    matches!(response.content.as_slice(), [ContentBlock::Text { .. }])
}

/// Drives a query to a final answer.
///
/// Flow: User → Model → (Text | ToolInvocations) → Execute → Results → Model → ... → Lone text
///
/// Strictly sequential: one model call, then each tool call in block order.
/// Any model or tool failure aborts the resolution; nothing is retried.
pub struct QueryResolver {
    model: Arc<dyn ModelEndpoint>,
    session: Arc<dyn ToolSession>,
    catalog: Arc<ToolCatalog>,
    tools: Vec<ToolDescriptor>,
    max_cycles: Option<usize>,
}

impl QueryResolver {
    pub const DEFAULT_MAX_CYCLES: usize = 25;

    pub fn new(
        model: Arc<dyn ModelEndpoint>,
        session: Arc<dyn ToolSession>,
        catalog: Arc<ToolCatalog>,
    ) -> Self {
        let tools = catalog.descriptors();
        Self {
            model,
            session,
            catalog,
            tools,
            max_cycles: Some(Self::DEFAULT_MAX_CYCLES),
        }
    }

    /// Cap the number of model calls per resolution. `None` removes the cap.
    pub fn with_max_cycles(mut self, max: Option<usize>) -> Self {
        self.max_cycles = max;
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Resolve one query. Returns the whole conversation on success; on
    /// failure only the error comes back.
    pub async fn resolve(&self, query: &str) -> Result<Conversation, ResolveError> {
        info!(query, "Processing query");
        let mut conversation = Conversation::from_query(query);
        let mut cycles = 0usize;

        loop {
            if let Some(limit) = self.max_cycles {
                if cycles >= limit {
                    error!(limit, "Failed to process query: cycle limit reached");
                    return Err(ResolveError::CycleLimitExceeded(limit));
                }
            }
            cycles += 1;

            match self.step(conversation).await {
                Ok(Step::Done(done)) => {
                    info!(cycles, messages = done.len(), "Query resolved");
                    return Ok(done);
                }
                Ok(Step::Continue(next)) => conversation = next,
                Err(e) => {
                    error!(error = %e, cycles, "Failed to process query");
                    return Err(e);
                }
            }
        }
    }

    /// One AwaitingModel → Branching → (Terminal | ExecutingTools) transition.
    pub async fn step(&self, mut conversation: Conversation) -> Result<Step, ResolveError> {
        debug!(state = ?ResolverState::AwaitingModel, messages = conversation.len());
        let response = self.call_model(&conversation).await?;

        debug!(state = ?ResolverState::Branching, blocks = response.content.len());
        if response.content.is_empty() {
            return Err(ResolveError::EmptyResponse);
        }

        if is_terminal(&response) {
            let text = match response.content.into_iter().next() {
                Some(ContentBlock::Text { text }) => text,
                _ => unreachable!("is_terminal guarantees a single text block"),
            };
            conversation.push(Message::assistant_text(text));
            debug!(state = ?ResolverState::Terminal);
            return Ok(Step::Done(conversation));
        }

        conversation.push(Message::assistant_blocks(response.content.clone()));
        let conversation = self.execute_tools(conversation, response.content).await?;
        Ok(Step::Continue(conversation))
    }

    async fn call_model(&self, conversation: &Conversation) -> Result<ModelResponse, ResolveError> {
        match self.model.complete(conversation.messages(), &self.tools).await {
            Ok(response) => {
                info!(
                    provider = self.model.provider_name(),
                    blocks = response.content.len(),
                    invocations = response.invocation_count(),
                    stop_reason = ?response.stop_reason,
                    "LLM response"
                );
                Ok(response)
            }
            Err(e) => {
                error!(provider = self.model.provider_name(), error = %e, "Failed to call LLM");
                Err(ResolveError::ModelCall(e))
            }
        }
    }

    async fn execute_tools(
        &self,
        mut conversation: Conversation,
        blocks: Vec<ContentBlock>,
    ) -> Result<Conversation, ResolveError> {
        debug!(state = ?ResolverState::ExecutingTools, blocks = blocks.len());

        for block in blocks {
            match block {
                ContentBlock::Text { text } => {
                    conversation.push(Message::assistant_text(text));
                }
                ContentBlock::ToolInvocation { id, name, arguments } => {
                    info!(tool = %name, id = %id, args = %arguments, "Invoking tool");
                    let output = match self.session.call_tool(&name, arguments).await {
                        Ok(output) => output,
                        Err(SessionError::Closed) => {
                            error!(tool = %name, "Failed to call tool: session is closed");
                            return Err(ResolveError::NotConnected);
                        }
                        Err(source) => {
                            error!(tool = %name, error = %source, "Failed to call tool");
                            return Err(ResolveError::ToolInvocation { tool: name, source });
                        }
                    };
                    info!(tool = %name, is_error = output.is_error, payload = %output.payload, "Tool response");
                    conversation.push(Message::tool_result(id, name, output.payload, output.is_error));
                }
                ContentBlock::ToolResult { tool_use_id, .. } => {
                    debug!(tool_use_id = %tool_use_id, "Ignoring tool_result block in model response");
                }
            }
        }

        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{MessageContent, Role};
    use crate::testing::{descriptor, FakeToolSession, ScriptedModel};
    use serde_json::json;

    fn setup(model: ScriptedModel, session: FakeToolSession) -> (QueryResolver, Arc<ScriptedModel>, Arc<FakeToolSession>) {
        let model = Arc::new(model);
        let session = Arc::new(session);
        let catalog = Arc::new(ToolCatalog::from_descriptors(vec![descriptor("list_files")]));
        let resolver = QueryResolver::new(
            model.clone() as Arc<dyn ModelEndpoint>,
            session.clone() as Arc<dyn ToolSession>,
            catalog,
        );
        (resolver, model, session)
    }

    #[test]
    fn test_terminal_predicate() {
        assert!(is_terminal(&ModelResponse::new(vec![ContentBlock::text("4")])));
        assert!(!is_terminal(&ModelResponse::new(vec![])));
        assert!(!is_terminal(&ModelResponse::new(vec![ContentBlock::invocation("t1", "x", json!({}))])));
        assert!(!is_terminal(&ModelResponse::new(vec![
            ContentBlock::text("a"),
            ContentBlock::text("b"),
        ])));
    }

    #[tokio::test]
    async fn test_simple_text_response() {
        let (resolver, model, session) = setup(ScriptedModel::new().then_text("4"), FakeToolSession::new());

        let conv = resolver.resolve("what is 2+2").await.unwrap();

        assert_eq!(
            conv.messages(),
            &[Message::user("what is 2+2"), Message::assistant_text("4")]
        );
        assert_eq!(model.call_count(), 1);
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_sent_with_every_call() {
        let (resolver, model, _session) = setup(
            ScriptedModel::new()
                .then_blocks(vec![ContentBlock::invocation("t1", "list_files", json!({}))])
                .then_text("done"),
            FakeToolSession::new().with_output("list_files", json!(["a.txt"])),
        );

        resolver.resolve("list").await.unwrap();

        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        for call in &calls {
            assert_eq!(call.tools, vec!["list_files".to_string()]);
        }
        // Second call sees user, assistant(tool call), tool(result).
        assert_eq!(calls[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn test_tool_call_and_response() {
        let (resolver, model, session) = setup(
            ScriptedModel::new()
                .then_blocks(vec![ContentBlock::invocation("call_1", "list_files", json!({}))])
                .then_text("You have 1 file: a.txt"),
            FakeToolSession::new().with_output("list_files", json!(["a.txt"])),
        );

        let conv = resolver.resolve("list my files").await.unwrap();

        let roles: Vec<Role> = conv.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
        assert_eq!(
            conv.messages()[2],
            Message::tool_result("call_1", "list_files", json!(["a.txt"]), false)
        );
        assert_eq!(
            conv.messages()[3].content,
            MessageContent::Text("You have 1 file: a.txt".to_string())
        );
        assert_eq!(model.call_count(), 2);
        assert_eq!(session.calls(), vec![("list_files".to_string(), json!({}))]);
    }

    #[tokio::test]
    async fn test_text_blocks_are_echoed_as_assistant_messages() {
        let (resolver, _model, _session) = setup(
            ScriptedModel::new()
                .then_blocks(vec![
                    ContentBlock::text("Let me look."),
                    ContentBlock::invocation("t1", "list_files", json!({"path": "/"})),
                    ContentBlock::text("Checking results next."),
                ])
                .then_text("Done"),
            FakeToolSession::new().with_output("list_files", json!([])),
        );

        let conv = resolver.resolve("look").await.unwrap();
        let msgs = conv.messages();

        assert_eq!(msgs.len(), 6);
        assert_eq!(msgs[1].blocks().len(), 3);
        assert_eq!(msgs[2], Message::assistant_text("Let me look."));
        assert_eq!(msgs[3].role, Role::Tool);
        assert_eq!(msgs[4], Message::assistant_text("Checking results next."));
        assert_eq!(msgs[5], Message::assistant_text("Done"));
    }

    #[tokio::test]
    async fn test_multi_text_response_is_not_terminal() {
        let (resolver, model, session) = setup(
            ScriptedModel::new()
                .then_blocks(vec![ContentBlock::text("part one"), ContentBlock::text("part two")])
                .then_text("final"),
            FakeToolSession::new(),
        );

        let conv = resolver.resolve("talk").await.unwrap();

        // user, assistant(blocks), assistant(part one), assistant(part two), assistant(final)
        assert_eq!(conv.len(), 5);
        assert_eq!(model.call_count(), 2);
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tool_failure_aborts() {
        let (resolver, model, _session) = setup(
            ScriptedModel::new()
                .then_blocks(vec![ContentBlock::invocation("t1", "list_files", json!({}))])
                .then_text("never reached"),
            FakeToolSession::new().with_failure(
                "list_files",
                SessionError::Remote { code: -32000, message: "disk on fire".to_string() },
            ),
        );

        let err = resolver.resolve("list").await.unwrap_err();

        match err {
            ResolveError::ToolInvocation { tool, source } => {
                assert_eq!(tool, "list_files");
                assert!(source.to_string().contains("disk on fire"));
            }
            other => panic!("expected ToolInvocation, got {:?}", other),
        }
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_invocations() {
        let (resolver, _model, session) = setup(
            ScriptedModel::new().then_blocks(vec![
                ContentBlock::invocation("t1", "broken", json!({})),
                ContentBlock::invocation("t2", "list_files", json!({})),
            ]),
            FakeToolSession::new()
                .with_failure("broken", SessionError::Transport("pipe closed".to_string()))
                .with_output("list_files", json!([])),
        );

        assert!(resolver.resolve("go").await.is_err());
        assert_eq!(session.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_session_maps_to_not_connected() {
        let (resolver, _model, _session) = setup(
            ScriptedModel::new().then_blocks(vec![ContentBlock::invocation("t1", "list_files", json!({}))]),
            FakeToolSession::new().with_failure("list_files", SessionError::Closed),
        );

        let err = resolver.resolve("list").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotConnected));
    }

    #[tokio::test]
    async fn test_model_failure_aborts() {
        let (resolver, _model, session) = setup(ScriptedModel::new().then_fail("overloaded"), FakeToolSession::new());

        let err = resolver.resolve("hi").await.unwrap_err();
        assert!(matches!(err, ResolveError::ModelCall(_)));
        assert!(err.to_string().contains("overloaded"));
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_response_is_an_error() {
        let (resolver, _model, _session) = setup(ScriptedModel::new().then_blocks(vec![]), FakeToolSession::new());
        let err = resolver.resolve("hi").await.unwrap_err();
        assert!(matches!(err, ResolveError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_cycle_limit() {
        let mut model = ScriptedModel::new();
        for i in 0..5 {
            model = model.then_blocks(vec![ContentBlock::invocation(format!("t{i}"), "list_files", json!({}))]);
        }
        let (resolver, model, session) = setup(model, FakeToolSession::new().with_output("list_files", json!([])));
        let resolver = resolver.with_max_cycles(Some(3));

        let err = resolver.resolve("loop forever").await.unwrap_err();

        assert!(matches!(err, ResolveError::CycleLimitExceeded(3)));
        assert_eq!(model.call_count(), 3);
        assert_eq!(session.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_step_threads_conversation() {
        let (resolver, _model, _session) = setup(
            ScriptedModel::new().then_blocks(vec![ContentBlock::invocation("t1", "list_files", json!({}))]),
            FakeToolSession::new().with_output("list_files", json!(["a.txt"])),
        );

        let start = Conversation::from_query("list");
        match resolver.step(start).await.unwrap() {
            Step::Continue(conv) => {
                assert_eq!(conv.len(), 3);
                assert!(conv.validate().is_ok());
            }
            Step::Done(_) => panic!("tool invocation must not terminate"),
        }
    }

    #[tokio::test]
    async fn test_tool_error_flag_is_preserved() {
        let (resolver, _model, _session) = setup(
            ScriptedModel::new()
                .then_blocks(vec![ContentBlock::invocation("t1", "list_files", json!({"path": "/root"}))])
                .then_text("No access."),
            FakeToolSession::new().with_error_output("list_files", json!("permission denied")),
        );

        let conv = resolver.resolve("list root").await.unwrap();
        match &conv.messages()[2].blocks()[0] {
            ContentBlock::ToolResult { is_error, payload, .. } => {
                assert!(*is_error);
                assert_eq!(payload, &json!("permission denied"));
            }
            other => panic!("expected ToolResult, got {:?}", other),
        }
    }
}

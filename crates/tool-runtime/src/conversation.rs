use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// One unit of a model response or message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text from the user or the assistant.
    Text { text: String },
    /// The model asking for a tool to be run.
    ToolInvocation {
        /// Unique ID for this invocation (used to match results)
        id: String,
        name: String,
        arguments: Value,
    },
    /// Outcome of a tool run, sent back to the model.
    ToolResult {
        /// Must match a ToolInvocation id earlier in the conversation
        tool_use_id: String,
        tool_name: String,
        /// Raw result content as returned by the tool session
        payload: Value,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn invocation(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        ContentBlock::ToolInvocation {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Message body: either a bare string or an ordered block sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    pub fn tool_result(
        tool_use_id: impl Into<String>,
        tool_name: impl Into<String>,
        payload: Value,
        is_error: bool,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: MessageContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id: tool_use_id.into(),
                tool_name: tool_name.into(),
                payload,
                is_error,
            }]),
        }
    }

    /// Blocks carried by this message; a plain-text body yields none.
    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            MessageContent::Blocks(blocks) => blocks,
            MessageContent::Text(_) => &[],
        }
    }
}

/// Ordered, append-only log of one resolution.
///
/// Owned by the resolver for the duration of a query and threaded through
/// each transition by value. Serializes as a plain JSON array of messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a resolution: exactly one user message holding the raw query.
    pub fn from_query(query: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(query)],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// IDs of every tool invocation requested so far, in order.
    pub fn tool_invocation_ids(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .flat_map(|m| m.blocks())
            .filter_map(|b| match b {
                ContentBlock::ToolInvocation { id, .. } => Some(id.as_str()),
                _ => None,
            })
    }

    /// Check the structural invariants: the log opens with a plain-text user
    /// message and every tool result answers an invocation made earlier.
    pub fn validate(&self) -> Result<(), ConversationError> {
        match self.messages.first() {
            Some(Message {
                role: Role::User,
                content: MessageContent::Text(_),
            }) => {}
            _ => return Err(ConversationError::BadOpening),
        }

        let mut seen: Vec<&str> = Vec::new();
        for (index, message) in self.messages.iter().enumerate() {
            for block in message.blocks() {
                match block {
                    ContentBlock::ToolInvocation { id, .. } => seen.push(id),
                    ContentBlock::ToolResult { tool_use_id, .. } => {
                        if !seen.contains(&tool_use_id.as_str()) {
                            return Err(ConversationError::OrphanToolResult {
                                index,
                                tool_use_id: tool_use_id.clone(),
                            });
                        }
                    }
                    ContentBlock::Text { .. } => {}
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("conversation must start with a plain-text user message")]
    BadOpening,
    #[error("message {index} carries a result for unknown invocation '{tool_use_id}'")]
    OrphanToolResult { index: usize, tool_use_id: String },
}

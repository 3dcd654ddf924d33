//! Translation between relay conversation types and the Anthropic Messages API.

use serde_json::{json, Value};
use tracing::trace;

use relay_tool_runtime::{
    ContentBlock, LlmError, Message, MessageContent, ModelResponse, Role, StopReason,
    ToolDescriptor,
};

/// Translate a [`ToolDescriptor`] into the Claude API tool format.
pub(crate) fn tool_descriptor_to_claude(tool: &ToolDescriptor) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.parameter_schema,
    })
}

fn api_role(role: Role) -> &'static str {
    match role {
        Role::User | Role::Tool => "user",
        Role::Assistant => "assistant",
    }
}

/// Translate a single [`ContentBlock`] into a Claude content block.
pub(crate) fn block_to_claude(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text { text } => json!({"type": "text", "text": text}),
        ContentBlock::ToolInvocation { id, name, arguments } => json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": arguments,
        }),
        ContentBlock::ToolResult {
            tool_use_id,
            payload,
            is_error,
            ..
        } => {
            let mut block = json!({
                "type": "tool_result",
                "tool_use_id": tool_use_id,
                "content": tool_result_content(payload),
            });
            if *is_error {
                block["is_error"] = json!(true);
            }
            block
        }
    }
}

/// `tool_result.content` accepts a string or a list of text/image blocks.
/// MCP payloads are usually such a list; anything else is sent as JSON text.
pub(crate) fn tool_result_content(payload: &Value) -> Value {
    match payload {
        Value::String(s) => Value::String(s.clone()),
        Value::Array(items) if !items.is_empty() && items.iter().all(is_claude_result_block) => {
            payload.clone()
        }
        other => Value::String(other.to_string()),
    }
}

fn is_claude_result_block(item: &Value) -> bool {
    matches!(item["type"].as_str(), Some("text") | Some("image"))
}

/// Translate the conversation into Claude API messages.
///
/// The API wants strictly alternating roles and the results for a tool_use
/// turn in the very next user message, so consecutive messages that map to
/// the same API role are merged. Assistant text messages that repeat a text
/// block of the preceding assistant turn are skipped; the block already
/// carries that text.
pub(crate) fn messages_to_claude(messages: &[Message]) -> Vec<Value> {
    let mut out: Vec<(&'static str, Value)> = Vec::new();
    let mut turn_texts: Vec<&str> = Vec::new();

    for msg in messages {
        match (&msg.role, &msg.content) {
            (Role::User, MessageContent::Text(_)) => turn_texts.clear(),
            (Role::Assistant, MessageContent::Blocks(blocks)) => {
                turn_texts = blocks.iter().filter_map(ContentBlock::as_text).collect();
            }
            (Role::Assistant, MessageContent::Text(text)) if turn_texts.contains(&text.as_str()) => {
                trace!(text = %text, "skipping narrative echo of an earlier text block");
                continue;
            }
            _ => {}
        }

        let role = api_role(msg.role);
        let content = match &msg.content {
            MessageContent::Text(text) => Value::String(text.clone()),
            MessageContent::Blocks(blocks) => {
                Value::Array(blocks.iter().map(block_to_claude).collect())
            }
        };

        match out.last_mut() {
            Some((last_role, last_content)) if *last_role == role => {
                let mut merged = into_blocks(std::mem::take(last_content));
                merged.extend(into_blocks(content));
                *last_content = Value::Array(merged);
            }
            _ => out.push((role, content)),
        }
    }

    out.into_iter()
        .map(|(role, content)| json!({"role": role, "content": content}))
        .collect()
}

fn into_blocks(content: Value) -> Vec<Value> {
    match content {
        Value::Array(blocks) => blocks,
        Value::String(text) => vec![json!({"type": "text", "text": text})],
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

pub(crate) fn parse_stop_reason(raw: Option<&str>) -> Option<StopReason> {
    match raw? {
        "end_turn" => Some(StopReason::EndTurn),
        "tool_use" => Some(StopReason::ToolUse),
        "max_tokens" => Some(StopReason::MaxTokens),
        "stop_sequence" => Some(StopReason::StopSequence),
        other => {
            trace!(stop_reason = other, "unknown stop_reason");
            None
        }
    }
}

/// Parse a non-streaming Messages API response body.
pub(crate) fn parse_response(body: &Value) -> Result<ModelResponse, LlmError> {
    let raw_blocks = body["content"]
        .as_array()
        .ok_or_else(|| LlmError::InvalidResponse("missing content array".into()))?;

    let mut content = Vec::with_capacity(raw_blocks.len());
    for block in raw_blocks {
        match block["type"].as_str() {
            Some("text") => {
                let text = block["text"]
                    .as_str()
                    .ok_or_else(|| LlmError::InvalidResponse("text block without text".into()))?;
                content.push(ContentBlock::text(text));
            }
            Some("tool_use") => {
                let id = block["id"]
                    .as_str()
                    .ok_or_else(|| LlmError::InvalidResponse("tool_use block without id".into()))?;
                let name = block["name"]
                    .as_str()
                    .ok_or_else(|| LlmError::InvalidResponse("tool_use block without name".into()))?;
                let input = match &block["input"] {
                    Value::Null => json!({}),
                    input => input.clone(),
                };
                content.push(ContentBlock::invocation(id, name, input));
            }
            other => trace!(block_type = ?other, "ignoring content block"),
        }
    }

    let mut response = ModelResponse::new(content);
    if let Some(reason) = parse_stop_reason(body["stop_reason"].as_str()) {
        response = response.with_stop_reason(reason);
    }
    Ok(response)
}

//! Conversation types: messages, tool calls, tool results, and responses.
//!
//! Every type here is immutable once built. Messages are appended to the
//! orchestrator's conversation buffer and never edited in place;
//! [`ChatResponse`] exposes read-only accessors only.
//!
//! All types serialize to a plain JSON object for logging and test
//! assertions. Unset optional fields are omitted rather than written as
//! `null`:
//!
//! ```rust
//! use llm_conductor::ChatMessage;
//!
//! let map = ChatMessage::user("hello").to_map();
//! assert_eq!(map["role"], "user");
//! assert_eq!(map["content"], "hello");
//! assert!(!map.contains_key("tool_calls"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Serializes `value` into a JSON object, or an empty map if it does not
/// serialize to one.
pub(crate) fn to_json_map<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions that frame the conversation.
    System,
    /// Input from the caller.
    User,
    /// Output from the model.
    Assistant,
    /// The result of a tool invocation.
    Tool,
}

impl ChatRole {
    /// The lowercase wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A single entry in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: ChatRole,
    /// Message text. May be empty, e.g. on an assistant turn that only
    /// requested tools.
    pub content: String,
    /// Tool calls the model requested on this turn. Only set on assistant
    /// messages that triggered tool use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// The id of the tool call this message answers. Only set on
    /// tool-result messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(ChatRole::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(ChatRole::User, content)
    }

    /// Creates an assistant message with plain text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(ChatRole::Assistant, content)
    }

    /// Creates the assistant turn that requested `calls`.
    pub(crate) fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    /// Creates the tool message carrying `result`, correlated to the call
    /// that produced it.
    ///
    /// Only the orchestrator builds these, immediately after appending the
    /// assistant turn holding the matching call, so a tool result can never
    /// be orphaned.
    pub(crate) fn tool_result(result: &ToolResult) -> Result<Self, serde_json::Error> {
        Ok(Self {
            role: ChatRole::Tool,
            content: serde_json::to_string(&result.content)?,
            tool_calls: None,
            tool_call_id: Some(result.tool_call_id.clone()),
        })
    }

    /// Returns the message as a plain JSON object.
    pub fn to_map(&self) -> Map<String, Value> {
        to_json_map(self)
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Backend-assigned identifier, echoed back on the result.
    pub id: String,
    /// The name of the tool to run.
    pub name: String,
    /// Arguments for the tool.
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Creates a tool call. Backend adapters use this when parsing a
    /// response.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Returns the call as a plain JSON object.
    pub fn to_map(&self) -> Map<String, Value> {
        to_json_map(self)
    }
}

/// The outcome of running one [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The id of the originating [`ToolCall`].
    pub tool_call_id: String,
    /// The name of the tool that ran.
    pub tool_name: String,
    /// The tool's result object.
    pub content: Map<String, Value>,
}

impl ToolResult {
    /// Returns the result as a plain JSON object.
    pub fn to_map(&self) -> Map<String, Value> {
        to_json_map(self)
    }
}

/// A normalized backend response.
///
/// Built by backend adapters via [`ChatResponse::new`]; read-only
/// afterwards. A response that carries tool calls has no guaranteed
/// meaningful text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    text: String,
    raw: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
}

impl ChatResponse {
    /// Creates a response. An empty `tool_calls` list is stored as "no
    /// tool calls", so [`has_tool_calls`](Self::has_tool_calls) is exact.
    pub fn new(text: impl Into<String>, raw: Value, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            text: text.into(),
            raw,
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        }
    }

    /// Creates a text-only response with a `null` raw payload.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(text, Value::Null, Vec::new())
    }

    /// The extracted text content.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The unmodified backend payload, for diagnostics.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The tool calls the model requested, in order. Empty when none.
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    /// Whether the model requested at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.is_some()
    }

    /// Returns the response as a plain JSON object.
    pub fn to_map(&self) -> Map<String, Value> {
        to_json_map(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, ChatRole::System);
        assert_eq!(ChatMessage::user("u").role, ChatRole::User);
        assert_eq!(ChatMessage::assistant("a").role, ChatRole::Assistant);
        assert!(ChatMessage::user("u").tool_calls.is_none());
        assert!(ChatMessage::user("u").tool_call_id.is_none());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ChatRole::Assistant).unwrap(), json!("assistant"));
        assert_eq!(ChatRole::Tool.as_str(), "tool");
    }

    #[test]
    fn test_tool_result_message_encodes_content() {
        let result = ToolResult {
            tool_call_id: "call_1".into(),
            tool_name: "weather".into(),
            content: args(json!({"temp": 21})),
        };
        let msg = ChatMessage::tool_result(&result).unwrap();
        assert_eq!(msg.role, ChatRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        let decoded: Value = serde_json::from_str(&msg.content).unwrap();
        assert_eq!(decoded, json!({"temp": 21}));
    }

    #[test]
    fn test_assistant_tool_calls_map() {
        let call = ToolCall::new("c1", "search", args(json!({"q": "rust"})));
        let msg = ChatMessage::assistant_tool_calls("", vec![call]);
        let map = msg.to_map();
        assert_eq!(map["role"], "assistant");
        assert_eq!(map["tool_calls"][0]["name"], "search");
        assert_eq!(map["tool_calls"][0]["arguments"]["q"], "rust");
        assert!(!map.contains_key("tool_call_id"));
    }

    #[test]
    fn test_response_empty_tool_calls_normalize_to_none() {
        let resp = ChatResponse::new("hi", json!({"id": "r1"}), Vec::new());
        assert!(!resp.has_tool_calls());
        assert!(resp.tool_calls().is_empty());
        assert!(!resp.to_map().contains_key("tool_calls"));
    }

    #[test]
    fn test_response_accessors() {
        let call = ToolCall::new("c1", "lookup", Map::new());
        let resp = ChatResponse::new("", json!({"vendor": "x"}), vec![call.clone()]);
        assert!(resp.has_tool_calls());
        assert_eq!(resp.tool_calls(), &[call]);
        assert_eq!(resp.raw()["vendor"], "x");
        assert_eq!(resp.text(), "");
    }

    #[test]
    fn test_tool_call_and_result_maps() {
        let call = ToolCall::new("c9", "add", args(json!({"a": 1})));
        let map = call.to_map();
        assert_eq!(map["id"], "c9");
        assert_eq!(map["name"], "add");

        let result = ToolResult {
            tool_call_id: "c9".into(),
            tool_name: "add".into(),
            content: args(json!({"sum": 3})),
        };
        assert_eq!(result.to_map()["content"]["sum"], 3);
    }
}

//! Pre-built helpers for testing code that uses `llm-conductor` types.
//!
//! Available when the `test-utils` feature is enabled, allowing
//! downstream crates to reuse these utilities in their own test
//! suites. Also compiled during `#[cfg(test)]` for this crate's
//! own tests. Provides canned responses, tool-call shorthands, a quick
//! [`MockProvider`] factory, and a [`RecordingSleeper`] that makes
//! backoff instantaneous.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Map, Value, json};

use crate::chat::{ChatResponse, ToolCall};
use crate::mock::MockProvider;
use crate::retry::Sleeper;

/// Builds a text-only [`ChatResponse`] with a small raw payload.
pub fn text_response(text: &str) -> ChatResponse {
    ChatResponse::new(text, json!({"mock": true, "text": text}), Vec::new())
}

/// Builds a [`ChatResponse`] requesting the given tool calls.
pub fn tool_call_response(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse::new("", json!({"mock": true}), calls)
}

/// Builds a [`ToolCall`] from a JSON object literal.
///
/// Non-object `arguments` become an empty map.
pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall::new(id, name, json_args(arguments))
}

/// Unwraps a JSON object literal into a map; anything else becomes an
/// empty map.
pub fn json_args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Creates an empty [`MockProvider`] named `name`.
pub fn mock_for(name: &str) -> MockProvider {
    MockProvider::new(name)
}

/// A [`Sleeper`] that records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Every delay requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.delays.lock().unwrap().push(duration);
        Box::pin(std::future::ready(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_response() {
        let r = text_response("hello");
        assert_eq!(r.text(), "hello");
        assert!(!r.has_tool_calls());
        assert_eq!(r.raw()["text"], "hello");
    }

    #[test]
    fn test_tool_call_response() {
        let r = tool_call_response(vec![tool_call("tc_1", "search", json!({"q": "rust"}))]);
        assert!(r.has_tool_calls());
        assert_eq!(r.tool_calls()[0].arguments["q"], "rust");
    }

    #[test]
    fn test_json_args_non_object() {
        assert!(json_args(json!([1, 2])).is_empty());
        assert_eq!(json_args(json!({"a": 1})).len(), 1);
    }

    #[tokio::test]
    async fn test_recording_sleeper() {
        let sleeper = RecordingSleeper::default();
        sleeper.sleep(Duration::from_secs(3600)).await;
        sleeper.sleep(Duration::from_millis(5)).await;
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_secs(3600), Duration::from_millis(5)]
        );
    }

    #[test]
    fn test_mock_for_name() {
        use crate::Provider;
        assert_eq!(Provider::name(&mock_for("x")), "x");
    }
}

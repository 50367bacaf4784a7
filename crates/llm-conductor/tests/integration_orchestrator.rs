//! End-to-end orchestration through the public API only.

use std::sync::Arc;
use std::time::Duration;

use llm_conductor::config::{BackendConfig, OrchestratorConfig};
use llm_conductor::mock::{MockError, MockProvider};
use llm_conductor::registry::{BackendFactory, BackendRegistry};
use llm_conductor::test_helpers::{
    RecordingSleeper, mock_for, text_response, tool_call, tool_call_response,
};
use llm_conductor::tool::{ToolError, tool_fn};
use llm_conductor::{
    ChatRole, DynProvider, JsonSchema, LlmError, Orchestrator, Reply, ToolDefinition, ToolHandler,
};
use serde::Deserialize;
use serde_json::{Value, json};

fn convert_tool() -> Arc<dyn ToolHandler> {
    Arc::new(tool_fn(
        ToolDefinition {
            name: "convert".into(),
            description: "Convert Celsius to Fahrenheit".into(),
            input_schema: JsonSchema::new(json!({
                "type": "object",
                "properties": {"celsius": {"type": "number"}},
                "required": ["celsius"]
            })),
        },
        |args| async move {
            let celsius = args
                .get("celsius")
                .and_then(Value::as_f64)
                .ok_or_else(|| ToolError::new("missing celsius"))?;
            Ok(json!({"fahrenheit": celsius * 9.0 / 5.0 + 32.0}))
        },
    ))
}

fn forecast_schema() -> JsonSchema {
    JsonSchema::new(json!({
        "type": "object",
        "required": ["city", "fahrenheit", "summary"],
        "properties": {
            "city": {"type": "string", "minLength": 1},
            "fahrenheit": {"type": "number"},
            "summary": {"type": "string", "enum": ["cold", "mild", "hot"]}
        }
    }))
}

#[derive(Debug, Deserialize, PartialEq)]
struct Forecast {
    city: String,
    fahrenheit: f64,
    summary: String,
}

// ── Full pipeline ───────────────────────────────────────────────────

#[tokio::test]
async fn test_retry_tools_and_repair_in_one_send() {
    let backend = Arc::new(mock_for("primary"));
    backend
        .queue_error(MockError::backend(429, "rate limited"))
        .queue_response(tool_call_response(vec![tool_call(
            "call_1",
            "convert",
            json!({"celsius": 20}),
        )]))
        .queue_response(text_response(
            r#"{"city": "Oslo", "fahrenheit": 68, "summary": "pleasant"}"#,
        ))
        .queue_response(text_response(
            r#"{"city": "Oslo", "fahrenheit": 68, "summary": "mild"}"#,
        ));
    let sleeper = Arc::new(RecordingSleeper::default());

    let mut orchestrator = Orchestrator::new(backend.clone())
        .model("test-model")
        .unwrap()
        .system("Answer with a forecast object.")
        .user("What is 20C in Oslo?")
        .tools(vec![convert_tool()])
        .unwrap()
        .schema(forecast_schema())
        .repair_attempts(1)
        .max_retries(1)
        .sleeper(sleeper.clone());

    let reply = orchestrator.send().await.unwrap();
    let structured = reply.into_structured().unwrap();
    let forecast: Forecast = structured.deserialize().unwrap();

    assert_eq!(
        forecast,
        Forecast {
            city: "Oslo".into(),
            fahrenheit: 68.0,
            summary: "mild".into(),
        }
    );
    assert_eq!(backend.call_count(), 4);
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(500)]);

    let roles: Vec<ChatRole> = orchestrator.messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            ChatRole::System,
            ChatRole::User,
            ChatRole::Assistant,
            ChatRole::Tool,
            ChatRole::Assistant,
            ChatRole::User,
        ]
    );
    let tool_message = &orchestrator.messages()[3];
    let content: Value = serde_json::from_str(&tool_message.content).unwrap();
    assert_eq!(content["fahrenheit"], 68.0);
}

#[tokio::test]
async fn test_every_request_is_rebuilt_from_the_conversation() {
    let backend = Arc::new(mock_for("primary"));
    backend
        .queue_response(tool_call_response(vec![tool_call(
            "c1",
            "convert",
            json!({"celsius": 0}),
        )]))
        .queue_response(text_response("32F"));

    let mut orchestrator = Orchestrator::new(backend.clone())
        .model("test-model")
        .unwrap()
        .user("0C?")
        .tools(vec![convert_tool()])
        .unwrap()
        .max_retries(0);
    orchestrator.send().await.unwrap();

    let calls = backend.recorded_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].messages().len(), 1);
    assert_eq!(calls[1].messages().len(), 3);
    assert_eq!(calls[0].model(), calls[1].model());
    assert_eq!(calls[1].to_map()["tools"][0]["name"], "convert");
}

#[tokio::test]
async fn test_tool_argument_error_surfaces_as_tool_execution() {
    let backend = Arc::new(mock_for("primary"));
    backend.queue_response(tool_call_response(vec![tool_call(
        "c1",
        "convert",
        json!({"kelvin": 10}),
    )]));

    let mut orchestrator = Orchestrator::new(backend.clone())
        .model("test-model")
        .unwrap()
        .user("convert")
        .tools(vec![convert_tool()])
        .unwrap();
    let err = orchestrator.send().await.unwrap_err();

    assert!(matches!(err, LlmError::ToolExecution { ref tool_name, .. } if tool_name == "convert"));
    assert!(err.to_string().contains("missing celsius"));
}

// ── Failover ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_exhaustion_chains_last_backend_error() {
    use std::error::Error;

    let primary = Arc::new(mock_for("primary"));
    primary.always_fail(MockError::backend(503, "unavailable"));
    let secondary = Arc::new(mock_for("secondary"));
    secondary.always_fail(MockError::backend(403, "forbidden"));

    let mut orchestrator = Orchestrator::new(primary.clone())
        .model("test-model")
        .unwrap()
        .user("hi")
        .max_retries(2)
        .fallbacks(vec![secondary.clone()])
        .sleeper(Arc::new(RecordingSleeper::default()));
    let err = orchestrator.send().await.unwrap_err();

    assert!(err.to_string().contains("primary, secondary"));
    let source = err.source().unwrap();
    assert!(source.to_string().contains("forbidden"));
    assert_eq!(primary.call_count(), 3);
    assert_eq!(secondary.call_count(), 1);
}

// ── Configuration ───────────────────────────────────────────────────

struct StaticFactory;

impl BackendFactory for StaticFactory {
    fn name(&self) -> &str {
        "static"
    }

    fn build(&self, config: &BackendConfig) -> Result<Box<dyn DynProvider>, LlmError> {
        let answer = config
            .get_extra_str("answer")
            .ok_or_else(|| LlmError::Configuration("static backend needs an answer".into()))?;
        let mock = MockProvider::new("static");
        mock.always_respond(text_response(answer));
        Ok(Box::new(mock))
    }
}

#[tokio::test]
async fn test_configured_fallback_answers_structured_request() {
    let primary = Arc::new(mock_for("primary"));
    primary.always_fail(MockError::backend(400, "unsupported schema"));

    let mut registry = BackendRegistry::new();
    registry.register(Box::new(StaticFactory));

    let config = OrchestratorConfig::from_value(json!({
        "model": "primary-model",
        "max_retries": 0,
        "fallbacks": [{
            "backend": "static",
            "model": "any",
            "extra": {"answer": "{\"city\": \"Rome\", \"fahrenheit\": 90, \"summary\": \"hot\"}"}
        }]
    }))
    .unwrap();

    let mut orchestrator = Orchestrator::from_config(primary.clone(), &config, &registry)
        .unwrap()
        .user("Forecast for Rome")
        .schema(forecast_schema());
    let reply = orchestrator.send().await.unwrap();

    match reply {
        Reply::Structured(structured) => {
            assert_eq!(structured.get("summary"), Some(&json!("hot")));
        }
        Reply::Text(text) => panic!("expected structured reply, got {text:?}"),
    }
    assert_eq!(primary.call_count(), 1);
}

#[test]
fn test_configuration_errors_surface_immediately() {
    let registry = BackendRegistry::new();
    let config = OrchestratorConfig {
        fallbacks: vec![BackendConfig::new("static", "m")],
        ..Default::default()
    };
    let err = Orchestrator::from_config(Arc::new(mock_for("p")), &config, &registry).unwrap_err();
    assert!(matches!(err, LlmError::Configuration(_)));

    assert!(OrchestratorConfig::from_value(json!({"repair_attempts": -2})).is_err());
}

//! Structured-output repair loop.

use serde_json::Value;

use crate::chat::{ChatMessage, ChatResponse};
use crate::error::LlmError;
use crate::provider::{DynProvider, JsonSchema};
use crate::structured::{OutputCheck, StructuredResponse, check_output, repair_feedback};

use super::Orchestrator;

impl Orchestrator {
    /// Checks `response` against `schema`, feeding problems back to the
    /// model until it complies or the repair budget is spent.
    ///
    /// Repair re-queries go straight to the backend; tool calls in a
    /// repaired response are not executed.
    pub(super) async fn repair(
        &mut self,
        backend: &dyn DynProvider,
        mut response: ChatResponse,
        schema: &JsonSchema,
    ) -> Result<StructuredResponse, LlmError> {
        let mut remaining = self.repair_attempts;

        loop {
            let problem = match check_output(response.text(), schema) {
                OutputCheck::Valid(value) => return Ok(StructuredResponse::new(response, value)),
                OutputCheck::Invalid(problem) => problem,
            };

            if remaining == 0 {
                let request = self.request()?;
                return Err(LlmError::SchemaValidation {
                    message: problem.message,
                    violations: problem.violations,
                    raw: response.text().to_owned(),
                    request: Value::Object(request.to_map()),
                });
            }
            remaining -= 1;

            tracing::warn!(
                remaining,
                violations = problem.violations.len(),
                problem = %problem.message,
                "structured output rejected, requesting repair"
            );
            self.messages.push(ChatMessage::assistant(response.text()));
            self.messages.push(ChatMessage::user(repair_feedback(&problem)));
            response = self.call(backend).await?;
        }
    }
}

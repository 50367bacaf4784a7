//! Tool execution loop.

use crate::chat::{ChatMessage, ChatResponse};
use crate::error::LlmError;
use crate::provider::DynProvider;

use super::Orchestrator;

impl Orchestrator {
    /// Executes requested tools and re-queries until the model answers
    /// without tool calls, no tools are registered, or the step budget is
    /// spent.
    pub(super) async fn run_tool_loop(
        &mut self,
        backend: &dyn DynProvider,
        mut response: ChatResponse,
    ) -> Result<ChatResponse, LlmError> {
        let budget = self.step_budget();
        let mut steps = 0;

        while response.has_tool_calls() && !self.tools.is_empty() && steps < budget {
            steps += 1;
            tracing::debug!(
                step = steps,
                budget,
                calls = response.tool_calls().len(),
                "executing requested tools"
            );

            let mut tool_messages = Vec::with_capacity(response.tool_calls().len());
            for call in response.tool_calls() {
                let result = self.tools.execute(call).await?;
                let message =
                    ChatMessage::tool_result(&result).map_err(|e| LlmError::ToolExecution {
                        tool_name: result.tool_name.clone(),
                        source: Box::new(e),
                    })?;
                tool_messages.push(message);
            }

            self.messages.push(ChatMessage::assistant_tool_calls(
                response.text(),
                response.tool_calls().to_vec(),
            ));
            self.messages.extend(tool_messages);

            response = self.call(backend).await?;
        }

        if response.has_tool_calls() && !self.tools.is_empty() {
            tracing::warn!(
                budget,
                pending = response.tool_calls().len(),
                "tool step budget exhausted, returning response with pending tool calls"
            );
        }
        Ok(response)
    }
}

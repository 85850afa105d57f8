//! Conversation engine: the tool-invocation loop.

use crate::config::ConversationConfig;
use crate::model::{
    Backend, ContentBlock, ModelError, ModelRequest, ModelResponse, Role, ToolResult, ToolResultContent,
    ToolSpec, ToolUse, Turn, Usage,
};
use crate::tools::{Tool, ToolError, ToolRegistry};
use crate::{Error, Result, transcript};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

/// Where the engine is within a `submit_prompt` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No prompt in flight.
    Idle,
    /// A model request is outstanding.
    AwaitingModel,
    /// A tool request is being resolved and invoked.
    Dispatching,
    /// The last prompt completed with a final answer.
    Done,
}

/// A conversation with a model that may call tools.
///
/// History is append-only: turns are pushed and never edited. `submit_prompt`
/// takes `&mut self`, so at most one prompt is in flight per conversation;
/// share one across tasks behind a lock, or keep one per task.
pub struct Conversation<B> {
    backend: B,
    registry: ToolRegistry,
    tool_specs: Vec<ToolSpec>,
    config: ConversationConfig,
    turns: Vec<Turn>,
    state: EngineState,
    usage: Usage,
}

impl<B: Backend> Conversation<B> {
    /// Start an empty conversation.
    pub fn new(backend: B, registry: ToolRegistry, config: ConversationConfig) -> Self {
        let tool_specs = registry.specs();
        Self {
            backend,
            registry,
            tool_specs,
            config,
            turns: Vec::new(),
            state: EngineState::Idle,
            usage: Usage::default(),
        }
    }

    /// Resume a conversation from a previously persisted transcript.
    ///
    /// The transcript must be well formed: every tool request answered by
    /// exactly one matching result in the following turn.
    pub fn with_history(
        backend: B,
        registry: ToolRegistry,
        config: ConversationConfig,
        turns: Vec<Turn>,
    ) -> Result<Self> {
        transcript::validate(&turns)?;
        let mut conversation = Self::new(backend, registry, config);
        conversation.turns = turns;
        Ok(conversation)
    }

    /// Full turn history, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Token usage accumulated by this engine instance.
    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Send a user prompt and drive tool calls until the model answers.
    ///
    /// Returns the final assistant turn. On failure, every turn appended
    /// before the failure stays in [`turns`](Self::turns) so the caller can
    /// inspect or persist it.
    pub async fn submit_prompt(&mut self, text: impl Into<String>) -> Result<Turn> {
        let result = self.run(text.into()).await;
        match &result {
            Ok(_) => self.transition(EngineState::Done),
            Err(e) => {
                warn!(error = %e, "prompt failed");
                self.transition(EngineState::Idle);
            }
        }
        result
    }

    async fn run(&mut self, text: String) -> Result<Turn> {
        self.turns.push(Turn::user(text));
        let mut rounds = 0usize;

        loop {
            self.transition(EngineState::AwaitingModel);
            let response = self.call_model().await?;
            self.usage += response.usage;

            let turn = response.turn;
            let Some(tool_use) = turn.trailing_tool_use().cloned() else {
                self.turns.push(turn.clone());
                return Ok(turn);
            };
            self.turns.push(turn);

            if let Some(limit) = self.config.max_tool_rounds {
                if rounds >= limit {
                    // Answer the request anyway so the history stays resumable.
                    let message = format!(
                        "tool-dispatch limit of {limit} rounds reached; {} was not run",
                        tool_use.name
                    );
                    self.turns
                        .push(Turn::tool_result(ToolResult::error(tool_use.id, message)));
                    return Err(Error::UnboundedLoop { rounds: limit });
                }
            }
            rounds += 1;

            self.transition(EngineState::Dispatching);
            let result = self.dispatch(&tool_use).await;
            self.turns.push(Turn::tool_result(result));
        }
    }

    /// Call the model with the full history, retrying transient failures.
    ///
    /// Nothing is appended to the history until a call succeeds.
    async fn call_model(&self) -> Result<ModelResponse> {
        let request = ModelRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: &self.config.system,
            tools: &self.tool_specs,
            turns: &self.turns,
        };

        let retry = &self.config.retry;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let outcome = match self.config.model_timeout {
                Some(limit) => tokio::time::timeout(limit, self.backend.call(request))
                    .await
                    .unwrap_or(Err(ModelError::Timeout(limit))),
                None => self.backend.call(request).await,
            };

            match outcome.and_then(check_response) {
                Ok(response) => {
                    debug!(
                        attempts,
                        blocks = response.turn.content.len(),
                        stop_reason = ?response.stop_reason,
                        "model responded"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempts <= retry.max_retries => {
                    let delay = retry.delay(attempts - 1);
                    warn!(error = %e, attempt = attempts, ?delay, "model call failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(source) => return Err(Error::Transport { attempts, source }),
            }
        }
    }

    /// Resolve and run one tool request. Never fails: every problem becomes
    /// an error result for the model to read.
    async fn dispatch(&self, tool_use: &ToolUse) -> ToolResult {
        info!(tool = %tool_use.name, id = %tool_use.id, "dispatching tool");

        let outcome = match self.registry.resolve(&tool_use.name) {
            Ok(tool) => invoke(tool, tool_use.input.clone(), self.config.tool_timeout).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(content) => ToolResult::success(&tool_use.id, content),
            Err(e) => {
                warn!(tool = %tool_use.name, id = %tool_use.id, error = %e, "tool failed");
                ToolResult::error(&tool_use.id, e.to_string())
            }
        }
    }

    fn transition(&mut self, next: EngineState) {
        debug!(from = ?self.state, to = ?next, "engine state");
        self.state = next;
    }
}

fn check_response(response: ModelResponse) -> std::result::Result<ModelResponse, ModelError> {
    if response.turn.role != Role::Assistant {
        return Err(ModelError::InvalidResponse(format!(
            "expected an assistant turn, got {}",
            response.turn.role
        )));
    }
    if response.turn.content.is_empty() {
        return Err(ModelError::InvalidResponse(
            "response contained no content blocks".into(),
        ));
    }
    // Only the final block may request a tool; an earlier one would go unanswered.
    let leading = &response.turn.content[..response.turn.content.len() - 1];
    if let Some(position) = leading
        .iter()
        .position(|block| matches!(block, ContentBlock::ToolUse(_)))
    {
        return Err(ModelError::InvalidResponse(format!(
            "tool request at block {position} is not the final block"
        )));
    }
    Ok(response)
}

/// Run a tool on the blocking pool so a panic or a stuck call cannot reach
/// engine state. A timed-out invocation keeps running in the background; its
/// output is discarded.
async fn invoke(
    tool: Arc<dyn Tool>,
    input: Value,
    timeout: Option<Duration>,
) -> std::result::Result<ToolResultContent, ToolError> {
    let task = tokio::task::spawn_blocking(move || tool.invoke(input));

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                return Err(ToolError::Timeout(millis));
            }
        },
        None => task.await,
    };

    joined.map_err(join_error)?
}

fn join_error(err: JoinError) -> ToolError {
    if !err.is_panic() {
        return ToolError::Execution("tool task was cancelled".into());
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into());
    ToolError::Panicked(message)
}

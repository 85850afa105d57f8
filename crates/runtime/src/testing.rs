//! Scripted model transport for engine tests.

use crate::model::{
    Backend, ContentBlock, ModelError, ModelRequest, ModelResponse, StopReason, ToolUse, Turn,
    Usage,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

type Scripted = Result<ModelResponse, ModelError>;

/// Replays a fixed queue of responses and records every request's history.
pub(crate) struct ScriptedBackend {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<Vec<Turn>>>,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    pub(crate) fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each call.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Turn history sent with each call, in call order.
    pub(crate) fn requests(&self) -> Vec<Vec<Turn>> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Backend for ScriptedBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(request.turns.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ModelError::InvalidResponse("script exhausted".into())))
    }
}

fn usage() -> Usage {
    Usage {
        input_tokens: 10,
        output_tokens: 5,
    }
}

/// A final answer made of one text block.
pub(crate) fn text_response(text: &str) -> Scripted {
    Ok(ModelResponse {
        turn: Turn::assistant(vec![ContentBlock::text(text)]),
        usage: usage(),
        stop_reason: Some(StopReason::EndTurn),
    })
}

/// A response with leading text and a trailing tool request.
pub(crate) fn tool_use_response(id: &str, name: &str, input: Value) -> Scripted {
    Ok(ModelResponse {
        turn: Turn::assistant(vec![
            ContentBlock::text(format!("Calling {name}.")),
            ContentBlock::ToolUse(ToolUse {
                id: id.into(),
                name: name.into(),
                input,
            }),
        ]),
        usage: usage(),
        stop_reason: Some(StopReason::ToolUse),
    })
}

//! Anthropic Messages API backend.

use crate::model::{
    Backend, ContentBlock, ModelError, ModelRequest, ModelResponse, Role, StopReason,
    ToolResultContent, ToolSpec, ToolUse, Turn, Usage,
};
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Authentication mode for the Anthropic API.
#[derive(Clone)]
pub enum AnthropicAuth {
    /// Standard API key, sent as `x-api-key`.
    ApiKey(String),
    /// Bearer token, for gateways that front the API.
    Bearer(String),
}

impl std::fmt::Display for AnthropicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => write!(f, "api_key"),
            Self::Bearer(_) => write!(f, "bearer"),
        }
    }
}

// Keeps secrets out of logs.
impl std::fmt::Debug for AnthropicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AnthropicAuth({self})")
    }
}

impl AnthropicAuth {
    fn apply_headers(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            Self::ApiKey(key) => req.header("x-api-key", key),
            Self::Bearer(token) => req.header("Authorization", format!("Bearer {token}")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<ApiSystemBlock<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ApiToolChoice>,
}

#[derive(Debug, Serialize)]
struct ApiSystemBlock<'a> {
    #[serde(rename = "type")]
    block_type: &'static str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: Vec<ApiContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock<'a> {
    Text {
        text: &'a str,
    },
    ToolUse {
        id: &'a str,
        name: &'a str,
        input: &'a Value,
    },
    ToolResult {
        tool_use_id: &'a str,
        content: &'a ToolResultContent,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

/// One tool request per turn; the engine only dispatches the final block.
#[derive(Debug, Serialize)]
struct ApiToolChoice {
    #[serde(rename = "type")]
    choice_type: &'static str,
    disable_parallel_tool_use: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicBackendBuilder {
    auth: AnthropicAuth,
    base_url: String,
    client: Option<reqwest::Client>,
}

impl AnthropicBackendBuilder {
    pub fn new(auth: AnthropicAuth) -> Self {
        Self {
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: None,
        }
    }

    /// Override the API base URL (no trailing `/v1/messages`).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured HTTP client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> AnthropicBackend {
        AnthropicBackend {
            client: self.client.unwrap_or_default(),
            auth: self.auth,
            endpoint: format!("{}/v1/messages", self.base_url),
        }
    }
}

/// Anthropic Messages API backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    auth: AnthropicAuth,
    endpoint: String,
}

impl AnthropicBackend {
    pub fn builder(auth: AnthropicAuth) -> AnthropicBackendBuilder {
        AnthropicBackendBuilder::new(auth)
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn block_to_api(block: &ContentBlock) -> ApiContentBlock<'_> {
        match block {
            ContentBlock::Text { text } => ApiContentBlock::Text { text },
            ContentBlock::ToolUse(call) => ApiContentBlock::ToolUse {
                id: &call.id,
                name: &call.name,
                input: &call.input,
            },
            ContentBlock::ToolResult(result) => ApiContentBlock::ToolResult {
                tool_use_id: &result.tool_use_id,
                content: &result.content,
                is_error: result.is_error,
            },
        }
    }

    fn turn_to_api(turn: &Turn) -> ApiMessage<'_> {
        ApiMessage {
            role: Self::role_to_api(turn.role),
            content: turn.content.iter().map(Self::block_to_api).collect(),
        }
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool<'_> {
        ApiTool {
            name: &spec.name,
            description: &spec.description,
            input_schema: &spec.input_schema,
        }
    }

    fn build_request<'a>(request: &ModelRequest<'a>) -> ApiRequest<'a> {
        let tool_choice = (!request.tools.is_empty()).then_some(ApiToolChoice {
            choice_type: "auto",
            disable_parallel_tool_use: true,
        });

        ApiRequest {
            model: request.model,
            max_tokens: request.max_tokens,
            messages: request.turns.iter().map(Self::turn_to_api).collect(),
            system: request
                .system
                .iter()
                .map(|text| ApiSystemBlock {
                    block_type: "text",
                    text,
                })
                .collect(),
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
            tool_choice,
        }
    }

    fn response_to_model(response: ApiResponse) -> Result<ModelResponse, ModelError> {
        let content: Vec<ContentBlock> = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ApiResponseBlock::Text { text } => Some(ContentBlock::Text { text }),
                ApiResponseBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse(ToolUse { id, name, input }))
                }
                ApiResponseBlock::Unknown => None,
            })
            .collect();

        if content.is_empty() {
            return Err(ModelError::InvalidResponse(
                "response contained no content blocks".into(),
            ));
        }

        Ok(ModelResponse {
            turn: Turn::assistant(content),
            usage: Usage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
            stop_reason: response.stop_reason.map(parse_stop_reason),
        })
    }
}

fn parse_stop_reason(reason: String) -> StopReason {
    match reason.as_str() {
        "end_turn" => StopReason::EndTurn,
        "tool_use" => StopReason::ToolUse,
        "max_tokens" => StopReason::MaxTokens,
        "stop_sequence" => StopReason::StopSequence,
        _ => StopReason::Other(reason),
    }
}

fn classify_status(status: StatusCode, body: String) -> ModelError {
    let message = format!("{status}: {body}");
    match status.as_u16() {
        401 | 403 => ModelError::Auth(message),
        429 => ModelError::RateLimited(message),
        500..=599 => ModelError::Server(message),
        _ => ModelError::Api(message),
    }
}

impl std::fmt::Display for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({}, auth={})", self.endpoint, self.auth)
    }
}

impl Backend for AnthropicBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let api_request = Self::build_request(&request);

        let req = self
            .client
            .post(&self.endpoint)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .header("accept", "application/json");

        let req = self.auth.apply_headers(req);

        let response = req
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        Self::response_to_model(api_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolResult;
    use serde_json::json;

    #[test]
    fn auth_display_hides_secret() {
        let api = AnthropicAuth::ApiKey("sk-secret".into());
        let bearer = AnthropicAuth::Bearer("tok-secret".into());
        assert_eq!(api.to_string(), "api_key");
        assert_eq!(bearer.to_string(), "bearer");
        assert!(!format!("{api:?}").contains("sk-secret"));
    }

    #[test]
    fn builder_normalizes_base_url() {
        let backend = AnthropicBackend::builder(AnthropicAuth::ApiKey("k".into()))
            .base_url("http://localhost:8080/")
            .build();
        assert_eq!(backend.endpoint, "http://localhost:8080/v1/messages");
    }

    #[test]
    fn request_carries_history_in_order() {
        let turns = vec![
            Turn::user("list the root"),
            Turn::assistant(vec![
                ContentBlock::text("Looking."),
                ContentBlock::ToolUse(ToolUse {
                    id: "toolu_1".into(),
                    name: "list_paths".into(),
                    input: json!({"path": "."}),
                }),
            ]),
            Turn::tool_result(ToolResult::error("toolu_1", "No such file or directory: .")),
        ];
        let system = vec!["Be brief.".to_string()];
        let tools = vec![ToolSpec {
            name: "list_paths".into(),
            description: "List".into(),
            input_schema: json!({"type": "object"}),
        }];
        let request = ModelRequest {
            model: "claude-test",
            max_tokens: 1024,
            system: &system,
            tools: &tools,
            turns: &turns,
        };

        let value = serde_json::to_value(AnthropicBackend::build_request(&request)).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "claude-test",
                "max_tokens": 1024,
                "system": [{"type": "text", "text": "Be brief."}],
                "tools": [{
                    "name": "list_paths",
                    "description": "List",
                    "input_schema": {"type": "object"}
                }],
                "tool_choice": {"type": "auto", "disable_parallel_tool_use": true},
                "messages": [
                    {"role": "user", "content": [{"type": "text", "text": "list the root"}]},
                    {"role": "assistant", "content": [
                        {"type": "text", "text": "Looking."},
                        {"type": "tool_use", "id": "toolu_1", "name": "list_paths", "input": {"path": "."}}
                    ]},
                    {"role": "user", "content": [{
                        "type": "tool_result",
                        "tool_use_id": "toolu_1",
                        "content": "No such file or directory: .",
                        "is_error": true
                    }]}
                ]
            })
        );
    }

    #[test]
    fn request_without_tools_omits_tool_fields() {
        let turns = vec![Turn::user("hi")];
        let request = ModelRequest {
            model: "m",
            max_tokens: 10,
            system: &[],
            tools: &[],
            turns: &turns,
        };
        let value = serde_json::to_value(AnthropicBackend::build_request(&request)).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
        assert!(value.get("system").is_none());
    }

    #[test]
    fn response_keeps_block_order_and_drops_unknown_kinds() {
        let api: ApiResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "x"},
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_2", "name": "read_files", "input": {"path": "a.txt"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 7}
        }))
        .unwrap();

        let response = AnthropicBackend::response_to_model(api).unwrap();
        assert_eq!(response.turn.role, Role::Assistant);
        assert_eq!(response.turn.content.len(), 2);
        assert_eq!(response.turn.trailing_tool_use().unwrap().id, "toolu_2");
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        assert_eq!(response.usage.total_tokens(), 19);
    }

    #[test]
    fn empty_response_is_invalid() {
        let api: ApiResponse = serde_json::from_value(json!({
            "content": [],
            "usage": {"input_tokens": 1, "output_tokens": 0}
        }))
        .unwrap();
        let err = AnthropicBackend::response_to_model(api).unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, String::new()),
            ModelError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ModelError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::from_u16(529).unwrap(), String::new()),
            ModelError::Server(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "bad".into()),
            ModelError::Api(msg) if msg.contains("bad")
        ));
    }
}

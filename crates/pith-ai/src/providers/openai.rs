//! OpenAI-compatible Chat Completions provider (xAI, OpenAI)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::LlmProvider;
use crate::{
    error::{Error, Result},
    types::{
        Completion, CompletionOptions, Context, Message, Model, StopReason, ToolCallRequest,
        Usage,
    },
};

/// Default HTTP timeout for one completion request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Chat Completions API client
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
}

impl OpenAIProvider {
    /// Create a new provider with an API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a provider whose requests give up after `timeout`
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    fn build_headers(&self, model: &Model) -> Result<reqwest::header::HeaderMap> {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key)
            .parse()
            .map_err(|_| Error::InvalidApiKey)?;
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        for (key, value) in &model.headers {
            if let (Ok(name), Ok(val)) = (
                key.parse::<reqwest::header::HeaderName>(),
                value.parse::<reqwest::header::HeaderValue>(),
            ) {
                headers.insert(name, val);
            }
        }
        Ok(headers)
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn complete(
        &self,
        model: &Model,
        context: &Context,
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let request = build_request(model, context, options);
        let url = format!("{}/chat/completions", model.base_url.trim_end_matches('/'));

        tracing::debug!(
            model = %model.id,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers(model)?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_status(status.as_u16(), &body, retry_after));
        }

        let body: ChatResponse = response.json().await?;
        parse_response(body)
    }
}

fn build_request(model: &Model, context: &Context, options: &CompletionOptions) -> ChatRequest {
    let messages = context.messages.iter().map(convert_message).collect();

    let tools = if context.tools.is_empty() {
        None
    } else {
        Some(
            context
                .tools
                .iter()
                .map(|t| OpenAITool {
                    tool_type: "function".to_string(),
                    function: OpenAIFunction {
                        name: t.name.clone(),
                        description: Some(t.description.clone()),
                        parameters: Some(t.parameters.clone()),
                    },
                })
                .collect(),
        )
    };

    let has_tools = tools.is_some();
    ChatRequest {
        model: model.id.clone(),
        messages,
        max_tokens: Some(options.max_tokens),
        temperature: Some(options.temperature),
        n: Some(options.n),
        tools,
        tool_choice: if has_tools {
            Some(serde_json::json!("auto"))
        } else {
            None
        },
    }
}

fn convert_message(msg: &Message) -> OpenAIMessage {
    match msg {
        Message::System { content } => OpenAIMessage {
            role: "system".to_string(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        Message::User { content } => OpenAIMessage {
            role: "user".to_string(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        Message::Assistant {
            content,
            tool_calls,
        } => OpenAIMessage {
            role: "assistant".to_string(),
            content: content.clone(),
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(
                    tool_calls
                        .iter()
                        .map(|tc| OpenAIToolCall {
                            id: tc.id.clone(),
                            call_type: "function".to_string(),
                            function: OpenAIFunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: None,
        },
        Message::Tool {
            tool_call_id,
            content,
        } => OpenAIMessage {
            role: "tool".to_string(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.clone()),
        },
    }
}

fn parse_response(body: ChatResponse) -> Result<Completion> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedResponse("response contained no choices".into()))?;

    let mut tool_calls = Vec::new();
    for tc in choice.message.tool_calls.unwrap_or_default() {
        let name = tc.function.name.unwrap_or_default();
        if name.is_empty() {
            return Err(Error::UnexpectedResponse(
                "tool call without a function name".into(),
            ));
        }
        let id = match tc.id {
            Some(id) if !id.is_empty() => id,
            _ => format!("call_{}", uuid::Uuid::new_v4().simple()),
        };
        tool_calls.push(ToolCallRequest {
            id,
            name,
            arguments: tc.function.arguments.unwrap_or_default(),
        });
    }

    let stop_reason = match choice.finish_reason.as_deref() {
        Some("stop") => Some(StopReason::Stop),
        Some("length") => Some(StopReason::Length),
        Some("tool_calls") => Some(StopReason::ToolUse),
        _ => None,
    };

    let usage = body
        .usage
        .map(|u| Usage {
            input: u.prompt_tokens,
            output: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(Completion {
        message: Message::assistant_with_tool_calls(choice.message.content, tool_calls),
        usage,
        stop_reason,
    })
}

fn error_from_status(status: u16, body: &str, retry_after: Option<u64>) -> Error {
    let (error_type, message) = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: ErrorDetail::Object { message, error_type },
        }) => (error_type.unwrap_or_else(|| "api_error".to_string()), message),
        Ok(ErrorBody {
            error: ErrorDetail::Text(message),
        }) => ("api_error".to_string(), message),
        Err(_) => ("api_error".to_string(), body.to_string()),
    };

    match status {
        401 | 403 => Error::Auth(message),
        429 => Error::RateLimited { retry_after },
        _ => Error::Api {
            status,
            kind: error_type,
            message,
        },
    }
}

// Request types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

// Response types

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCall {
    id: Option<String>,
    function: ChatFunction,
}

#[derive(Debug, Deserialize)]
struct ChatFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Object {
        message: String,
        #[serde(rename = "type")]
        error_type: Option<String>,
    },
    Text(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Tool, models};

    fn grok() -> Model {
        models::get_model_by_id("grok-3-mini-beta").unwrap()
    }

    #[test]
    fn test_request_carries_sampling_and_tools() {
        let context = Context {
            messages: vec![Message::system("be brief"), Message::user("hello")],
            tools: vec![Tool::new(
                "web_search",
                "Search the web",
                serde_json::json!({"type": "object"}),
            )],
        };
        let request = build_request(&grok(), &context, &CompletionOptions::default());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "grok-3-mini-beta");
        assert_eq!(json["max_tokens"], 2000);
        assert_eq!(json["n"], 1);
        assert_eq!(json["tool_choice"], "auto");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "web_search");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_request_without_tools_omits_tool_choice() {
        let context = Context {
            messages: vec![Message::user("hi")],
            tools: vec![],
        };
        let json =
            serde_json::to_value(build_request(&grok(), &context, &CompletionOptions::default()))
                .unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
    }

    #[test]
    fn test_tool_round_trip_messages_convert() {
        let assistant = Message::assistant_with_tool_calls(
            None,
            vec![ToolCallRequest::new("c1", "web_search", r#"{"query":"tides"}"#)],
        );
        let converted = serde_json::to_value(convert_message(&assistant)).unwrap();
        assert_eq!(converted["role"], "assistant");
        assert!(converted["content"].is_null());
        assert_eq!(converted["tool_calls"][0]["id"], "c1");
        assert_eq!(
            converted["tool_calls"][0]["function"]["arguments"],
            r#"{"query":"tides"}"#
        );

        let tool = serde_json::to_value(convert_message(&Message::tool_result("c1", "[]"))).unwrap();
        assert_eq!(tool["role"], "tool");
        assert_eq!(tool["tool_call_id"], "c1");
    }

    #[test]
    fn test_parse_text_response() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Hi."}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }))
        .unwrap();
        let completion = parse_response(body).unwrap();
        assert_eq!(completion.message, Message::assistant("Hi."));
        assert_eq!(completion.stop_reason, Some(StopReason::Stop));
        assert_eq!(completion.usage, Usage { input: 12, output: 3 });
    }

    #[test]
    fn test_parse_tool_calls_assigns_missing_ids() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function", "function": {"name": "web_search", "arguments": "{\"query\":\"a\"}"}},
                        {"type": "function", "function": {"name": "web_search", "arguments": "{\"query\":\"b\"}"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();
        let completion = parse_response(body).unwrap();
        let calls = completion.message.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert!(calls[1].id.starts_with("call_"));
        assert_ne!(calls[1].id, calls[0].id);
        assert_eq!(completion.stop_reason, Some(StopReason::ToolUse));
    }

    #[test]
    fn test_parse_tool_call_without_name_is_malformed() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"tool_calls": [{"id": "x", "function": {"arguments": "{}"}}]}, "finish_reason": "tool_calls"}]
        }))
        .unwrap();
        assert!(matches!(
            parse_response(body),
            Err(Error::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_parse_empty_choices_is_error() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(matches!(
            parse_response(body),
            Err(Error::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_error_from_status_variants() {
        let auth = error_from_status(401, r#"{"error":{"message":"bad key","type":"auth"}}"#, None);
        assert!(matches!(auth, Error::Auth(ref m) if m == "bad key"));

        let limited = error_from_status(429, "slow down", Some(7));
        assert!(matches!(limited, Error::RateLimited { retry_after: Some(7) }));

        let xai = error_from_status(400, r#"{"code":"x","error":"Model not found"}"#, None);
        assert!(xai.to_string().contains("Model not found"));
        assert!(xai.to_string().contains("HTTP 400"));
    }
}

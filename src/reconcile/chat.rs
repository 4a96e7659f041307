use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::interpreter::{FragmentInterpreter, InterpretError, StateContext};
use super::prompt::{user_message, SYSTEM_PROMPT};
use crate::patch::PatchOperation;

const LOG_TARGET: &str = "voice_hand_history::reconcile::chat";

pub const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";

#[derive(Clone, Debug)]
pub struct ChatInterpreterConfig {
    pub endpoint: Url,
    pub model: String,
    pub api_key: String,
    pub temperature: Option<f32>,
}

impl ChatInterpreterConfig {
    pub fn groq(api_key: impl Into<String>) -> Result<Self, url::ParseError> {
        Ok(Self {
            endpoint: Url::parse(GROQ_CHAT_URL)?,
            model: DEFAULT_MODEL.to_owned(),
            api_key: api_key.into(),
            temperature: None,
        })
    }
}

/// Interpreter backed by any OpenAI-compatible chat-completions endpoint.
pub struct ChatInterpreter {
    client: Client,
    config: ChatInterpreterConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatInterpreter {
    pub fn new(config: ChatInterpreterConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: ChatInterpreterConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ChatInterpreterConfig {
        &self.config
    }
}

#[async_trait]
impl FragmentInterpreter for ChatInterpreter {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn interpret(
        &self,
        fragment: &str,
        prior: &[String],
        context: &StateContext,
    ) -> Result<Vec<PatchOperation>, InterpretError> {
        let prompt = user_message(fragment, prior, context);
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.config.endpoint.clone())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| InterpretError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(target: LOG_TARGET, status = status.as_u16(), %detail, "chat completion rejected");
            return Err(InterpretError::Upstream(format!("{status}: {detail}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| InterpretError::MalformedResponse(err.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| InterpretError::MalformedResponse("reply has no content".into()))?;
        debug!(target: LOG_TARGET, reply_len = content.len(), "chat completion received");

        parse_reply(&content)
    }
}

/// Accepts `{"patches": [...]}` or a bare array, optionally inside a
/// markdown code fence.
pub fn parse_reply(content: &str) -> Result<Vec<PatchOperation>, InterpretError> {
    let body = strip_code_fence(content);
    let value: Value = serde_json::from_str(body)
        .map_err(|err| InterpretError::MalformedResponse(format!("not JSON: {err}")))?;

    let operations = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map.remove("patches").ok_or_else(|| {
            InterpretError::MalformedResponse("object reply without \"patches\"".into())
        })?,
        other => {
            return Err(InterpretError::MalformedResponse(format!(
                "expected an object or array, got {other}"
            )))
        }
    };

    serde_json::from_value(operations)
        .map_err(|err| InterpretError::MalformedResponse(format!("bad operation list: {err}")))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

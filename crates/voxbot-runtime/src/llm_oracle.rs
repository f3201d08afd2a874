//! [`LlmOracle`] – a [`LanguageOracle`] backed by an OpenAI-compatible model
//! server.
//!
//! Talks to any `/v1/chat/completions` endpoint, such as a local
//! [Ollama](https://ollama.com) (`http://localhost:11434`) or a hosted API.
//! Both calls pin the reply to a JSON Schema through `response_format`:
//! [`Understanding`] for `understand`, [`Reply`] for `generate`.
//!
//! # Example
//!
//! ```rust,no_run
//! use voxbot_runtime::llm_oracle::LlmOracle;
//!
//! let oracle = LlmOracle::new("http://localhost:11434", "llama3");
//! // Requires a running model server.
//! // let understanding = oracle.understand("what's the weather?").await?;
//! ```

use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use voxbot_types::{Params, VoxError};

use crate::collaborators::{LanguageOracle, Reply, Understanding};
use crate::context::ConversationContext;

// ─────────────────────────────────────────────────────────────────────────────
// Prompts
// ─────────────────────────────────────────────────────────────────────────────

/// System prompt for intent extraction.
pub const UNDERSTAND_PROMPT: &str = "\
You are the language understanding layer of a voice assistant.
Classify the user's utterance and extract entities.
Use one of these intents: greeting, farewell, information_request,
action_request, task_specific, language_change, unknown, or the name of an
action (fetch_information, send_message, create_item, update_item,
delete_item, execute_task, search).
Put extracted values (topic, task, query, recipient, content, language, ...)
in `entities`.  Reply with JSON only.";

/// System prompt for reply generation.
pub const GENERATE_PROMPT: &str = "\
You are a warm, concise voice assistant.  Answer in one or two spoken
sentences and choose the emotion that fits (neutral, happy, sad, angry,
surprised, concerned).  Reply with JSON only.";

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise talking to the model server.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The HTTP request to the model server failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The response from the model server could not be parsed.
    #[error("Unexpected response format: {0}")]
    BadResponse(String),
}

impl From<OracleError> for VoxError {
    fn from(e: OracleError) -> Self {
        VoxError::Oracle(e.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message types (OpenAI-compatible)
// ─────────────────────────────────────────────────────────────────────────────

/// The role of a participant in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal request / response shapes
// ─────────────────────────────────────────────────────────────────────────────

/// `response_format` field that enforces structured JSON Schema output.
#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: serde_json::Value,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

// ─────────────────────────────────────────────────────────────────────────────
// LlmOracle
// ─────────────────────────────────────────────────────────────────────────────

/// An async client for an OpenAI-compatible chat-completions endpoint.
pub struct LlmOracle {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LlmOracle {
    /// Create an oracle pointing at `base_url` (e.g. `"http://localhost:11434"`)
    /// and using `model` (e.g. `"llama3"`).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.  Empty keys are
    /// ignored.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `messages` and parse the assistant's reply as `T`, whose JSON
    /// Schema is sent as the `response_format`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Http`] if the request fails, or
    /// [`OracleError::BadResponse`] if the response shape is unexpected or
    /// the content does not parse as `T`.
    pub async fn complete<T>(&self, messages: &[ChatMessage]) -> Result<T, OracleError>
    where
        T: JsonSchema + DeserializeOwned,
    {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let schema = serde_json::to_value(schema_for!(T)).unwrap_or(serde_json::Value::Null);
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: schema,
            },
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response: ChatResponse = request.send().await?.error_for_status()?.json().await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| OracleError::BadResponse("empty choices array".into()))?;

        serde_json::from_str(strip_code_fence(&content)).map_err(|e| {
            warn!(error = %e, "model reply is not valid structured output");
            OracleError::BadResponse(format!("{e}: {content}"))
        })
    }
}

/// Models sometimes wrap JSON in a Markdown code fence despite the schema.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Messages for an `understand` call.
pub fn understand_messages(text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::new(Role::System, UNDERSTAND_PROMPT),
        ChatMessage::new(Role::User, text),
    ]
}

/// Messages for a `generate` call: the system prompt with the intent and
/// entities to answer, followed by the conversation history.
pub fn generate_messages(intent: &str, entities: &Params, context: &ConversationContext) -> Vec<ChatMessage> {
    let entities = serde_json::to_string(entities).unwrap_or_else(|_| "{}".to_string());
    let system = format!("{GENERATE_PROMPT}\n\nIntent to answer: {intent}\nEntities: {entities}");
    std::iter::once(ChatMessage::new(Role::System, system))
        .chain(context.history().cloned())
        .collect()
}

#[async_trait]
impl LanguageOracle for LlmOracle {
    async fn understand(&self, text: &str) -> Result<Understanding, VoxError> {
        let understanding: Understanding = self.complete(&understand_messages(text)).await?;
        debug!(intent = %understanding.intent, entities = understanding.entities.len(), "utterance understood");
        Ok(understanding)
    }

    async fn generate(
        &self,
        intent: &str,
        entities: &Params,
        context: &ConversationContext,
    ) -> Result<Reply, VoxError> {
        let reply: Reply = self.complete(&generate_messages(intent, entities, context)).await?;
        debug!(intent, emotion = %reply.emotion, "reply generated");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use voxbot_types::Emotion;

    /// Serve one chat-completions request whose assistant content is
    /// `content`.  Records the raw request.
    async fn spawn_model_server(content: &'static str) -> (String, Arc<Mutex<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(String::new()));
        let seen_srv = Arc::clone(&seen);

        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else { return };
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).into_owned();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        *seen_srv.lock().unwrap() = text;
                        break;
                    }
                }
            }
            let body = json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            })
            .to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        });

        (format!("http://{addr}"), seen)
    }

    #[test]
    fn chat_message_serializes_role() {
        let json = serde_json::to_string(&ChatMessage::new(Role::System, "hello")).unwrap();
        assert!(json.contains("\"system\""));
    }

    #[test]
    fn generate_messages_carry_intent_and_history() {
        let mut ctx = ConversationContext::default();
        ctx.add_user_message("hi");
        ctx.add_assistant_message("hello!");
        let mut entities = Params::new();
        entities.insert("topic".into(), json!("weather"));

        let messages = generate_messages("greeting", &entities, &ctx);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Intent to answer: greeting"));
        assert!(messages[0].content.contains(r#""topic":"weather""#));
        assert_eq!(messages[1], ChatMessage::new(Role::User, "hi"));
        assert_eq!(messages[2], ChatMessage::new(Role::Assistant, "hello!"));
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn understand_parses_structured_reply() {
        let (url, seen) =
            spawn_model_server(r#"{"intent":"information_request","entities":{"topic":"weather"}}"#).await;
        let oracle = LlmOracle::new(url, "llama3").with_api_key("sk-test");

        let u = oracle.understand("what's the weather?").await.unwrap();

        assert_eq!(u, Understanding::new("information_request").with_entity("topic", "weather"));
        let request = seen.lock().unwrap().clone();
        assert!(request.starts_with("POST /v1/chat/completions"));
        assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains("\"json_schema\""));
    }

    #[tokio::test]
    async fn generate_parses_text_and_emotion() {
        let (url, _) = spawn_model_server(r#"{"text":"Sunny today!","emotion":"happy"}"#).await;
        let oracle = LlmOracle::new(url, "llama3");

        let reply = oracle
            .generate("action_success", &Params::new(), &ConversationContext::default())
            .await
            .unwrap();

        assert_eq!(reply, Reply::new("Sunny today!", Emotion::Happy));
    }

    #[tokio::test]
    async fn unstructured_reply_is_an_oracle_error() {
        let (url, _) = spawn_model_server("just chatting").await;
        let oracle = LlmOracle::new(url, "llama3");

        let err = oracle.understand("hi").await.unwrap_err();
        assert!(matches!(err, VoxError::Oracle(_)), "{err:?}");
    }
}

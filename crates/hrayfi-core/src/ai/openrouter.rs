use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::CompletionBackend;
use crate::config::Config;
use crate::error::ChatError;
use crate::persona::{ASSISTANT_TITLE, SYSTEM_PROMPT};
use crate::state::Transcript;

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "arcee-ai/trinity-large-preview:free";

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestMessage {
    pub role: String,
    pub content: String,
}

impl RequestMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

/// Body of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<RequestMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Build a request from the transcript: the system prompt first, then
    /// every conversation message in order. The seed greeting is skipped.
    pub fn from_transcript(model: &str, transcript: &Transcript) -> Self {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(RequestMessage::new("system", SYSTEM_PROMPT));
        messages.extend(
            transcript
                .conversation()
                .map(|m| RequestMessage::new(m.role.as_str(), &m.text)),
        );

        Self {
            model: model.to_string(),
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|content| !content.is_empty())
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Pull `error.message` out of a failure body, if there is one.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message)
}

fn reply_content(body: &str) -> Result<Option<String>, ChatError> {
    let response: CompletionResponse = serde_json::from_str(body)?;
    Ok(response.into_content())
}

#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl OpenRouterClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Self {
        Self::with_client(Client::new(), api_key, endpoint)
    }

    /// Use a preconfigured `reqwest::Client` (proxy, TLS or timeout settings).
    pub fn with_client(client: Client, api_key: &str, endpoint: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_endpoint(
            config.api_key.as_deref().unwrap_or_default(),
            config.endpoint(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn query(&self, request: &CompletionRequest) -> Result<Option<String>, ChatError> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", ASSISTANT_TITLE)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                body = %body,
                "completion endpoint returned an error"
            );
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body = response.text().await?;
        reply_content(&body)
    }
}

#[async_trait]
impl CompletionBackend for OpenRouterClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, ChatError> {
        self.query(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Role;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = find_header_end(&buf) {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let raw = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            raw
        });
        (format!("http://{}/api/v1/chat/completions", addr), handle)
    }

    /// Talks to the local responder directly, whatever proxy the environment sets.
    fn local_client(endpoint: &str) -> OpenRouterClient {
        let client = Client::builder().no_proxy().build().unwrap();
        OpenRouterClient::with_client(client, "secret-key", endpoint)
    }

    fn sample_request() -> CompletionRequest {
        let mut transcript = Transcript::seeded("welcome");
        transcript.append("Hello", Role::User);
        CompletionRequest::from_transcript(DEFAULT_MODEL, &transcript)
    }

    #[test]
    fn test_request_starts_with_system_prompt_and_skips_seed() {
        let mut transcript = Transcript::seeded("welcome");
        transcript.append("Hello", Role::User);
        transcript.append("Hi there", Role::Assistant);
        transcript.append("Show me rugs", Role::User);

        let request = CompletionRequest::from_transcript("some/model", &transcript);
        let roles: Vec<&str> = request.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(request.messages[0].content, SYSTEM_PROMPT);
        assert_eq!(request.messages[3].content, "Show me rugs");
        assert!(request.messages.iter().all(|m| m.content != "welcome"));
    }

    #[test]
    fn test_request_json_shape() {
        let value = serde_json::to_value(sample_request()).unwrap();
        assert_eq!(value["model"], DEFAULT_MODEL);
        assert_eq!(value["temperature"], 0.7);
        assert_eq!(value["max_tokens"], 1024);
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "Hello");
    }

    #[test]
    fn test_reply_content_first_choice() {
        let body = r#"{"choices":[{"message":{"content":"Hi there"}},{"message":{"content":"other"}}]}"#;
        assert_eq!(reply_content(body).unwrap(), Some("Hi there".to_string()));
    }

    #[test]
    fn test_reply_content_missing_choices() {
        assert_eq!(reply_content(r#"{"id":"gen-1"}"#).unwrap(), None);
        assert_eq!(reply_content(r#"{"choices":[]}"#).unwrap(), None);
        assert_eq!(reply_content(r#"{"choices":[{}]}"#).unwrap(), None);
        assert_eq!(reply_content(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap(), None);
        assert_eq!(reply_content(r#"{"choices":[{"message":{"content":""}}]}"#).unwrap(), None);
    }

    #[test]
    fn test_reply_content_malformed_body() {
        assert!(matches!(reply_content("not json"), Err(ChatError::Decode(_))));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":{"message":"No auth credentials found","code":401}}"#),
            Some("No auth credentials found".to_string())
        );
        assert_eq!(error_message(r#"{"error":{}}"#), None);
        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }

    #[tokio::test]
    async fn test_query_sends_headers_and_body() {
        let (endpoint, server) =
            serve_once("200 OK", r#"{"choices":[{"message":{"content":"Hi there"}}]}"#).await;
        let client = local_client(&endpoint);

        let reply = client.query(&sample_request()).await.unwrap();
        assert_eq!(reply, Some("Hi there".to_string()));

        let raw = server.await.unwrap();
        let lower = raw.to_lowercase();
        assert!(raw.starts_with("POST /api/v1/chat/completions"));
        assert!(lower.contains("authorization: bearer secret-key"));
        assert!(lower.contains("content-type: application/json"));
        assert!(lower.contains("x-title: hrayfi assistant"));
        assert!(raw.contains(r#""max_tokens":1024"#));
    }

    #[tokio::test]
    async fn test_query_non_success_is_api_error() {
        let (endpoint, server) = serve_once(
            "500 Internal Server Error",
            r#"{"error":{"message":"upstream unavailable"}}"#,
        )
        .await;
        let client = local_client(&endpoint);

        let err = client.query(&sample_request()).await.unwrap_err();
        match err {
            ChatError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message.as_deref(), Some("upstream unavailable"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_query_unreachable_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = local_client(&format!("http://{}/", addr));
        let err = client.query(&sample_request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Transport(_)));
    }
}

//! Google Gemini implementation of [`AssistantModel`]
//!
//! Calls `models/{model}:generateContent` on the Generative Language API with
//! the fixed system instruction, the replayed history and the new input. Only
//! text parts are sent or read; no streaming and no tool calls.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::prompt::AGRICULTURE_SYSTEM_PROMPT;
use super::{AssistantConfig, AssistantError, AssistantModel, HistoryTurn, ModelRole};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Gemini client built once per process and shared by all requests
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: AssistantConfig,
}

impl GeminiClient {
    /// Create a new client; the HTTP timeout is the configured call bound
    pub fn new(config: AssistantConfig) -> Result<Self, AssistantError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AssistantError::Configuration(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    fn build_request<'a>(history: &'a [HistoryTurn], input: &'a str) -> GenerateContentRequest<'a> {
        let mut contents: Vec<Content<'a>> = history
            .iter()
            .map(|turn| Content {
                role: Some(turn.role.as_str()),
                parts: vec![TextPart { text: &turn.text }],
            })
            .collect();

        contents.push(Content {
            role: Some(ModelRole::User.as_str()),
            parts: vec![TextPart { text: input }],
        });

        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![TextPart {
                    text: AGRICULTURE_SYSTEM_PROMPT,
                }],
            },
            contents,
        }
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body.chars().take(200).collect())
    }

    fn extract_text(response: GenerateContentResponse) -> Result<String, AssistantError> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            return match response.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => Err(AssistantError::Blocked(reason)),
                None => Err(AssistantError::Empty),
            };
        };

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if !text.trim().is_empty() {
            return Ok(text);
        }

        match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                Err(AssistantError::Blocked(reason.to_string()))
            }
            _ => Err(AssistantError::Empty),
        }
    }
}

#[async_trait]
impl AssistantModel for GeminiClient {
    #[instrument(skip(self, history, input), fields(model = %self.config.model, turns = history.len()))]
    async fn reply(&self, history: &[HistoryTurn], input: &str) -> Result<String, AssistantError> {
        let request = Self::build_request(history, input);

        debug!("Sending request to Gemini API");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AssistantError::Timeout(self.config.timeout)
                } else {
                    AssistantError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AssistantError::Timeout(self.config.timeout)
            } else {
                AssistantError::Transport(e.to_string())
            }
        })?;

        if !status.is_success() {
            warn!(status = %status, "Gemini API error");
            return Err(AssistantError::Status {
                status: status.as_u16(),
                message: Self::error_message(&body),
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| AssistantError::Decode(e.to_string()))?;

        Self::extract_text(parsed)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

    fn client_for(server: &MockServer, timeout: Duration) -> GeminiClient {
        GeminiClient::new(AssistantConfig {
            api_key: "test-key".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: server.uri(),
            timeout,
        })
        .unwrap()
    }

    fn text_response(parts: &[&str]) -> serde_json::Value {
        let parts: Vec<_> = parts.iter().map(|t| json!({ "text": t })).collect();
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": parts },
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn test_reply_sends_history_and_joins_text_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "My maize leaves have streaks." }] },
                    { "role": "model", "parts": [{ "text": "Which variety is it?" }] },
                    { "role": "user", "parts": [{ "text": "A local hybrid." }] }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response(&[
                "This looks similar to ",
                "maize streak virus.",
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let history = vec![
            HistoryTurn {
                role: ModelRole::User,
                text: "My maize leaves have streaks.".to_string(),
            },
            HistoryTurn {
                role: ModelRole::Model,
                text: "Which variety is it?".to_string(),
            },
        ];

        let reply = client.reply(&history, "A local hybrid.").await.unwrap();
        assert_eq!(reply, "This looks similar to maize streak virus.");
    }

    #[test]
    fn test_request_carries_system_instruction() {
        let request = GeminiClient::build_request(&[], "hello");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value["systemInstruction"]["parts"][0]["text"],
            AGRICULTURE_SYSTEM_PROMPT
        );
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["contents"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_surfaces_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "message": "Resource has been exhausted" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.reply(&[], "hi").await.unwrap_err();

        match err {
            AssistantError::Status { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource has been exhausted");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.reply(&[], "hi").await.unwrap_err();
        assert!(matches!(err, AssistantError::Blocked(reason) if reason == "SAFETY"));
    }

    #[tokio::test]
    async fn test_candidate_without_text_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [] }, "finishReason": "MAX_TOKENS" }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.reply(&[], "hi").await.unwrap_err();
        assert!(matches!(err, AssistantError::Empty));
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.reply(&[], "hi").await.unwrap_err();
        assert!(matches!(err, AssistantError::Decode(_)));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(text_response(&["late"]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(200));
        let err = client.reply(&[], "hi").await.unwrap_err();
        assert!(matches!(err, AssistantError::Timeout(_)));
    }
}

//! OpenAI-compatible chat-completion provider.
//!
//! Works with OpenAI's API and any compatible endpoint. Message content is
//! either a plain string or a list of `text` / `image_url` parts on the wire.

use async_trait::async_trait;
use buddy_core::{
    completion::{
        ChatMessage, ChatRequest, ChatResponse, Content, ReasoningEffort, Role, Segment, Usage,
        Verbosity,
    },
    error::BuddyError,
    traits::Provider,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Create from config values.
    pub fn from_config(base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            timeout,
        }
    }
}

// --- Wire types ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub(crate) enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum WirePart {
    Text {
        text: String,
    },
    ImageUrl {
        image_url: WireImageUrl,
    },
    /// Part types this client does not understand (audio, refusal, ...).
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct WireImageUrl {
    pub url: String,
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        match content {
            Content::Text(s) => Self::Text(s.clone()),
            Content::Parts(parts) => Self::Parts(
                parts
                    .iter()
                    .map(|p| match p {
                        Segment::Text(text) => WirePart::Text { text: text.clone() },
                        Segment::ImageUrl(url) => WirePart::ImageUrl {
                            image_url: WireImageUrl { url: url.clone() },
                        },
                    })
                    .collect(),
            ),
        }
    }
}

impl From<WireContent> for Content {
    fn from(wire: WireContent) -> Self {
        match wire {
            WireContent::Text(s) => Self::Text(s),
            WireContent::Parts(parts) => Self::Parts(
                parts
                    .into_iter()
                    .filter_map(|p| match p {
                        WirePart::Text { text } => Some(Segment::Text(text)),
                        WirePart::ImageUrl { image_url } => Some(Segment::ImageUrl(image_url.url)),
                        WirePart::Unknown => None,
                    })
                    .collect(),
            ),
        }
    }
}

#[derive(Serialize, Debug)]
pub(crate) struct WireMessage {
    pub role: Role,
    pub content: WireContent,
}

#[derive(Serialize, Debug)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<Verbosity>,
}

/// Render a request into its wire body.
pub(crate) fn build_request(request: &ChatRequest) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: request.model.clone(),
        messages: request
            .messages
            .iter()
            .map(|m: &ChatMessage| WireMessage {
                role: m.role,
                content: WireContent::from(&m.content),
            })
            .collect(),
        reasoning_effort: request.options.reasoning_effort,
        verbosity: request.options.verbosity,
    }
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    pub model: Option<String>,
    pub usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
pub(crate) struct ChoiceMessage {
    pub content: Option<WireContent>,
}

#[derive(Deserialize, Default)]
pub(crate) struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Deserialize, Default)]
pub(crate) struct CompletionTokensDetails {
    #[serde(default)]
    pub reasoning_tokens: u64,
}

impl From<ChatCompletionResponse> for ChatResponse {
    fn from(parsed: ChatCompletionResponse) -> Self {
        let choices = parsed
            .choices
            .into_iter()
            .map(|c| {
                c.message
                    .and_then(|m| m.content)
                    .map(Content::from)
                    .unwrap_or_else(|| Content::Text(String::new()))
            })
            .collect();
        let usage = parsed
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
                reasoning_tokens: u
                    .completion_tokens_details
                    .map(|d| d.reasoning_tokens)
                    .unwrap_or_default(),
            })
            .unwrap_or_default();
        Self {
            choices,
            model: parsed.model,
            usage,
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, BuddyError> {
        let start = Instant::now();
        let body = build_request(request);

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("openai: POST {url} model={}", request.model);

        let resp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| BuddyError::Provider(format!("openai request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(BuddyError::Provider(format!(
                "openai returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| BuddyError::Provider(format!("openai: failed to parse response: {e}")))?;

        let response = ChatResponse::from(parsed);
        debug!(
            "openai: model={} choices={} tokens={} in {}ms",
            response.model.as_deref().unwrap_or(&request.model),
            response.choices.len(),
            response.usage.total_tokens,
            start.elapsed().as_millis()
        );
        Ok(response)
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return false;
        }
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("openai not available: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buddy_core::completion::ChatOptions;

    #[test]
    fn test_openai_provider_name() {
        let p = OpenAiProvider::from_config(
            "https://api.openai.com/v1".into(),
            "sk-test".into(),
            Duration::from_secs(10),
        );
        assert_eq!(p.name(), "openai");
    }

    #[test]
    fn test_request_omits_unset_options() {
        let req = ChatRequest::new("gpt-5", vec![ChatMessage::user("Hi")]);
        let json = serde_json::to_value(build_request(&req)).unwrap();
        assert_eq!(json["model"], "gpt-5");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hi");
        assert!(json.get("reasoning_effort").is_none());
        assert!(json.get("verbosity").is_none());
    }

    #[test]
    fn test_request_carries_effort_pair() {
        let req = ChatRequest::new("gpt-5", vec![ChatMessage::system("Be brief.")])
            .with_options(ChatOptions::with_effort(ReasoningEffort::Low, Verbosity::Low));
        let json = serde_json::to_value(build_request(&req)).unwrap();
        assert_eq!(json["reasoning_effort"], "low");
        assert_eq!(json["verbosity"], "low");
        assert_eq!(json["messages"][0]["role"], "system");

        let mut keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, ["messages", "model", "reasoning_effort", "verbosity"]);
    }

    #[test]
    fn test_multipart_content_wire_shape() {
        let content = Content::Parts(vec![
            Segment::Text("what is this?".into()),
            Segment::ImageUrl("data:image/png;base64,AAAA".into()),
        ]);
        let json = serde_json::to_value(WireContent::from(&content)).unwrap();
        assert_eq!(json[0]["type"], "text");
        assert_eq!(json[0]["text"], "what is this?");
        assert_eq!(json[1]["type"], "image_url");
        assert_eq!(json[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_response_parsing_string_content() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"},"finish_reason":"stop"}],"model":"gpt-5","usage":{"total_tokens":42,"prompt_tokens":10,"completion_tokens":32,"completion_tokens_details":{"reasoning_tokens":7}}}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        let resp = ChatResponse::from(parsed);
        assert_eq!(resp.first_text(), Some("Hello!".into()));
        assert_eq!(resp.usage.total_tokens, 42);
        assert_eq!(resp.usage.reasoning_tokens, 7);
        assert_eq!(resp.model.as_deref(), Some("gpt-5"));
    }

    #[test]
    fn test_response_parsing_multipart_content() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":[{"type":"text","text":"SEARCH"},{"type":"refusal","refusal":"no"}]}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        let resp = ChatResponse::from(parsed);
        assert_eq!(resp.first_text(), Some("SEARCH".into()));
    }

    #[test]
    fn test_response_parsing_null_content_and_no_choices() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(ChatResponse::from(parsed).first_text(), Some(String::new()));

        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(ChatResponse::from(parsed).first_text().is_none());
    }
}

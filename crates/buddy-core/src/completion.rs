//! Chat-completion request and response types.
//!
//! Provider-neutral: the OpenAI wire shapes live in `buddy-providers`.

use serde::{Deserialize, Serialize};

/// Message role in a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One piece of multipart content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Text(String),
    /// An image reference; here always a `data:` URL.
    ImageUrl(String),
}

/// Message content: a plain string or a list of typed segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Content {
    Text(String),
    Parts(Vec<Segment>),
}

impl Content {
    /// Text segments concatenated; image segments are dropped.
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    Segment::Text(t) => Some(t.as_str()),
                    Segment::ImageUrl(_) => None,
                })
                .collect(),
        }
    }

    /// Build user content from optional text and inline images.
    ///
    /// Without images this is plain text; with images the text (if any)
    /// comes first, followed by one segment per image.
    pub fn with_images(text: &str, image_urls: Vec<String>) -> Self {
        if image_urls.is_empty() {
            return Self::Text(text.to_string());
        }
        let mut parts = Vec::with_capacity(image_urls.len() + 1);
        if !text.is_empty() {
            parts.push(Segment::Text(text.to_string()));
        }
        parts.extend(image_urls.into_iter().map(Segment::ImageUrl));
        Self::Parts(parts)
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Content,
}

impl ChatMessage {
    pub fn system(content: impl Into<Content>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<Content>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Low,
    Medium,
    High,
}

/// Optional request parameters. `None` fields are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    pub reasoning_effort: Option<ReasoningEffort>,
    pub verbosity: Option<Verbosity>,
}

impl ChatOptions {
    pub fn with_effort(reasoning: ReasoningEffort, verbosity: Verbosity) -> Self {
        Self {
            reasoning_effort: Some(reasoning),
            verbosity: Some(verbosity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub options: ChatOptions,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: ChatOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub reasoning_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Candidate completions in provider order.
    pub choices: Vec<Content>,
    pub model: Option<String>,
    pub usage: Usage,
}

impl ChatResponse {
    /// Plain text of the first choice, if there is one.
    pub fn first_text(&self) -> Option<String> {
        self.choices.first().map(Content::to_plain_text)
    }
}

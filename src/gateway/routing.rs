//! Mention detection and web-search routing.
//!
//! Routing is two-tiered: a lexical pass over trigger words and URLs, then
//! (optionally) a one-token classification call to a cheap model. Any
//! failure in the model tier resolves to "no search".

use super::Gateway;
use buddy_core::{
    completion::{ChatMessage, ChatOptions, ChatRequest, ReasoningEffort, Verbosity},
    error::BuddyError,
};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("valid regex"));

const ROUTER_PROMPT: &str = "You are a router. Decide if the user text requires live web search. \
     Return exactly one token: SEARCH (if web search is needed) or NO_SEARCH (if not). \
     Use SEARCH for queries asking to search, containing URLs, or requesting fresh info; \
     otherwise NO_SEARCH.";

/// How a single turn is answered.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct RoutingDecision {
    pub web_search: bool,
    pub model: String,
    /// Empty when searching.
    pub options: ChatOptions,
    pub history_limit: i64,
}

/// Whether `text` contains the bot's `@handle`.
pub(super) fn is_bot_mentioned(text: &str, handle: &str) -> bool {
    !handle.is_empty() && text.contains(handle)
}

/// Lexical tier: any trigger word (case-insensitive substring) or a URL.
pub(super) fn contains_trigger(text: &str, triggers: &[String]) -> bool {
    if text.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    triggers
        .iter()
        .filter(|t| !t.is_empty())
        .any(|t| lower.contains(&t.to_lowercase()))
        || URL_RE.is_match(text)
}

/// User text and replied-to text, joined and trimmed.
pub(super) fn combine_for_routing(user_text: &str, reply_text: &str) -> String {
    let combined = user_text.trim();
    if reply_text.is_empty() {
        return combined.to_string();
    }
    format!("{combined}\n{reply_text}").trim().to_string()
}

/// Interpret the router's answer. Only the first token counts, so
/// `NO_SEARCH` never matches as `SEARCH`.
pub(super) fn parse_routing_decision(answer: &str) -> Option<bool> {
    let upper = answer.trim().to_uppercase();
    let token = upper
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_matches(|c| matches!(c, ' ' | '.' | '!' | ','));

    if token.starts_with("NO_SEARCH") {
        Some(false)
    } else if token.starts_with("SEARCH") {
        Some(true)
    } else {
        None
    }
}

/// Fail-safe for the model tier: log and answer "no search".
fn no_search_on_failure(reason: &str) -> bool {
    warn!("web-search routing fell back to no search: {reason}");
    false
}

impl Gateway {
    /// Decide whether the turn needs live web search.
    pub(super) async fn should_use_web_search(&self, user_text: &str, reply_text: &str) -> bool {
        let combined = combine_for_routing(user_text, reply_text);

        if contains_trigger(&combined, &self.routing.trigger_words) {
            debug!("web search triggered lexically");
            return true;
        }

        let Some(model) = self.openai.routing_model() else {
            return false;
        };
        if combined.is_empty() {
            return false;
        }

        match self.classify_search(model, &combined).await {
            Ok(Some(decision)) => {
                info!("routing model answered web_search={decision}");
                decision
            }
            Ok(None) => no_search_on_failure("unrecognized routing answer"),
            Err(e) => no_search_on_failure(&e.to_string()),
        }
    }

    /// One classification call to the routing model.
    async fn classify_search(&self, model: &str, combined: &str) -> Result<Option<bool>, BuddyError> {
        let request = ChatRequest::new(
            model,
            vec![
                ChatMessage::system(ROUTER_PROMPT),
                ChatMessage::user(format!("Message to classify:\n{combined}")),
            ],
        );

        let response = self
            .provider
            .complete(&request)
            .await
            .map_err(|e| BuddyError::Routing(e.to_string()))?;

        let answer = response
            .first_text()
            .ok_or_else(|| BuddyError::Routing("no choices in routing response".into()))?;
        Ok(parse_routing_decision(&answer))
    }

    /// Model, options and history window for a turn.
    pub(super) fn routing_decision(&self, web_search: bool, has_media: bool) -> RoutingDecision {
        let model = if web_search && !has_media {
            self.openai.web_search_model()
        } else {
            self.openai.chat_model.as_str()
        };

        let (options, history_limit) = if web_search {
            (ChatOptions::default(), self.routing.search_history_limit)
        } else {
            (
                ChatOptions::with_effort(ReasoningEffort::Low, Verbosity::Low),
                self.routing.history_limit,
            )
        };

        RoutingDecision {
            web_search,
            model: model.to_string(),
            options,
            history_limit,
        }
    }
}

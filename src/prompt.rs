//! Prompt shapes handed to an agent, and ticker scraping from prompt text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const ANALYZE_MARKER: &str = "Analyze this investment opportunity for";
const TICKER_MARKER: &str = "Ticker:";

/// Ticker reported when nothing in the prompt looks like one.
pub const UNKNOWN_TICKER: &str = "unknown";

static QUOTED_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^"(.*?)":"#).expect("quoted key regex should compile"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl PromptMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// What the agent framework passed as the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    /// A chat-style message list
    Messages(Vec<PromptMessage>),
    /// A single content string
    Content(String),
    /// Anything else, already stringified
    Raw(String),
}

impl Prompt {
    /// Parse prompt file text: a JSON array of messages, else plain content.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Vec<PromptMessage>>(text) {
            Ok(messages) => Prompt::Messages(messages),
            Err(_) => Prompt::Content(text.to_string()),
        }
    }

    /// Non-empty message contents, trimmed and joined by a single space.
    pub fn combined_content(&self) -> Option<String> {
        let Prompt::Messages(messages) = self else {
            return None;
        };
        let parts: Vec<&str> = messages
            .iter()
            .map(|m| m.content.trim())
            .filter(|content| !content.is_empty())
            .collect();
        Some(parts.join(" "))
    }
}

/// Scrape a ticker symbol out of the prompt text.
///
/// Only message prompts are scanned. Every message that yields a ticker
/// replaces the previous one, so the last match wins.
pub fn extract_ticker(prompt: &Prompt) -> String {
    let Prompt::Messages(messages) = prompt else {
        return UNKNOWN_TICKER.to_string();
    };

    let mut ticker = UNKNOWN_TICKER.to_string();
    for message in messages.iter().filter(|m| !m.content.is_empty()) {
        if let Some(found) = ticker_from_content(&message.content) {
            ticker = found;
        }
    }
    ticker
}

fn ticker_from_content(content: &str) -> Option<String> {
    if let Some(idx) = content.find(ANALYZE_MARKER) {
        let mut rest = content[idx + ANALYZE_MARKER.len()..].chars();
        // skip the separator after "for"
        rest.next();
        let rest = rest.as_str();
        let end = rest.find(':')?;
        return Some(rest[..end].trim().to_string());
    }

    if let Some(idx) = content.find(TICKER_MARKER) {
        let rest = &content[idx + TICKER_MARKER.len()..];
        let end = rest.find('\n')?;
        return Some(rest[..end].trim().to_string());
    }

    if content.contains('"') && content.contains(':') {
        let tickers: Vec<&str> = content
            .lines()
            .filter_map(|line| QUOTED_KEY.captures(line.trim()))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|candidate| looks_like_ticker(candidate))
            .collect();
        return match tickers.as_slice() {
            [] => None,
            [single] => Some(single.to_string()),
            [first, ..] => Some(format!("multi_{}", first)),
        };
    }

    None
}

fn looks_like_ticker(candidate: &str) -> bool {
    let stripped: String = candidate.chars().filter(|c| *c != '.' && *c != '-').collect();
    !stripped.is_empty() && stripped.chars().all(char::is_alphanumeric)
}

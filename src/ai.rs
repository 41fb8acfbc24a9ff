//! Suggestion provider: asks an OpenAI-compatible chat endpoint to break a
//! task into sub-steps with time estimates.
//!
//! Providers are advisory. Callers treat `Err` and `Ok(None)` the same way:
//! the task is saved without suggestions and a warning is logged.

use crate::config::AiConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A provider-supplied suggestion before list normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSuggestion {
    pub text: String,
    pub time: Option<i64>,
}

#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Suggest sub-steps for `title`. When the task is created under a
    /// parent, `branch_context` carries the branch JSON and `leaf_title`
    /// names the new task inside it. `Ok(None)` means the provider is
    /// disabled or had nothing to say.
    async fn suggest(
        &self,
        title: &str,
        branch_context: Option<&str>,
        leaf_title: Option<&str>,
    ) -> Result<Option<Vec<RawSuggestion>>>;
}

/// Build the provider the config describes; no api_key means disabled.
pub fn provider_from_config(config: &AiConfig) -> Arc<dyn SuggestionProvider> {
    match &config.api_key {
        Some(key) if !key.is_empty() => match OpenAiProvider::new(config, key.clone()) {
            Ok(provider) => Arc::new(provider),
            Err(err) => {
                warn!("failed to build suggestion provider, disabling: {err:#}");
                Arc::new(DisabledProvider)
            }
        },
        _ => Arc::new(DisabledProvider),
    }
}

/// Used when no api_key is configured.
pub struct DisabledProvider;

#[async_trait]
impl SuggestionProvider for DisabledProvider {
    async fn suggest(
        &self,
        _title: &str,
        _branch_context: Option<&str>,
        _leaf_title: Option<&str>,
    ) -> Result<Option<Vec<RawSuggestion>>> {
        Ok(None)
    }
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_suggestions: usize,
}

impl OpenAiProvider {
    pub fn new(config: &AiConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building http client")?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_suggestions: config.max_suggestions,
        })
    }

    fn prompt(&self, title: &str, branch_context: Option<&str>, leaf_title: Option<&str>) -> String {
        match (branch_context, leaf_title) {
            (Some(branch), Some(leaf)) => format!(
                "Here is a task tree I am working on, as JSON:\n{branch}\n\n\
                 I just added the task '{leaf}' to this tree. Suggest up to \
                 {max} short, actionable sub-steps for it that fit the \
                 surrounding plan. Reply with a JSON array of objects like \
                 {{\"text\": \"...\", \"time\": minutes}}.",
                max = self.max_suggestions,
            ),
            _ => format!(
                "I am planning a task: '{title}'. Suggest up to {max} short, \
                 actionable sub-steps with time estimates in minutes. Reply \
                 with a JSON array of objects like \
                 {{\"text\": \"...\", \"time\": minutes}}.",
                max = self.max_suggestions,
            ),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl SuggestionProvider for OpenAiProvider {
    async fn suggest(
        &self,
        title: &str,
        branch_context: Option<&str>,
        leaf_title: Option<&str>,
    ) -> Result<Option<Vec<RawSuggestion>>> {
        let prompt = self.prompt(title, branch_context, leaf_title);
        debug!(model = %self.model, "requesting suggestions");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": "You are a concise productivity assistant."
                    },
                    { "role": "user", "content": prompt }
                ],
                "max_tokens": 300,
            }))
            .send()
            .await
            .context("suggestion request failed")?
            .error_for_status()
            .context("suggestion request rejected")?;

        let reply: ChatResponse = response.json().await.context("decoding reply")?;
        let Some(choice) = reply.choices.into_iter().next() else {
            return Ok(None);
        };
        let mut items = parse_reply(&choice.message.content);
        items.truncate(self.max_suggestions);
        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(items))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplyItem {
    Structured { text: String, time: Option<i64> },
    Text(String),
}

/// Parse the reply contract (a JSON array of `{text, time}` objects, bare
/// strings allowed). Free-text replies degrade to one suggestion per
/// non-empty line with list markers stripped.
fn parse_reply(content: &str) -> Vec<RawSuggestion> {
    let trimmed = content.trim();
    // Models often wrap JSON in a code fence.
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    if let Ok(items) = serde_json::from_str::<Vec<ReplyItem>>(unfenced) {
        return items
            .into_iter()
            .filter_map(|item| match item {
                ReplyItem::Structured { text, time } => {
                    let text = text.trim().to_string();
                    (!text.is_empty()).then_some(RawSuggestion { text, time })
                }
                ReplyItem::Text(text) => {
                    let text = text.trim().to_string();
                    (!text.is_empty()).then_some(RawSuggestion { text, time: None })
                }
            })
            .collect();
    }

    unfenced
        .lines()
        .filter_map(|line| {
            let line = line
                .trim()
                .trim_start_matches(['-', '*', '•'])
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
                .trim();
            (!line.is_empty()).then(|| RawSuggestion {
                text: line.to_string(),
                time: None,
            })
        })
        .collect()
}

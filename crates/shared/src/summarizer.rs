use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use regex::{Captures, Regex};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::config::LlmSettings;
use crate::models::{ArticleGroup, ArticleRecord, SummaryResult};

/// Topics used when rating the trending stream
pub const TRENDING_TOPICS: &str =
    "Software Engineering, Open Source, GitHub Trending, Technology, Programming, AI";

/// Snippet length sent to the model per article, in characters
const SNIPPET_CHARS: usize = 500;

/// What became of one group
#[derive(Debug, Clone, PartialEq)]
pub enum SummarizeOutcome {
    Summarized(SummaryResult),
    /// The model judged the story irrelevant
    Discarded,
    /// Request or response failure
    Failed(String),
}

impl SummarizeOutcome {
    pub fn into_result(self) -> Option<SummaryResult> {
        match self {
            SummarizeOutcome::Summarized(result) => Some(result),
            SummarizeOutcome::Discarded | SummarizeOutcome::Failed(_) => None,
        }
    }
}

/// Prompt configuration for one stream
#[derive(Debug, Clone)]
pub struct StreamPrompts {
    /// System prompt, already filled
    pub system_prompt: String,
    /// User prompt with `{articles}` and `{topics}` slots
    pub prompt_template: String,
    pub topics: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, settings })
    }

    /// Send one system/user message pair and return the trimmed reply text
    pub async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt,
                },
                Message {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: self.settings.max_tokens,
        };

        let url = format!("{}/chat/completions", self.settings.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to completion API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Completion API error: {} - {}", status, error_text);
        }

        let chat_response = response
            .json::<ChatResponse>()
            .await
            .context("Failed to parse completion API response")?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("Completion API response had no message content")?;

        Ok(content.trim().to_string())
    }
}

pub struct Summarizer {
    llm: LlmClient,
    concurrency: usize,
}

impl Summarizer {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let concurrency = settings.concurrency.max(1);
        let llm = LlmClient::new(settings)?;
        Ok(Self { llm, concurrency })
    }

    /// Summarize and score one group. Exactly one request, never retried.
    pub async fn summarize_group(
        &self,
        group: &[ArticleRecord],
        prompts: &StreamPrompts,
    ) -> SummarizeOutcome {
        let articles_text = build_articles_text(group);
        let user_message = fill_prompt(&prompts.prompt_template, &articles_text, &prompts.topics);

        let title = group.first().map(|a| a.title.as_str()).unwrap_or("");

        let response = match self.llm.complete(&prompts.system_prompt, &user_message).await {
            Ok(text) => text,
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(title = %title, error = %reason, "failed to summarize group");
                return SummarizeOutcome::Failed(reason);
            }
        };

        match parse_response(&response, group.len()) {
            Some((score, summary)) => match SummaryResult::from_group(group, summary, score) {
                Some(result) => SummarizeOutcome::Summarized(result),
                None => SummarizeOutcome::Failed("empty group".to_string()),
            },
            None => {
                debug!(title = %title, "model marked group irrelevant");
                SummarizeOutcome::Discarded
            }
        }
    }

    /// Summarize groups with a bounded number of requests in flight.
    ///
    /// Outcomes come back in group order regardless of completion order.
    pub async fn summarize_groups(
        &self,
        groups: &[ArticleGroup],
        prompts: &StreamPrompts,
    ) -> Vec<SummarizeOutcome> {
        stream::iter(groups)
            .map(|group| self.summarize_group(group, prompts))
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Title, link and a 500-character snippet per article, blank line between
pub fn build_articles_text(group: &[ArticleRecord]) -> String {
    group
        .iter()
        .map(|a| {
            let snippet: String = a.summary.chars().take(SNIPPET_CHARS).collect();
            format!(
                "Article title: {}\nArticle URL: {}\nContent/Snippet: {}",
                a.title, a.link, snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fill `{articles}` and `{topics}` in a single pass, so inserted article
/// text is never scanned for placeholders itself.
pub fn fill_prompt(template: &str, articles: &str, topics: &str) -> String {
    static PLACEHOLDER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\{(articles|topics)\}").expect("valid regex"));

    PLACEHOLDER_RE.replace_all(template, |caps: &Captures| match &caps[1] {
        "articles" => articles.to_string(),
        _ => topics.to_string(),
    })
    .into_owned()
}

/// Fill only `{topics}`, used for system prompts
pub fn fill_topics(template: &str, topics: &str) -> String {
    template.replace("{topics}", topics)
}

/// Parse a model reply into `(score, summary)`.
///
/// Returns `None` when the reply starts with `IRRELEVANT`. A leading
/// `SCORE: n` line is consumed only when `n` parses; otherwise the score is 0
/// and the full reply is the summary. For multi-article groups anything from
/// `Sources:` onward is dropped since the links are rendered separately.
pub fn parse_response(response: &str, group_len: usize) -> Option<(i64, String)> {
    let response = response.trim();
    if response.to_uppercase().starts_with("IRRELEVANT") {
        return None;
    }

    let mut score = 0;
    let mut summary_text = response.to_string();

    let lines: Vec<&str> = response.split('\n').collect();
    if let Some(first) = lines.first() {
        if first.to_uppercase().starts_with("SCORE:") {
            let parsed = first
                .split(':')
                .nth(1)
                .and_then(|s| s.trim().parse::<i64>().ok());
            if let Some(n) = parsed {
                score = n;
                summary_text = lines[1..].join("\n").trim().to_string();
            }
        }
    }

    if group_len > 1 {
        if let Some(idx) = summary_text.find("Sources:") {
            summary_text = summary_text[..idx].trim().to_string();
        }
    }

    Some((score, summary_text))
}

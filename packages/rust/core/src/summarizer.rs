//! AI summarization capability.
//!
//! The analyzer depends only on the [`Summarizer`] trait. [`OpenRouterSummarizer`]
//! is the production implementation: an OpenAI-compatible chat-completions call
//! whose untrusted JSON reply is normalized into a [`ScoredSummary`] here, at the
//! boundary, before anything else sees it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use sitesignal_shared::{
    AppConfig, ContentType, Result, ScoredSummary, SiteSignalError, validate_api_key,
};

/// Page text beyond this many characters is not sent to the model.
const MAX_CONTENT_CHARS: usize = 12_000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Produces a scored assessment of page content. An error means "unavailable".
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, content: &str, content_type: ContentType) -> Result<ScoredSummary>;
}

// ---------------------------------------------------------------------------
// OpenRouter
// ---------------------------------------------------------------------------

/// Summarizer backed by OpenRouter's OpenAI-compatible API.
#[derive(Clone)]
pub struct OpenRouterSummarizer {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterSummarizer {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SiteSignalError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build from the `[openrouter]` config section; fails if the API key env var is unset.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = validate_api_key(config)?;
        Self::new(
            api_key,
            &config.openrouter.default_model,
            &config.openrouter.base_url,
        )
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

const SYSTEM_PROMPT: &str = "You are a privacy and security analyst. You read website \
policies and trust pages and assess them for an informed but non-expert audience. \
Respond with a single JSON object and nothing else.";

fn user_prompt(content: &str, content_type: ContentType) -> String {
    let kind = match content_type {
        ContentType::PrivacyPolicy => "privacy policy",
        ContentType::TrustCenter => "trust center / security page",
        ContentType::General => "web page",
    };

    format!(
        "Analyze the following {kind} and respond with JSON using exactly these keys:\n\
         summary (string, 2-3 sentences), keyFindings (array of strings), \
         privacyScore, securityScore, complianceScore (integers 1-10, 10 is best), \
         recommendations (array of strings), risks (array of strings), \
         dataUsageSummary (string), userRightsSummary (string).\n\n\
         ---\n{}",
        truncate_chars(content, MAX_CONTENT_CHARS)
    )
}

#[async_trait]
impl Summarizer for OpenRouterSummarizer {
    #[instrument(skip_all, fields(model = %self.model, content_type = content_type.as_str()))]
    async fn summarize(&self, content: &str, content_type: ContentType) -> Result<ScoredSummary> {
        let prompt = user_prompt(content, content_type);
        let request = ChatRequest {
            model: &self.model,
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
            temperature: 0.2,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("X-Title", "SiteSignal")
            .json(&request)
            .send()
            .await
            .map_err(|e| SiteSignalError::Summarizer(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SiteSignalError::Summarizer(format!("HTTP {status}: {body}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| SiteSignalError::Summarizer(format!("malformed response: {e}")))?;

        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SiteSignalError::Summarizer("empty completion".into()))?;

        debug!(chars = text.len(), "completion received");
        parse_summary(&text, content_type)
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Turn raw model output into a [`ScoredSummary`].
///
/// Accepts camelCase or snake_case keys and tolerates a Markdown code fence
/// around the JSON. Missing text fields become empty; bad scores become neutral.
pub fn parse_summary(raw: &str, source: ContentType) -> Result<ScoredSummary> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| SiteSignalError::parse(format!("model output is not JSON: {e}")))?;

    let obj = value
        .as_object()
        .ok_or_else(|| SiteSignalError::parse("model output is not a JSON object"))?;

    let summary = text_field(obj, "summary", "summary");
    if summary.is_empty() {
        return Err(SiteSignalError::parse("model output has no summary"));
    }

    Ok(ScoredSummary {
        summary,
        key_findings: list_field(obj, "keyFindings", "key_findings"),
        privacy_score: ScoredSummary::normalize_score(field(obj, "privacyScore", "privacy_score")),
        security_score: ScoredSummary::normalize_score(field(
            obj,
            "securityScore",
            "security_score",
        )),
        compliance_score: ScoredSummary::normalize_score(field(
            obj,
            "complianceScore",
            "compliance_score",
        )),
        recommendations: list_field(obj, "recommendations", "recommendations"),
        risks: list_field(obj, "risks", "risks"),
        data_usage_summary: text_field(obj, "dataUsageSummary", "data_usage_summary"),
        user_rights_summary: text_field(obj, "userRightsSummary", "user_rights_summary"),
        source,
    })
}

fn field<'a>(obj: &'a Map<String, Value>, camel: &str, snake: &str) -> Option<&'a Value> {
    obj.get(camel).or_else(|| obj.get(snake))
}

fn text_field(obj: &Map<String, Value>, camel: &str, snake: &str) -> String {
    field(obj, camel, snake)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn list_field(obj: &Map<String, Value>, camel: &str, snake: &str) -> Vec<String> {
    match field(obj, camel, snake) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Strip a surrounding Markdown code fence (```json ... ```), if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

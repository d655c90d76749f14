//! AI bill summaries.
//!
//! A [`Summarizer`] never fails outright: any problem talking to the model
//! yields [`SummaryOutcome::Degraded`] carrying a fixed placeholder summary
//! so the bill can still be stored and reviewed by hand.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Characters of bill text sent to the model.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillSummary {
    #[serde(default)]
    pub brief: String,
    #[serde(default, alias = "key_points")]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub impact: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub confidence: f64,
}

fn default_category() -> String {
    "Other".to_string()
}

fn default_priority() -> Priority {
    Priority::Medium
}

impl BillSummary {
    /// Placeholder stored when the model is unavailable or misbehaves.
    pub fn fallback(title: &str, state: &str) -> Self {
        Self {
            brief: format!(
                "This {} bill titled \"{}\" requires detailed analysis. The full text has been preserved for manual review.",
                state, title
            ),
            key_points: vec![
                "Full bill text available for detailed review".to_string(),
                "Manual analysis required".to_string(),
            ],
            impact: "Impact analysis pending - please review full text".to_string(),
            category: default_category(),
            priority: Priority::Medium,
            confidence: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    Generated(BillSummary),
    Degraded { summary: BillSummary, reason: String },
}

impl SummaryOutcome {
    pub fn summary(&self) -> &BillSummary {
        match self {
            Self::Generated(summary) | Self::Degraded { summary, .. } => summary,
        }
    }

    pub fn into_summary(self) -> BillSummary {
        match self {
            Self::Generated(summary) | Self::Degraded { summary, .. } => summary,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, title: &str, text: &str, state: &str) -> SummaryOutcome;

    /// Model identifier recorded with generated summaries.
    fn model_name(&self) -> Option<&str> {
        None
    }
}

/// Used when no model key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineSummarizer;

#[async_trait]
impl Summarizer for OfflineSummarizer {
    async fn summarize(&self, title: &str, _text: &str, state: &str) -> SummaryOutcome {
        SummaryOutcome::Degraded {
            summary: BillSummary::fallback(title, state),
            reason: "no summarizer configured".to_string(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum SummarizeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no response from model")]
    Empty,
    #[error("malformed summary JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid summary structure: missing {0}")]
    Invalid(&'static str),
}

pub struct GeminiSummarizer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_input_chars: usize,
}

impl GeminiSummarizer {
    pub fn new(api_key: &str) -> Result<Self, reqwest::Error> {
        Self::with_base_url(DEFAULT_GEMINI_BASE_URL, api_key)
    }

    /// Creates a summarizer with a custom base URL. Used for testing.
    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = max;
        self
    }

    async fn generate(
        &self,
        title: &str,
        text: &str,
        state: &str,
    ) -> Result<BillSummary, SummarizeError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let prompt = build_prompt(title, truncate_chars(text, self.max_input_chars), state);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.3,
                "topP": 0.8,
                "topK": 40,
                "maxOutputTokens": 1000
            }
        });

        let resp = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SummarizeError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let reply: GenerateResponse = resp.json().await.map_err(reqwest::Error::without_url)?;
        let content = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .filter(|s| !s.trim().is_empty())
            .ok_or(SummarizeError::Empty)?;

        parse_summary(&content)
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, title: &str, text: &str, state: &str) -> SummaryOutcome {
        let started = Instant::now();
        tracing::debug!("Summarizing bill: {} ({} characters)", title, text.chars().count());

        match self.generate(title, text, state).await {
            Ok(summary) => {
                tracing::debug!("Summary completed in {}ms", started.elapsed().as_millis());
                SummaryOutcome::Generated(summary)
            }
            Err(e) => {
                tracing::warn!(
                    "Summary for \"{}\" failed after {}ms: {}",
                    title,
                    started.elapsed().as_millis(),
                    e
                );
                SummaryOutcome::Degraded {
                    summary: BillSummary::fallback(title, state),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn model_name(&self) -> Option<&str> {
        Some(&self.model)
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

fn parse_summary(content: &str) -> Result<BillSummary, SummarizeError> {
    let summary: BillSummary = serde_json::from_str(clean_json_response(content))?;
    if summary.brief.trim().is_empty() {
        return Err(SummarizeError::Invalid("brief"));
    }
    if summary.key_points.is_empty() {
        return Err(SummarizeError::Invalid("keyPoints"));
    }
    if summary.impact.trim().is_empty() {
        return Err(SummarizeError::Invalid("impact"));
    }
    Ok(summary)
}

/// Strips a surrounding Markdown code fence (with or without a `json` tag).
pub fn clean_json_response(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn build_prompt(title: &str, text: &str, state: &str) -> String {
    format!(
        r#"You are an expert policy analyst. Analyze this {state} state legislation and provide a comprehensive summary.

BILL TITLE: {title}

BILL TEXT:
{text}

Please provide a JSON response with the following structure:
{{
  "brief": "A concise 2-3 sentence summary for general public consumption",
  "keyPoints": ["3-5 bullet points covering the main provisions"],
  "impact": "Who this affects and how (citizens, businesses, environment, etc.)",
  "category": "One of: Education, Healthcare, Environment, Economy, Transportation, Criminal Justice, Technology, Housing, Agriculture, Other",
  "priority": "LOW, MEDIUM, HIGH, or CRITICAL based on scope of impact",
  "confidence": 0.85
}}

Focus on:
- Clear, accessible language for non-experts
- Practical implications for residents
- Key stakeholders affected
- Timeline if mentioned
- Funding/budget implications if any

Avoid political bias and stick to factual analysis."#
    )
}

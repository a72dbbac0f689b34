//! Hosted LLM client for answer generation.
//!
//! The [`AnswerGenerator`] trait is the seam between chat orchestration and
//! the external API: production uses [`GeminiGenerator`] (the
//! `generateContent` endpoint), startup without an API key uses
//! [`DisabledGenerator`], and tests substitute mocks. Generation failures
//! surface as errors here; chat orchestration converts them into in-band
//! answer strings so the found-content fact is never lost.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::LlmConfig;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Fixed prompt template wrapping retrieved fragments and the question.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an AI assistant that answers questions based on uploaded documents. \
Please provide accurate, helpful answers based solely on the information provided.\n\
\n\
Document Content:\n\
{context}\n\
\n\
User Question: {question}\n\
\n\
Instructions:\n\
- Answer the question based only on the information in the documents above\n\
- Be specific and detailed when possible\n\
- If the exact information isn't available, say so clearly\n\
- Keep your answer concise but informative\n\
- Use a friendly, helpful tone\n\
\n\
Answer:"
    )
}

/// Trait for answer generation backends.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate an answer to `question` grounded in `context` (the joined
    /// retrieved fragments).
    async fn answer(&self, context: &str, question: &str) -> Result<String>;
}

/// Instantiate the configured generator. A missing API key yields the
/// disabled generator rather than a startup failure.
pub fn create_generator(config: &LlmConfig) -> Result<Box<dyn AnswerGenerator>> {
    if !config.is_enabled() {
        return Ok(Box::new(DisabledGenerator));
    }
    match std::env::var(&config.api_key_env) {
        Ok(api_key) if !api_key.is_empty() => {
            Ok(Box::new(GeminiGenerator::new(config.clone(), api_key)?))
        }
        _ => {
            tracing::warn!(
                key_env = %config.api_key_env,
                "LLM API key not set, answer generation disabled"
            );
            Ok(Box::new(DisabledGenerator))
        }
    }
}

/// Generator used when no API key is configured. Always errors; chat
/// orchestration turns the error into an explanatory answer.
pub struct DisabledGenerator;

#[async_trait]
impl AnswerGenerator for DisabledGenerator {
    async fn answer(&self, _context: &str, _question: &str) -> Result<String> {
        bail!("LLM API is not configured")
    }
}

/// Generator calling the Gemini `generateContent` API.
pub struct GeminiGenerator {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

impl GeminiGenerator {
    pub fn new(config: LlmConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    async fn answer(&self, context: &str, question: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            GEMINI_API_BASE, self.config.model
        );
        let body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": build_prompt(context, question) }]
            }]
        });

        let mut attempt = 0u32;
        loop {
            let result = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await;

            let retryable = match &result {
                Ok(resp) => {
                    let status = resp.status();
                    status.as_u16() == 429 || status.is_server_error()
                }
                Err(_) => true,
            };

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: GenerateResponse = resp
                        .json()
                        .await
                        .context("Failed to parse Gemini response")?;
                    let text = parsed
                        .candidates
                        .into_iter()
                        .next()
                        .and_then(|c| c.content.parts.into_iter().next())
                        .map(|p| p.text)
                        .context("Gemini response contained no candidates")?;
                    return Ok(text);
                }
                Ok(resp) if !retryable => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    bail!("Gemini API error {}: {}", status, text);
                }
                _ if attempt >= self.config.max_retries => {
                    bail!("Gemini API failed after {} retries", self.config.max_retries);
                }
                _ => {
                    let backoff = Duration::from_secs(1 << attempt.min(5));
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

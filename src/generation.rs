//! Answer synthesis backends.
//!
//! A [`Generator`] turns a question plus the passages retrieved for it into a
//! natural-language answer:
//! - **[`OpenAIGenerator`]**: chat completions (`POST {url}/chat/completions`).
//! - **[`OllamaGenerator`]**: `POST {url}/api/generate` with streaming off.
//! - **[`ExtractiveGenerator`]**: no model; answers with the best passage.
//!
//! An empty answer is not an error here; the query resolver reports it as
//! "no relevant result".

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::embedding::{http_client, resolve_api_key};
use crate::error::PipelineError;
use crate::models::RetrievedPassage;

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;
    async fn answer(&self, question: &str, passages: &[RetrievedPassage]) -> Result<String>;
}

/// Renders retrieved passages as numbered context blocks.
pub fn build_context(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}] file_name: {}\n\n{}", i + 1, p.file_name, p.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Question-answering prompt grounded in the retrieved context.
pub fn build_prompt(question: &str, passages: &[RetrievedPassage]) -> String {
    format!(
        "Context information is below.\n\
         ---------------------\n\
         {context}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, answer the query.\n\
         Query: {question}\n\
         Answer: ",
        context = build_context(passages),
        question = question
    )
}

// ============ OpenAI ============

pub struct OpenAIGenerator {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAIGenerator {
    /// Fails with a configuration error when the API key is missing.
    pub fn new(config: &GenerationConfig) -> std::result::Result<Self, PipelineError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string()),
            api_key: resolve_api_key(&config.api_key_env)?,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn answer(&self, question: &str, passages: &[RetrievedPassage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "user", "content": build_prompt(question, passages) }
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenAI chat request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }
        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .map(|c| c.as_str().unwrap_or_default().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message"))
}

// ============ Ollama ============

pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> std::result::Result<Self, PipelineError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn answer(&self, question: &str, passages: &[RetrievedPassage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": build_prompt(question, passages),
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Ollama connection error (is Ollama running at {}?)", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }
        let json: serde_json::Value = response.json().await?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
    }
}

// ============ Extractive ============

/// Answers with the highest-scoring passage verbatim.
pub struct ExtractiveGenerator;

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn model_name(&self) -> &str {
        "extractive"
    }

    async fn answer(&self, _question: &str, passages: &[RetrievedPassage]) -> Result<String> {
        Ok(passages
            .iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
            .map(|p| p.text.clone())
            .unwrap_or_default())
    }
}

/// Builds the configured generator. Missing credentials fail here, at startup.
pub fn create_generator(
    config: &GenerationConfig,
) -> std::result::Result<Arc<dyn Generator>, PipelineError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        "extractive" => Ok(Arc::new(ExtractiveGenerator)),
        other => Err(PipelineError::configuration(format!(
            "Unknown generation provider: {}",
            other
        ))),
    }
}

//! Answer generation.
//!
//! Defines the [`Generator`] trait and its providers:
//! - **[`DisabledGenerator`]**: always errors; every answer falls back to the template.
//! - **[`OllamaGenerator`]**: `POST {url}/api/generate` on a local Ollama instance.
//! - **[`OpenAIGenerator`]**: `POST {url}/chat/completions` on an OpenAI-compatible API.
//!
//! [`GenerationStage`] wraps a generator with a timeout. Any failure
//! (transport error, non-2xx status, malformed body, timeout) yields a
//! [`GenerationFailure`] carrying the deterministic fallback text, so a
//! successful extraction always produces something readable. There are no
//! retries.

pub mod prompt;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::GenerationConfig;
use crate::extraction::{elapsed_ms, ExtractionPayload};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// One completion request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A text-generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier, reported by `/health`.
    fn model_name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Cheap reachability check for `/health`. Errors when the backend
    /// cannot be reached.
    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

// ============ Disabled ============

pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        bail!("Generation provider is disabled")
    }

    async fn health(&self) -> Result<()> {
        bail!("Generation provider is disabled")
    }
}

// ============ Ollama ============

pub struct OllamaGenerator {
    model: String,
    url: String,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            model,
            url: url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder().build()?,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "system": request.system,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            },
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_ollama_response(&json)
    }

    async fn health(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            bail!("Ollama API error {}", response.status());
        }
        Ok(())
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<String> {
    let text = json
        .get("response")
        .and_then(|r| r.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response text"))?;
    Ok(text.trim().to_string())
}

// ============ OpenAI ============

pub struct OpenAIGenerator {
    model: String,
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    /// # Errors
    ///
    /// Returns an error if `model` is not set or `OPENAI_API_KEY` is not in
    /// the environment.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());

        Ok(Self {
            model,
            url: url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::builder().build()?,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_openai_response(&json)
    }

    async fn health(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/models", self.url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            bail!("OpenAI API error {}", response.status());
        }
        Ok(())
    }
}

fn parse_openai_response(json: &serde_json::Value) -> Result<String> {
    let text = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))?;
    Ok(text.trim().to_string())
}

/// Instantiate the generator named by `generation.provider`.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

// ============ Stage ============

#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub model: String,
}

/// Generation failed; `fallback` is the template answer for the same records.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GenerationFailure {
    pub message: String,
    pub fallback: String,
}

pub struct GenerationStage {
    generator: Arc<dyn Generator>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl GenerationStage {
    pub fn new(generator: Arc<dyn Generator>, config: &GenerationConfig) -> Self {
        Self {
            generator,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Override the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    pub async fn health(&self) -> Result<()> {
        self.generator.health().await
    }

    pub async fn generate(
        &self,
        payload: &ExtractionPayload,
    ) -> Result<GeneratedAnswer, GenerationFailure> {
        let request = GenerationRequest {
            prompt: prompt::build_prompt(payload),
            system: prompt::system_message(&payload.intent.intent),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.generator.generate(&request)).await;
        let elapsed = elapsed_ms(started);

        let message = match outcome {
            Ok(Ok(answer)) => {
                tracing::info!(
                    model = self.generator.model_name(),
                    chars = answer.len(),
                    elapsed_ms = elapsed,
                    "generated answer"
                );
                return Ok(GeneratedAnswer {
                    answer,
                    model: self.generator.model_name().to_string(),
                });
            }
            Ok(Err(e)) => format!("Error generating response: {}", e),
            Err(_) => format!(
                "Error generating response: timed out after {}s",
                self.timeout.as_secs_f64()
            ),
        };

        tracing::warn!(error = %message, elapsed_ms = elapsed, "generation failed, using fallback");
        Err(GenerationFailure {
            message,
            fallback: prompt::fallback_answer(&payload.intent.intent, &payload.phones),
        })
    }
}

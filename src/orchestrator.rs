//! Two-stage pipeline with timing and a uniform response envelope.
//!
//! ```text
//! START -> EXTRACTION --ok--> GENERATION --ok--> DONE (success)
//!              |                   |
//!              +--err--> DONE      +--err--> DONE (fallback_data)
//! ```
//!
//! Each stage runs in its own task. A panic during extraction is reported
//! as `PROCESSING_ERROR`; a panic during generation is reported as
//! `GENERATION_ERROR` with the template fallback. Neither stage is retried.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

use phone_advisor_core::catalog::CatalogIndex;
use phone_advisor_core::intent::IntentClassifier;
use phone_advisor_core::store::PhoneStore;

use crate::config::Config;
use crate::extraction::{elapsed_ms, ErrorDetail, ExtractionError, ExtractionPayload, ExtractionStage};
use crate::generation::{create_generator, prompt, GenerationFailure, GenerationStage};
use crate::retrieval::RetrievalExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
}

/// The stage that failed, or `None` on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Generation,
    None,
}

/// Wall-clock milliseconds, rounded to two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Timings {
    pub extraction_ms: f64,
    pub generation_ms: f64,
    pub total_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineEnvelope {
    pub query_id: String,
    pub question: String,
    pub status: Status,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Model that produced `answer`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ExtractionPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_data: Option<String>,
    pub timings: Timings,
}

impl PipelineEnvelope {
    /// `error_type` of the failure, if any.
    pub fn error_type(&self) -> Option<&'static str> {
        self.error.as_ref().map(|e| e.error_type)
    }
}

pub struct Pipeline {
    extraction: Arc<ExtractionStage>,
    generation: Arc<GenerationStage>,
}

impl Pipeline {
    pub fn new(extraction: ExtractionStage, generation: GenerationStage) -> Self {
        Self {
            extraction: Arc::new(extraction),
            generation: Arc::new(generation),
        }
    }

    /// Wire both stages from configuration.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn PhoneStore>,
        catalog: Arc<CatalogIndex>,
    ) -> anyhow::Result<Self> {
        let executor = RetrievalExecutor::new(
            store,
            Duration::from_secs(config.retrieval.timeout_secs),
        );
        let extraction = ExtractionStage::new(
            IntentClassifier::new()?,
            catalog,
            executor,
            config.retrieval.fuzzy_threshold,
            config.retrieval.suggestion_threshold,
        );
        let generator = create_generator(&config.generation)?;
        let generation = GenerationStage::new(generator, &config.generation);
        Ok(Self::new(extraction, generation))
    }

    pub fn model_name(&self) -> &str {
        self.generation.model_name()
    }

    /// Reachability of the generation backend.
    pub async fn generator_health(&self) -> anyhow::Result<()> {
        self.generation.health().await
    }

    /// Answer one question. Never fails; every outcome is an envelope.
    pub async fn answer(&self, question: &str) -> PipelineEnvelope {
        let query_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("query", query_id = %query_id);
        self.run(query_id, question).instrument(span).await
    }

    async fn run(&self, query_id: String, question: &str) -> PipelineEnvelope {
        let started = Instant::now();
        tracing::info!(question, "answering question");

        let mut envelope = PipelineEnvelope {
            query_id,
            question: question.to_string(),
            status: Status::Error,
            stage: Stage::Extraction,
            answer: None,
            model: None,
            payload: None,
            error: None,
            fallback_data: None,
            timings: Timings::default(),
        };

        let extraction_started = Instant::now();
        let stage = Arc::clone(&self.extraction);
        let owned = question.to_string();
        let task = tokio::spawn(
            async move { stage.extract(&owned).await }.instrument(tracing::Span::current()),
        );
        let extracted = match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "extraction task failed");
                Err(ExtractionError::Processing(format!("Extraction task failed: {}", e)))
            }
        };
        envelope.timings.extraction_ms = elapsed_ms(extraction_started);

        let payload = match extracted {
            Ok(payload) => payload,
            Err(e) => {
                tracing::info!(error_type = e.error_type(), "extraction failed");
                envelope.error = Some(e.to_detail(question));
                envelope.timings.total_ms = elapsed_ms(started);
                return envelope;
            }
        };

        let generation_started = Instant::now();
        let stage = Arc::clone(&self.generation);
        let owned = payload.clone();
        let task = tokio::spawn(
            async move { stage.generate(&owned).await }.instrument(tracing::Span::current()),
        );
        let generated = match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "generation task failed");
                Err(GenerationFailure {
                    message: format!("Error generating response: generation task failed: {}", e),
                    fallback: prompt::fallback_answer(&payload.intent.intent, &payload.phones),
                })
            }
        };
        envelope.timings.generation_ms = elapsed_ms(generation_started);

        match generated {
            Ok(generated) => {
                envelope.status = Status::Success;
                envelope.stage = Stage::None;
                envelope.answer = Some(generated.answer);
                envelope.model = Some(generated.model);
            }
            Err(failure) => {
                envelope.stage = Stage::Generation;
                envelope.error = Some(ErrorDetail {
                    error_type: "GENERATION_ERROR",
                    message: failure.message,
                    suggestion: None,
                    matches: Vec::new(),
                    validation: None,
                    original_query: question.to_string(),
                });
                envelope.fallback_data = Some(failure.fallback);
            }
        }
        envelope.payload = Some(payload);
        envelope.timings.total_ms = elapsed_ms(started);

        tracing::info!(
            status = ?envelope.status,
            total_ms = envelope.timings.total_ms,
            "question answered"
        );
        envelope
    }
}

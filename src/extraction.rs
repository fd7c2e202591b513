//! Extraction stage: question in, validated records or a typed error out.
//!
//! Composes the classifier, focus extractor, resolver, query builder, and
//! retrieval executor, then decides the outcome:
//!
//! 1. no records: [`ExtractionError::NoMatch`], with a suggestion built
//!    from catalog names scoring at least the suggestion threshold against
//!    the raw question;
//! 2. a single-entity question returning several records:
//!    [`ExtractionError::MultipleMatches`] listing up to three names;
//! 3. records missing intent-required attributes:
//!    [`ExtractionError::IncompleteData`] with the validation report;
//! 4. otherwise an [`ExtractionPayload`].
//!
//! The resolver and executor never fail; this is the only place errors
//! are classified.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use phone_advisor_core::catalog::CatalogIndex;
use phone_advisor_core::focus::{extract_criteria, extract_focus, Focus};
use phone_advisor_core::intent::IntentClassifier;
use phone_advisor_core::models::{Field, Intent, IntentResult, Phone, ResolvedEntity};
use phone_advisor_core::query::{build_query, Constraint, RetrievalRequest};
use phone_advisor_core::validation::{validate, ValidationReport};

use crate::retrieval::RetrievalExecutor;

/// Maximum names listed in a multiple-matches error.
const MAX_LISTED_MATCHES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonType {
    TwoEntities,
    MultipleEntities,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FiltersApplied {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
}

/// Framing hints handed to the generation stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionContext {
    pub focus: Focus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_type: Option<ComparisonType>,
    pub filters_applied: FiltersApplied,
    pub user_criteria: Vec<Focus>,
}

/// Successful extraction result.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionPayload {
    pub query: String,
    pub intent: IntentResult,
    pub focus: Focus,
    pub entities: Vec<ResolvedEntity>,
    pub phones: Vec<Phone>,
    pub context: ExtractionContext,
    pub retrieval_ms: f64,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("No phones found matching your query")]
    NoMatch { suggestion: Option<String> },

    #[error("Multiple phones found matching your query")]
    MultipleMatches { candidates: Vec<String> },

    #[error("Some phone data is incomplete")]
    IncompleteData { report: ValidationReport },

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Client-facing error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub error_type: &'static str,
    pub message: String,
    pub suggestion: Option<String>,
    pub matches: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    pub original_query: String,
}

impl ExtractionError {
    /// Stable machine-readable error code.
    pub fn error_type(&self) -> &'static str {
        match self {
            ExtractionError::NoMatch { .. } => "NO_MATCH",
            ExtractionError::MultipleMatches { .. } => "MULTIPLE_MATCHES",
            ExtractionError::IncompleteData { .. } => "INCOMPLETE_DATA",
            ExtractionError::Processing(_) => "PROCESSING_ERROR",
        }
    }

    pub fn to_detail(&self, original_query: &str) -> ErrorDetail {
        let mut detail = ErrorDetail {
            error_type: self.error_type(),
            message: self.to_string(),
            suggestion: None,
            matches: Vec::new(),
            validation: None,
            original_query: original_query.to_string(),
        };
        match self {
            ExtractionError::NoMatch { suggestion } => detail.suggestion = suggestion.clone(),
            ExtractionError::MultipleMatches { candidates } => {
                detail.matches = candidates.clone();
                detail.suggestion = Some("Please specify which phone you meant".to_string());
            }
            ExtractionError::IncompleteData { report } => detail.validation = Some(report.clone()),
            ExtractionError::Processing(_) => {}
        }
        detail
    }
}

pub struct ExtractionStage {
    classifier: IntentClassifier,
    catalog: Arc<CatalogIndex>,
    executor: RetrievalExecutor,
    fuzzy_threshold: u8,
    suggestion_threshold: u8,
}

impl ExtractionStage {
    pub fn new(
        classifier: IntentClassifier,
        catalog: Arc<CatalogIndex>,
        executor: RetrievalExecutor,
        fuzzy_threshold: u8,
        suggestion_threshold: u8,
    ) -> Self {
        Self {
            classifier: classifier.with_threshold(fuzzy_threshold),
            catalog,
            executor,
            fuzzy_threshold,
            suggestion_threshold,
        }
    }

    pub async fn extract(&self, query: &str) -> Result<ExtractionPayload, ExtractionError> {
        let catalog = self.catalog.snapshot();

        let intent = self.classifier.classify(query, &catalog);
        let focus = extract_focus(query);
        tracing::info!(
            intent = %intent.intent,
            confidence = intent.confidence,
            focus = %focus,
            "classified query"
        );

        let entities: Vec<ResolvedEntity> = if intent.intent.names_entities() {
            intent
                .extracted_literals
                .iter()
                .filter_map(|literal| catalog.best_match(literal, self.fuzzy_threshold))
                .collect()
        } else {
            Vec::new()
        };
        let mut names: Vec<String> = Vec::new();
        for entity in &entities {
            if !names.contains(&entity.canonical_name) {
                names.push(entity.canonical_name.clone());
            }
        }

        let request = build_query(&intent.intent, &names, focus);
        tracing::debug!(?request, "built retrieval request");

        let started = Instant::now();
        let phones = self.executor.execute(&request).await;
        let retrieval_ms = elapsed_ms(started);
        tracing::info!(phones = phones.len(), elapsed_ms = retrieval_ms, "retrieval finished");

        if phones.is_empty() {
            let suggestion = suggest(&catalog.resolve(query, self.suggestion_threshold));
            return Err(ExtractionError::NoMatch { suggestion });
        }

        if intent.intent == Intent::SingleEntity && phones.len() > 1 {
            return Err(ExtractionError::MultipleMatches {
                candidates: phones
                    .iter()
                    .take(MAX_LISTED_MATCHES)
                    .map(|p| p.model_name.clone())
                    .collect(),
            });
        }

        let report = validate(&intent.intent, &phones);
        if !report.is_valid {
            return Err(ExtractionError::IncompleteData { report });
        }

        let context = ExtractionContext {
            focus,
            comparison_type: comparison_type(&intent.intent, phones.len()),
            filters_applied: filters_applied(&request),
            user_criteria: extract_criteria(query),
        };

        Ok(ExtractionPayload {
            query: query.to_string(),
            intent,
            focus,
            entities,
            phones,
            context,
            retrieval_ms,
        })
    }
}

/// Milliseconds since `started`, rounded to two decimals.
pub fn elapsed_ms(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0
}

fn suggest(candidates: &[ResolvedEntity]) -> Option<String> {
    match candidates {
        [] => None,
        [only] => Some(format!("Try '{}'", only.canonical_name)),
        [first, second, ..] => Some(format!(
            "Try '{}' or '{}'",
            first.canonical_name, second.canonical_name
        )),
    }
}

fn comparison_type(intent: &Intent, count: usize) -> Option<ComparisonType> {
    match intent {
        Intent::Comparison if count == 2 => Some(ComparisonType::TwoEntities),
        Intent::Comparison => Some(ComparisonType::MultipleEntities),
        _ => None,
    }
}

fn filters_applied(request: &RetrievalRequest) -> FiltersApplied {
    let max_price = request
        .filters
        .iter()
        .find_map(|(field, constraint)| match (field, constraint) {
            (Field::PriceUsd, Constraint::AtMost(cap)) => Some(*cap),
            _ => None,
        });
    FiltersApplied {
        max_price,
        sort_by: request.order_by.first().map(|o| o.key.to_string()),
    }
}

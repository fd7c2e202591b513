//! `advisor ask`: answer one question from the command line.

use anyhow::{bail, Result};
use std::sync::Arc;

use phone_advisor_core::catalog::CatalogIndex;
use phone_advisor_core::store::PhoneStore;

use crate::config::Config;
use crate::db;
use crate::orchestrator::{Pipeline, PipelineEnvelope, Status};
use crate::sqlite_store::SqliteStore;

pub async fn run_ask(config: &Config, question: &str, json: bool) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        bail!("question must not be empty");
    }

    let pool = db::connect(config).await?;
    let store: Arc<dyn PhoneStore> = Arc::new(SqliteStore::new(pool));
    let catalog = Arc::new(CatalogIndex::default());
    catalog.refresh(store.as_ref()).await?;

    let pipeline = Pipeline::from_config(config, store, catalog)?;
    let envelope = pipeline.answer(question).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        print!("{}", render(&envelope));
    }
    Ok(())
}

/// Human-readable rendering of an envelope.
pub fn render(envelope: &PipelineEnvelope) -> String {
    let mut out = String::new();
    if envelope.status == Status::Success {
        if let Some(answer) = &envelope.answer {
            out.push_str(answer);
            out.push('\n');
        }
    } else if let Some(error) = &envelope.error {
        out.push_str(&format!("{}: {}\n", error.error_type, error.message));
        if let Some(suggestion) = &error.suggestion {
            out.push_str(&format!("{}\n", suggestion));
        }
        if !error.matches.is_empty() {
            out.push_str(&format!("Matches: {}\n", error.matches.join(", ")));
        }
        if let Some(fallback) = &envelope.fallback_data {
            out.push('\n');
            out.push_str(fallback);
            out.push('\n');
        }
    }
    out.push_str(&format!(
        "\n[{}] extraction {:.2}ms, generation {:.2}ms, total {:.2}ms\n",
        envelope.query_id,
        envelope.timings.extraction_ms,
        envelope.timings.generation_ms,
        envelope.timings.total_ms
    ));
    out
}

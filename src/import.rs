//! Catalog import from a JSON file.
//!
//! Reads a JSON array of phone objects (the shape of [`Phone`], with
//! unknown attributes omitted or `null`) and upserts each by model name.
//! Stands in for a catalog scraper: anything that can emit that JSON can
//! feed the database.

use anyhow::{bail, Context, Result};
use std::path::Path;

use phone_advisor_core::models::Phone;
use phone_advisor_core::store::PhoneStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub imported: usize,
    pub total: u64,
}

/// Parse a catalog file. Blank model names are rejected.
pub fn parse_catalog(content: &str) -> Result<Vec<Phone>> {
    let mut phones: Vec<Phone> =
        serde_json::from_str(content).context("Catalog must be a JSON array of phone objects")?;

    for (i, phone) in phones.iter_mut().enumerate() {
        let trimmed = phone.model_name.trim();
        if trimmed.is_empty() {
            bail!("Catalog entry {} has a blank model_name", i);
        }
        phone.model_name = trimmed.to_string();
    }
    Ok(phones)
}

/// Upsert every phone into the store.
pub async fn import_phones(store: &dyn PhoneStore, phones: &[Phone]) -> Result<ImportStats> {
    for phone in phones {
        store
            .upsert_phone(phone)
            .await
            .with_context(|| format!("Failed to import {}", phone.model_name))?;
        tracing::debug!(model_name = %phone.model_name, "imported phone");
    }
    Ok(ImportStats {
        imported: phones.len(),
        total: store.count_phones().await?,
    })
}

/// CLI entry point for `advisor import <file>`.
pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
    let phones = parse_catalog(&content)?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let stats = import_phones(&store, &phones).await?;
    pool.close().await;

    tracing::info!(imported = stats.imported, total = stats.total, "import finished");
    println!(
        "Imported {} phones ({} in catalog).",
        stats.imported, stats.total
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use phone_advisor_core::store::memory::InMemoryStore;

    #[test]
    fn test_parse_catalog_trims_names_and_keeps_nulls() {
        let phones = parse_catalog(
            r#"[{"model_name": " Galaxy S23 ", "battery_mah": 3900, "price_usd": null}]"#,
        )
        .unwrap();
        assert_eq!(phones[0].model_name, "Galaxy S23");
        assert_eq!(phones[0].battery_mah, Some(3900));
        assert_eq!(phones[0].price_usd, None);
    }

    #[test]
    fn test_parse_catalog_rejects_blank_names() {
        let err = parse_catalog(r#"[{"model_name": "Galaxy S23"}, {"model_name": "  "}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn test_parse_catalog_rejects_non_array() {
        assert!(parse_catalog(r#"{"model_name": "Galaxy S23"}"#).is_err());
    }

    #[tokio::test]
    async fn test_import_upserts() {
        let store = InMemoryStore::new();
        let phones = parse_catalog(
            r#"[{"model_name": "Galaxy S23"}, {"model_name": "Galaxy A54"}, {"model_name": "Galaxy S23", "battery_mah": 3900}]"#,
        )
        .unwrap();
        let stats = import_phones(&store, &phones).await.unwrap();
        assert_eq!(stats, ImportStats { imported: 3, total: 2 });
        let s23 = store.get_phone("Galaxy S23").await.unwrap().unwrap();
        assert_eq!(s23.battery_mah, Some(3900));
    }
}

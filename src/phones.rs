//! Catalog browsing: paginated listing and lookup by name.
//!
//! Shared by the `advisor phones` / `advisor show` commands and the
//! `GET /phones` endpoints.

use anyhow::{bail, Result};
use serde::Serialize;

use phone_advisor_core::catalog::CatalogSnapshot;
use phone_advisor_core::models::Phone;
use phone_advisor_core::store::PhoneStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct PhonePage {
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub phones: Vec<Phone>,
}

/// One page of the catalog, ordered by model name.
pub async fn list_page(store: &dyn PhoneStore, limit: u32, offset: u32) -> Result<PhonePage> {
    if limit == 0 || limit > MAX_PAGE_SIZE {
        bail!("limit must be between 1 and {}", MAX_PAGE_SIZE);
    }
    Ok(PhonePage {
        total: store.count_phones().await?,
        limit,
        offset,
        phones: store.list_phones(limit, offset).await?,
    })
}

/// Exact lookup, then the best fuzzy match above `threshold`.
pub async fn find_phone(
    store: &dyn PhoneStore,
    catalog: &CatalogSnapshot,
    name: &str,
    threshold: u8,
) -> Result<Option<Phone>> {
    if let Some(phone) = store.get_phone(name).await? {
        return Ok(Some(phone));
    }
    match catalog.best_match(name, threshold) {
        Some(best) => store.get_phone(&best.canonical_name).await,
        None => Ok(None),
    }
}

fn show(value: Option<String>) -> String {
    value.unwrap_or_else(|| "unknown".to_string())
}

/// CLI entry point for `advisor phones`.
pub async fn run_phones(config: &Config, limit: u32, offset: u32) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let page = list_page(&store, limit, offset).await?;
    pool.close().await;

    if page.phones.is_empty() {
        println!("No phones found.");
        return Ok(());
    }
    println!(
        "{} of {} phones (offset {}):",
        page.phones.len(),
        page.total,
        page.offset
    );
    for phone in &page.phones {
        println!(
            "  {:<28} battery={:<8} camera={:<8} price={}",
            phone.model_name,
            show(phone.battery_mah.map(|v| format!("{}mAh", v))),
            show(phone.main_camera_mp.map(|v| format!("{}MP", v))),
            show(phone.price_usd.map(|v| format!("${:.2}", v))),
        );
    }
    Ok(())
}

/// CLI entry point for `advisor show <name>`.
pub async fn run_show(config: &Config, name: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let catalog = CatalogSnapshot::new(store.list_model_names().await?);
    let found = find_phone(&store, &catalog, name, config.retrieval.fuzzy_threshold).await?;
    pool.close().await;

    match found {
        Some(phone) => {
            println!("{}", serde_json::to_string_pretty(&phone)?);
            Ok(())
        }
        None => bail!("phone not found: {}", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phone_advisor_core::store::memory::InMemoryStore;

    fn store() -> InMemoryStore {
        InMemoryStore::with_phones(vec![
            Phone::named("Galaxy S23"),
            Phone::named("Galaxy Z Flip5"),
            Phone::named("Galaxy A54"),
        ])
    }

    #[tokio::test]
    async fn test_list_page_bounds() {
        let store = store();
        assert!(list_page(&store, 0, 0).await.is_err());
        assert!(list_page(&store, 101, 0).await.is_err());
        let page = list_page(&store, 2, 0).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.phones.len(), 2);
        let past_end = list_page(&store, 10, 5).await.unwrap();
        assert!(past_end.phones.is_empty());
    }

    #[tokio::test]
    async fn test_find_phone_exact_then_fuzzy() {
        let store = store();
        let catalog = CatalogSnapshot::new(store.list_model_names().await.unwrap());
        let exact = find_phone(&store, &catalog, "Galaxy S23", 80).await.unwrap();
        assert_eq!(exact.unwrap().model_name, "Galaxy S23");
        let fuzzy = find_phone(&store, &catalog, "flip 5", 80).await.unwrap();
        assert_eq!(fuzzy.unwrap().model_name, "Galaxy Z Flip5");
        assert!(find_phone(&store, &catalog, "Pixel 8", 80).await.unwrap().is_none());
    }
}

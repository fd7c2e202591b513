//! Fail-soft retrieval.
//!
//! [`RetrievalExecutor`] runs a [`RetrievalRequest`] against the store under
//! a timeout. Store errors and timeouts are logged and become an empty
//! result; classifying "nothing found" is left to the extraction stage.

use std::sync::Arc;
use std::time::Duration;

use phone_advisor_core::models::Phone;
use phone_advisor_core::query::RetrievalRequest;
use phone_advisor_core::store::PhoneStore;

pub struct RetrievalExecutor {
    store: Arc<dyn PhoneStore>,
    timeout: Duration,
}

impl RetrievalExecutor {
    pub fn new(store: Arc<dyn PhoneStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn execute(&self, request: &RetrievalRequest) -> Vec<Phone> {
        match tokio::time::timeout(self.timeout, self.store.fetch(request)).await {
            Ok(Ok(phones)) => phones,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "retrieval failed, returning no records");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs_f64(),
                    "retrieval timed out, returning no records"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use phone_advisor_core::focus::Focus;
    use phone_advisor_core::models::Intent;
    use phone_advisor_core::query::build_query;
    use phone_advisor_core::store::memory::InMemoryStore;

    /// A store whose reads always fail or hang.
    struct BrokenStore {
        hang: bool,
    }

    #[async_trait]
    impl PhoneStore for BrokenStore {
        async fn upsert_phone(&self, _phone: &Phone) -> Result<()> {
            anyhow::bail!("read-only")
        }
        async fn list_model_names(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn get_phone(&self, _model_name: &str) -> Result<Option<Phone>> {
            Ok(None)
        }
        async fn list_phones(&self, _limit: u32, _offset: u32) -> Result<Vec<Phone>> {
            Ok(Vec::new())
        }
        async fn count_phones(&self) -> Result<u64> {
            Ok(0)
        }
        async fn fetch(&self, _request: &RetrievalRequest) -> Result<Vec<Phone>> {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            anyhow::bail!("database is locked")
        }
    }

    fn request() -> RetrievalRequest {
        build_query(&Intent::Unknown, &[], Focus::General)
    }

    #[tokio::test]
    async fn test_returns_records() {
        let store = InMemoryStore::with_phones(vec![Phone::named("Galaxy S23")]);
        let executor = RetrievalExecutor::new(Arc::new(store), Duration::from_secs(1));
        assert_eq!(executor.execute(&request()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_store_error_becomes_empty() {
        let executor =
            RetrievalExecutor::new(Arc::new(BrokenStore { hang: false }), Duration::from_secs(1));
        assert!(executor.execute(&request()).await.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_becomes_empty() {
        let executor =
            RetrievalExecutor::new(Arc::new(BrokenStore { hang: true }), Duration::from_millis(20));
        assert!(executor.execute(&request()).await.is_empty());
    }
}

//! In-memory [`PhoneStore`] implementation for tests and small demos.
//!
//! Phones live in a `BTreeMap` keyed by model name behind
//! `std::sync::RwLock`, so iteration order is catalog order. Retrieval
//! requests are evaluated directly in Rust.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Phone;
use crate::query::{Direction, OrderBy, RetrievalRequest};

use super::PhoneStore;

/// In-memory catalog store.
pub struct InMemoryStore {
    phones: RwLock<BTreeMap<String, Phone>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            phones: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a store pre-populated with the given phones.
    pub fn with_phones(phones: impl IntoIterator<Item = Phone>) -> Self {
        let map = phones
            .into_iter()
            .map(|p| (p.model_name.clone(), p))
            .collect();
        Self {
            phones: RwLock::new(map),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare two phones under an ordering list. Unknown values sort last.
fn compare(order_by: &[OrderBy], a: &Phone, b: &Phone) -> Ordering {
    for order in order_by {
        let ord = match (order.key.value(a), order.key.value(b)) {
            (Some(x), Some(y)) => {
                let natural = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                match order.direction {
                    Direction::Asc => natural,
                    Direction::Desc => natural.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.model_name.cmp(&b.model_name)
}

#[async_trait]
impl PhoneStore for InMemoryStore {
    async fn upsert_phone(&self, phone: &Phone) -> Result<()> {
        let mut phones = self.phones.write().unwrap_or_else(PoisonError::into_inner);
        phones.insert(phone.model_name.clone(), phone.clone());
        Ok(())
    }

    async fn list_model_names(&self) -> Result<Vec<String>> {
        let phones = self.phones.read().unwrap_or_else(PoisonError::into_inner);
        Ok(phones.keys().cloned().collect())
    }

    async fn get_phone(&self, model_name: &str) -> Result<Option<Phone>> {
        let phones = self.phones.read().unwrap_or_else(PoisonError::into_inner);
        Ok(phones.get(model_name).cloned())
    }

    async fn list_phones(&self, limit: u32, offset: u32) -> Result<Vec<Phone>> {
        let phones = self.phones.read().unwrap_or_else(PoisonError::into_inner);
        Ok(phones
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_phones(&self) -> Result<u64> {
        let phones = self.phones.read().unwrap_or_else(PoisonError::into_inner);
        Ok(phones.len() as u64)
    }

    async fn fetch(&self, request: &RetrievalRequest) -> Result<Vec<Phone>> {
        let phones = self.phones.read().unwrap_or_else(PoisonError::into_inner);
        let mut matched: Vec<Phone> = phones
            .values()
            .filter(|p| request.matches(p))
            .cloned()
            .collect();
        matched.sort_by(|a, b| compare(&request.order_by, a, b));
        matched.truncate(request.limit as usize);
        Ok(matched)
    }
}

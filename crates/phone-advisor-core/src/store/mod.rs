//! Storage abstraction for the phone catalog.
//!
//! The [`PhoneStore`] trait covers everything the pipeline and the
//! application need from persistence: writes from the importer, name
//! listing for the catalog index, paginated browsing, and execution of a
//! [`RetrievalRequest`].
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Phone;
use crate::query::RetrievalRequest;

/// Abstract storage backend for the catalog.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_phone`](PhoneStore::upsert_phone) | Insert or update a phone by model name |
/// | [`list_model_names`](PhoneStore::list_model_names) | All canonical names, for the catalog index |
/// | [`get_phone`](PhoneStore::get_phone) | Exact lookup by model name |
/// | [`list_phones`](PhoneStore::list_phones) | Paginated listing, ordered by model name |
/// | [`count_phones`](PhoneStore::count_phones) | Catalog size |
/// | [`fetch`](PhoneStore::fetch) | Execute a retrieval request |
#[async_trait]
pub trait PhoneStore: Send + Sync {
    /// Insert a phone, or replace the attributes of an existing one with the
    /// same `model_name`.
    async fn upsert_phone(&self, phone: &Phone) -> Result<()>;

    /// Every model name in the catalog, ordered by name.
    async fn list_model_names(&self) -> Result<Vec<String>>;

    async fn get_phone(&self, model_name: &str) -> Result<Option<Phone>>;

    async fn list_phones(&self, limit: u32, offset: u32) -> Result<Vec<Phone>>;

    async fn count_phones(&self) -> Result<u64>;

    /// Execute a retrieval request.
    ///
    /// Records are returned in the request's order; unknown sort values come
    /// last in either direction, and remaining ties are ordered by model name.
    async fn fetch(&self, request: &RetrievalRequest) -> Result<Vec<Phone>>;
}

//! # Phone Advisor Core
//!
//! Pure query-understanding logic for Phone Advisor: catalog models, intent
//! classification, focus extraction, fuzzy entity resolution, query
//! building, record validation, and the storage trait.
//!
//! This crate performs no network or filesystem I/O and has no runtime
//! dependency on tokio or sqlx. The application crate supplies the SQLite
//! store, the generation backend, and the orchestration around them.

pub mod catalog;
pub mod focus;
pub mod fuzzy;
pub mod intent;
pub mod models;
pub mod query;
pub mod store;
pub mod validation;

//! # Phone Advisor
//!
//! Answers natural-language questions about a phone catalog.
//!
//! A question is classified into an intent, named models are fuzzily
//! resolved against the catalog, a structured query is built and run
//! against SQLite, the records are validated, and an answer is generated
//! by an LLM (or a deterministic template when generation fails).
//!
//! ## Architecture
//!
//! ```text
//! question ─▶ intent + focus ─▶ resolve ─▶ query ─▶ SQLite ─▶ validate
//!                                                                │
//!                 envelope ◀── fallback ◀─┬── generate ◀─────────┘
//!                                         │
//!                                     (on error)
//! ```
//!
//! The pure pieces (intent, focus, fuzzy, query, validation, catalog index)
//! live in `phone-advisor-core`; this crate adds storage, providers, the
//! pipeline, the CLI and the HTTP server.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite-backed `PhoneStore` |
//! | [`import`] | JSON catalog import |
//! | [`phones`] | Catalog browsing |
//! | [`retrieval`] | Query execution with timeout |
//! | [`extraction`] | Extraction stage and error taxonomy |
//! | [`generation`] | LLM providers, prompts and fallback |
//! | [`orchestrator`] | Two-stage pipeline and response envelope |
//! | [`ask`] | `advisor ask` command |
//! | [`server`] | HTTP server |

pub mod ask;
pub mod config;
pub mod db;
pub mod extraction;
pub mod generation;
pub mod import;
pub mod migrate;
pub mod orchestrator;
pub mod phones;
pub mod retrieval;
pub mod server;
pub mod sqlite_store;

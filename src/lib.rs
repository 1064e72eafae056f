//! Per-tenant store for unpublished catalog items.
//!
//! Candidate SKCs are grouped by category, deduplicated by `skc_id` and
//! counted. Each tenant owns one JSON snapshot stored under a namespaced key.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod migrate;
pub mod model;
pub mod namespace;
pub mod report;
pub mod storage;

pub use engine::{ChangeEvent, ChangeKind, Engine, InsertOutcome};
pub use error::StoreError;
pub use migrate::{LoadOrigin, Loaded};
pub use model::{Candidate, CategoryAggregate, CategoryRef, GlobalStats, HistoryEntry, SkcRecord, TenantSnapshot};
pub use namespace::{Namespace, NamespaceError};

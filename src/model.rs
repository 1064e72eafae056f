//! Persisted snapshot shape.
//!
//! Field names follow the dashboard's existing JSON blobs (camelCase,
//! `skcRecords`, `version`) so snapshots written by either side stay readable.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written into every snapshot.
pub const SCHEMA_VERSION: &str = "1.0";

/// Newest-first history is cut to this many entries.
pub const HISTORY_CAP: usize = 100;

pub const BATCH_COLLECT_ACTION: &str = "batch-collect";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkcRecord {
    pub skc_id: String,
    pub product_id: String,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_image_url: Option<String>,
    pub collect_time: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAggregate {
    pub cat_id: i64,
    pub cat_name: String,
    /// Insertion order, unique by `skc_id`.
    #[serde(rename = "skcRecords")]
    pub records: Vec<SkcRecord>,
    pub last_updated: DateTime<Utc>,
    pub total_count: u64,
}

impl CategoryAggregate {
    pub fn new(cat_id: i64, cat_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        CategoryAggregate {
            cat_id,
            cat_name: cat_name.into(),
            records: Vec::new(),
            last_updated: now,
            total_count: 0,
        }
    }

    pub fn contains(&self, skc_id: &str) -> bool {
        self.records.iter().any(|r| r.skc_id == skc_id)
    }

    pub fn skc_ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.skc_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub time: DateTime<Utc>,
    pub action: String,
    pub count: u64,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_skc_count: u64,
    pub total_category_count: u64,
    pub last_updated: DateTime<Utc>,
    /// Newest first.
    #[serde(default)]
    pub collect_history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSnapshot {
    /// Keyed by `cat_id`; serialized as decimal string keys.
    pub categories: BTreeMap<i64, CategoryAggregate>,
    pub global_stats: GlobalStats,
    #[serde(rename = "version")]
    pub schema_version: String,
}

impl TenantSnapshot {
    pub fn empty(now: DateTime<Utc>) -> Self {
        TenantSnapshot {
            categories: BTreeMap::new(),
            global_stats: GlobalStats {
                total_skc_count: 0,
                total_category_count: 0,
                last_updated: now,
                collect_history: Vec::new(),
            },
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }

    /// Re-derive every counter from the record lists.
    ///
    /// Counters are never patched incrementally; this is the only place they
    /// are written.
    pub fn recompute_stats(&mut self) {
        for category in self.categories.values_mut() {
            category.total_count = category.records.len() as u64;
        }

        self.global_stats.total_category_count = self.categories.len() as u64;
        self.global_stats.total_skc_count = self.categories.values()
            .map(|c| c.total_count)
            .sum();
    }

    /// Prepend a history entry and cut the log to `cap` entries.
    pub fn push_history(&mut self, entry: HistoryEntry, cap: usize) {
        let history = &mut self.global_stats.collect_history;
        history.insert(0, entry);
        history.truncate(cap);
    }

    pub fn all_records(&self) -> impl Iterator<Item = (&CategoryAggregate, &SkcRecord)> {
        self.categories.values()
            .flat_map(|c| c.records.iter().map(move |r| (c, r)))
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub cat_id: i64,
    pub cat_name: String,
}

/// One item offered to the store by a product view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub skc_id: String,
    pub product_id: String,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_image_url: Option<String>,
    pub category: CategoryRef,
    pub source: String,
}

impl Candidate {
    pub fn into_record(self, collect_time: DateTime<Utc>) -> SkcRecord {
        SkcRecord {
            skc_id: self.skc_id,
            product_id: self.product_id,
            product_name: self.product_name,
            main_image_url: self.main_image_url,
            collect_time,
            source: self.source,
        }
    }
}

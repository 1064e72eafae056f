//! Aggregation engine.
//!
//! Every operation is scoped to one tenant key and runs as
//! read → gate → mutate in memory → recompute counters → single write.
//! Writes are conditional on the revision that was read; if another writer
//! got there first the whole operation is replayed on the fresh snapshot,
//! up to `max_write_attempts` times.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::error::{Result, StoreError};
use crate::migrate::{self, LoadOrigin, Loaded};
use crate::model::{
    BATCH_COLLECT_ACTION, Candidate, CategoryAggregate, GlobalStats, HISTORY_CAP, HistoryEntry, TenantSnapshot,
};
use crate::namespace::Namespace;
use crate::storage::{Backend, PutOutcome};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub namespace: Namespace,
    pub history_cap: usize,
    pub max_write_attempts: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            namespace: Namespace::default(),
            history_cap: HISTORY_CAP,
            max_write_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub submitted: usize,
    pub inserted: usize,
    /// Already present in their category, or repeated within the batch.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted { inserted: usize },
    CategoryDeleted { cat_id: i64 },
    Cleared,
    Purged,
}

/// Emitted to subscribers after a mutation has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub tenant: String,
    pub kind: ChangeKind,
}

type Listener = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

pub struct Engine<B> {
    backend: B,
    options: EngineOptions,
    listeners: RwLock<Vec<Listener>>,
}

impl<B: Backend> Engine<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, EngineOptions::default())
    }

    pub fn with_options(backend: B, options: EngineOptions) -> Self {
        Engine {
            backend,
            options,
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn namespace(&self) -> &Namespace {
        &self.options.namespace
    }

    /// Register a callback for every successful mutation.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        // a push never leaves the list half-written, so a poisoned lock is still usable
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    fn notify(&self, tenant: &str, kind: ChangeKind) {
        let event = ChangeEvent { tenant: tenant.to_string(), kind };
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(&event);
        }
    }

    /// Load a tenant's snapshot. Never fails; see [`Engine::load_detailed`].
    pub fn load(&self, tenant: &str) -> TenantSnapshot {
        self.load_detailed(tenant).snapshot
    }

    /// Load a tenant's snapshot and report whether it was read or defaulted.
    pub fn load_detailed(&self, tenant: &str) -> Loaded {
        let key = self.namespace().resolve(tenant);
        let now = Utc::now();

        match self.backend.get(&key) {
            Ok(stored) => {
                let loaded = migrate::gate(stored.as_ref().map(|s| s.value.as_str()), now);
                tracing::debug!(%key, origin = ?loaded.origin, "loaded snapshot");
                loaded
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "failed to read snapshot, using empty state");
                Loaded {
                    snapshot: TenantSnapshot::empty(now),
                    origin: LoadOrigin::Unavailable,
                }
            }
        }
    }

    /// Read-modify-write one tenant snapshot.
    ///
    /// `apply` returns `None` to abandon the operation without writing.
    fn modify<T, F>(&self, tenant: &str, mut apply: F) -> Result<Option<T>>
    where
        F: FnMut(&mut TenantSnapshot, DateTime<Utc>) -> Option<T>,
    {
        let key = self.namespace().resolve(tenant);
        let attempts = self.options.max_write_attempts.max(1);

        for attempt in 1..=attempts {
            let now = Utc::now();
            let stored = self.backend.get(&key).map_err(|e| {
                tracing::warn!(%key, error = %e, "failed to read snapshot for update");
                e
            })?;
            let expected = stored.as_ref().map(|s| s.revision);

            let mut snapshot = migrate::gate(stored.as_ref().map(|s| s.value.as_str()), now).snapshot;
            let Some(output) = apply(&mut snapshot, now) else {
                return Ok(None);
            };

            snapshot.recompute_stats();
            snapshot.global_stats.last_updated = now;
            let blob = serde_json::to_string(&snapshot)?;

            match self.backend.put(&key, &blob, expected) {
                Ok(PutOutcome::Written(revision)) => {
                    tracing::debug!(%key, revision, "wrote snapshot");
                    return Ok(Some(output));
                }
                Ok(PutOutcome::Conflict) => {
                    tracing::debug!(%key, attempt, "snapshot changed underneath us, retrying");
                }
                Err(e) => {
                    tracing::warn!(%key, error = %e, "failed to write snapshot");
                    return Err(e);
                }
            }
        }

        tracing::warn!(%key, attempts, "giving up after repeated write conflicts");
        Err(StoreError::Conflict { key, attempts })
    }

    /// Add a batch of candidates, skipping any `skc_id` already present in
    /// its category.
    ///
    /// The batch is recorded in the history even when nothing new was
    /// inserted; the history `count` is the number submitted.
    pub fn insert_records(&self, tenant: &str, candidates: &[Candidate]) -> Result<InsertOutcome> {
        let history_cap = self.options.history_cap;

        let inserted = self.modify(tenant, |snapshot, now| {
            let mut seen: HashMap<i64, HashSet<String>> = HashMap::new();
            let mut inserted = 0;

            for candidate in candidates {
                let cat_id = candidate.category.cat_id;
                let category = snapshot.categories
                    .entry(cat_id)
                    .or_insert_with(|| CategoryAggregate::new(cat_id, candidate.category.cat_name.clone(), now));

                let ids = seen
                    .entry(cat_id)
                    .or_insert_with(|| category.skc_ids().map(str::to_string).collect());
                if !ids.insert(candidate.skc_id.clone()) {
                    continue;
                }

                category.records.push(candidate.clone().into_record(now));
                category.last_updated = now;
                inserted += 1;
            }

            let source = candidates.first()
                .map_or_else(|| "unknown".to_string(), |c| c.source.clone());
            snapshot.push_history(
                HistoryEntry {
                    time: now,
                    action: BATCH_COLLECT_ACTION.to_string(),
                    count: candidates.len() as u64,
                    source,
                },
                history_cap,
            );

            Some(inserted)
        })?
        .unwrap_or(0);

        let outcome = InsertOutcome {
            submitted: candidates.len(),
            inserted,
            skipped: candidates.len() - inserted,
        };
        tracing::debug!(tenant, ?outcome, "collected batch");
        self.notify(tenant, ChangeKind::Inserted { inserted });

        Ok(outcome)
    }

    /// Remove a category and all its records.
    ///
    /// Returns `Ok(false)` without writing when the category does not exist.
    pub fn delete_category(&self, tenant: &str, cat_id: i64) -> Result<bool> {
        let removed = self.modify(tenant, |snapshot, _| snapshot.categories.remove(&cat_id))?;

        if removed.is_none() {
            tracing::debug!(tenant, cat_id, "no such category to delete");
            return Ok(false);
        }

        self.notify(tenant, ChangeKind::CategoryDeleted { cat_id });
        Ok(true)
    }

    /// Remove the tenant's whole snapshot. Clearing an absent tenant succeeds.
    pub fn clear_tenant(&self, tenant: &str) -> Result<()> {
        let key = self.namespace().resolve(tenant);
        let existed = self.backend.delete(&key).map_err(|e| {
            tracing::warn!(%key, error = %e, "failed to clear tenant");
            e
        })?;

        tracing::info!(%key, existed, "cleared tenant snapshot");
        self.notify(tenant, ChangeKind::Cleared);
        Ok(())
    }

    /// Every physical key in the namespace. Contents are not decoded.
    pub fn list_tenant_keys(&self) -> Result<Vec<String>> {
        self.backend.keys_with_prefix(&self.namespace().key_prefix())
    }

    /// Remove every tenant snapshot except `current`'s.
    ///
    /// Returns the number of keys removed.
    pub fn purge_other_tenants(&self, current: &str) -> Result<usize> {
        let keep = self.namespace().resolve(current);
        let mut purged = 0;

        for key in self.list_tenant_keys()? {
            if key == keep {
                continue;
            }
            let deleted = self.backend.delete(&key).map_err(|err| {
                tracing::warn!(current, purged, key = %key, error = %err, "purge stopped");
                err
            })?;
            if deleted {
                purged += 1;
                if let Some(tenant) = self.namespace().tenant_of(&key) {
                    self.notify(tenant, ChangeKind::Purged);
                }
            }
        }

        tracing::info!(current, purged, "purged other tenants");
        Ok(purged)
    }

    /// Categories in ascending `cat_id` order.
    pub fn categories(&self, tenant: &str) -> Vec<CategoryAggregate> {
        self.load(tenant).categories.into_values().collect()
    }

    pub fn category(&self, tenant: &str, cat_id: i64) -> Option<CategoryAggregate> {
        self.load(tenant).categories.remove(&cat_id)
    }

    pub fn stats(&self, tenant: &str) -> GlobalStats {
        self.load(tenant).global_stats
    }

    /// Identifiers of one category, or of every category in `cat_id` order.
    pub fn skc_ids(&self, tenant: &str, cat_id: Option<i64>) -> Vec<String> {
        let snapshot = self.load(tenant);
        match cat_id {
            Some(id) => snapshot.categories.get(&id)
                .map(|c| c.skc_ids().map(str::to_string).collect())
                .unwrap_or_default(),
            None => snapshot.all_records()
                .map(|(_, r)| r.skc_id.clone())
                .collect(),
        }
    }
}

//! Migration gate for stored snapshots.
//!
//! Every blob read from storage passes through [`gate`] before the engine
//! sees it. The gate never fails: absent, unparseable or outdated blobs are
//! replaced by an empty snapshot, and [`LoadOrigin`] records which of those
//! happened.
//!
//! Outdated blobs are currently discarded rather than converted. That reset
//! is a placeholder until a field-by-field upgrade exists.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::{SCHEMA_VERSION, TenantSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOrigin {
    /// A current-version blob was decoded.
    Stored,
    /// Nothing was stored under the key.
    Absent,
    /// The blob could not be decoded.
    Corrupt,
    /// The blob was written by another schema version and was dropped.
    VersionReset { found: Option<String> },
    /// The storage medium could not be read.
    Unavailable,
}

impl LoadOrigin {
    pub fn is_default(&self) -> bool {
        !matches!(self, LoadOrigin::Stored)
    }
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub snapshot: TenantSnapshot,
    pub origin: LoadOrigin,
}

impl Loaded {
    fn fresh(origin: LoadOrigin, now: DateTime<Utc>) -> Self {
        Loaded { snapshot: TenantSnapshot::empty(now), origin }
    }
}

pub fn gate(raw: Option<&str>, now: DateTime<Utc>) -> Loaded {
    let Some(raw) = raw else {
        return Loaded::fresh(LoadOrigin::Absent, now);
    };

    // version is checked on a loose parse so an older shape is reported as
    // a version reset instead of corruption
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "stored snapshot is not valid json, starting empty");
            return Loaded::fresh(LoadOrigin::Corrupt, now);
        }
    };

    if !value.is_object() {
        tracing::warn!("stored snapshot is not a json object, starting empty");
        return Loaded::fresh(LoadOrigin::Corrupt, now);
    }

    let found = value.get("version").and_then(Value::as_str);
    if found != Some(SCHEMA_VERSION) {
        tracing::warn!(
            found = found.unwrap_or("<missing>"),
            current = SCHEMA_VERSION,
            "snapshot schema version mismatch, discarding stored data"
        );
        return Loaded::fresh(LoadOrigin::VersionReset { found: found.map(str::to_string) }, now);
    }

    match serde_json::from_value::<TenantSnapshot>(value) {
        Ok(mut snapshot) => {
            snapshot.recompute_stats();
            Loaded { snapshot, origin: LoadOrigin::Stored }
        }
        Err(e) => {
            tracing::warn!(error = %e, "stored snapshot does not match the schema, starting empty");
            Loaded::fresh(LoadOrigin::Corrupt, now)
        }
    }
}

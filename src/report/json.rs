//! JSON output for a tenant snapshot.
//!
//! Same document that is stored, pretty printed for scripting and piping.

use crate::model::TenantSnapshot;

pub fn render(snapshot: &TenantSnapshot) -> String {
    serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| String::from("{}"))
}

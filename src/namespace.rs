//! Tenant key namespace.
//!
//! Every tenant snapshot lives under `"<prefix>_<tenant>"`. The prefix is
//! fixed per store, so two distinct tenant ids can never map to the same key.
//!
//! Several stores may share one backend under different prefixes. A key must
//! belong to exactly one of them, so no prefix may be another prefix followed
//! by `_`. The built-in prefix is the only one allowed to contain `_`; custom
//! prefixes are a single segment that does not collide with it.

use thiserror::Error;

/// Tenant used when no authenticated identity exists.
pub const ANONYMOUS_TENANT: &str = "anonymous";

pub const DEFAULT_PREFIX: &str = "temu_unpublished_skc_records";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    #[error("key prefix must not be empty")]
    Empty,

    #[error("key prefix {0:?} must not contain the '_' separator")]
    Separator(String),

    #[error("key prefix {0:?} overlaps the built-in prefix")]
    OverlapsDefault(String),
}

/// True if keys under one prefix would also match the other.
fn overlaps(a: &str, b: &str) -> bool {
    let nested = |outer: &str, inner: &str| {
        outer.strip_prefix(inner).is_some_and(|rest| rest.starts_with('_'))
    };
    nested(a, b) || nested(b, a)
}

impl Namespace {
    pub fn new(prefix: impl Into<String>) -> Result<Self, NamespaceError> {
        let prefix = prefix.into();
        if prefix == DEFAULT_PREFIX {
            return Ok(Namespace { prefix });
        }
        if prefix.is_empty() {
            return Err(NamespaceError::Empty);
        }
        if prefix.contains('_') {
            return Err(NamespaceError::Separator(prefix));
        }
        if overlaps(&prefix, DEFAULT_PREFIX) {
            return Err(NamespaceError::OverlapsDefault(prefix));
        }
        Ok(Namespace { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The part every namespaced key starts with, separator included.
    pub fn key_prefix(&self) -> String {
        format!("{}_", self.prefix)
    }

    /// Storage key for a tenant. The tenant id is used verbatim.
    pub fn resolve(&self, tenant: &str) -> String {
        format!("{}_{tenant}", self.prefix)
    }

    /// Inverse of [`Namespace::resolve`]: the tenant id a key belongs to.
    pub fn tenant_of<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix.as_str())?.strip_prefix('_')
    }

    pub fn is_namespaced(&self, key: &str) -> bool {
        self.tenant_of(key).is_some()
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Namespace { prefix: DEFAULT_PREFIX.to_string() }
    }
}

/// Substitutes the anonymous sentinel when there is no identity.
pub fn tenant_or_anonymous(tenant: Option<&str>) -> &str {
    match tenant {
        Some(t) if !t.is_empty() => t,
        _ => ANONYMOUS_TENANT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_formats_prefix_and_tenant() {
        let ns = Namespace::new("skc").unwrap();
        assert_eq!(ns.resolve("u1"), "skc_u1");
    }

    #[test]
    fn distinct_tenants_get_distinct_keys() {
        let ns = Namespace::default();
        assert_ne!(ns.resolve("u1"), ns.resolve("u2"));
        assert_ne!(ns.resolve("a_b"), ns.resolve("a"));
    }

    #[test]
    fn tenant_of_inverts_resolve() {
        let ns = Namespace::default();
        for tenant in ["u1", "", "with_underscore", "anonymous"] {
            assert_eq!(ns.tenant_of(&ns.resolve(tenant)), Some(tenant));
        }
    }

    #[test]
    fn foreign_keys_are_not_namespaced() {
        let ns = Namespace::new("skc").unwrap();
        assert!(!ns.is_namespaced("auth_token"));
        assert!(!ns.is_namespaced("skcx_u1"));
        assert!(!ns.is_namespaced("skc"));
        assert!(ns.is_namespaced("skc_u1"));
    }

    #[test]
    fn custom_prefix_is_a_single_segment() {
        assert_eq!(Namespace::new(""), Err(NamespaceError::Empty));
        assert_eq!(
            Namespace::new("shop_eu"),
            Err(NamespaceError::Separator("shop_eu".to_string()))
        );
        assert_eq!(
            Namespace::new("temu"),
            Err(NamespaceError::OverlapsDefault("temu".to_string()))
        );
        assert_eq!(Namespace::new(DEFAULT_PREFIX).unwrap(), Namespace::default());
        assert!(Namespace::new("shop-eu").is_ok());
    }

    #[test]
    fn valid_prefixes_never_claim_each_others_keys() {
        let prefixes = ["shop", "shop-eu", "temux", DEFAULT_PREFIX];
        for a in prefixes {
            let ns_a = Namespace::new(a).unwrap();
            for b in prefixes.iter().filter(|&&b| b != a) {
                let ns_b = Namespace::new(*b).unwrap();
                for tenant in ["u1", "eu_u9", "x_y_z"] {
                    assert!(!ns_a.is_namespaced(&ns_b.resolve(tenant)), "{a} claimed {b}_{tenant}");
                }
            }
        }
    }

    #[test]
    fn empty_identity_falls_back_to_anonymous() {
        assert_eq!(tenant_or_anonymous(None), ANONYMOUS_TENANT);
        assert_eq!(tenant_or_anonymous(Some("")), ANONYMOUS_TENANT);
        assert_eq!(tenant_or_anonymous(Some("u7")), "u7");
    }
}

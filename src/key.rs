//! Cache keys.
//!
//! A [`CacheKey`] is a resource name followed by an ordered list of typed parts.
//! Keys are compared and hashed structurally, so two reads with the same resource
//! and parameters share one cache entry and any differing parameter yields a
//! distinct entry. Parts are typed: an id `"x"` and a category filter `"x"` never
//! collide even though both render as `"x"`.

use std::fmt;

/// The backend resources this layer caches. Always the first element of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Schools,
    Units,
    Reports,
    Audit,
    Stats,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Schools => "schools",
            Resource::Units => "units",
            Resource::Reports => "reports",
            Resource::Audit => "audit",
            Resource::Stats => "stats",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parameter position of a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    /// A record identifier (by-id reads, owning user of audit entries).
    Id(String),
    /// A category filter.
    Filter(String),
    /// A result-count cap.
    Limit(u32),
    /// An optional parameter that was not supplied. Keeps positions stable.
    Absent,
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Id(value) | KeyPart::Filter(value) => write!(f, "{value:?}"),
            KeyPart::Limit(limit) => write!(f, "{limit}"),
            KeyPart::Absent => f.write_str("null"),
        }
    }
}

/// An ordered tuple identifying one cached result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    resource: Resource,
    parts: Vec<KeyPart>,
}

impl CacheKey {
    /// A key holding only the resource name, e.g. `["schools"]`.
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            parts: Vec::new(),
        }
    }

    /// Append a required identifier.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.parts.push(KeyPart::Id(id.into()));
        self
    }

    /// Append an optional identifier; empty strings count as absent.
    pub fn optional_id(mut self, id: Option<&str>) -> Self {
        self.parts.push(match non_empty(id) {
            Some(id) => KeyPart::Id(id.to_string()),
            None => KeyPart::Absent,
        });
        self
    }

    /// Append an optional filter; empty strings count as absent.
    pub fn filter(mut self, filter: Option<&str>) -> Self {
        self.parts.push(match non_empty(filter) {
            Some(value) => KeyPart::Filter(value.to_string()),
            None => KeyPart::Absent,
        });
        self
    }

    /// Append an optional result-count cap.
    pub fn limit(mut self, limit: Option<u32>) -> Self {
        self.parts
            .push(limit.map(KeyPart::Limit).unwrap_or(KeyPart::Absent));
        self
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// True when the key's first element is `resource`.
    pub fn belongs_to(&self, resource: Resource) -> bool {
        self.resource == resource
    }

    /// True when `prefix` is a leading sub-tuple of this key.
    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.resource == prefix.resource && self.parts.starts_with(&prefix.parts)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}", self.resource.as_str())?;
        for part in &self.parts {
            write!(f, ",{part}")?;
        }
        f.write_str("]")
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(key: &CacheKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn renders_as_tuple() {
        assert_eq!(CacheKey::new(Resource::Schools).to_string(), r#"["schools"]"#);
        assert_eq!(
            CacheKey::new(Resource::Schools).id("s1").to_string(),
            r#"["schools","s1"]"#
        );
        let audit = CacheKey::new(Resource::Audit)
            .optional_id(None)
            .filter(Some("login"))
            .limit(Some(50));
        assert_eq!(audit.to_string(), r#"["audit",null,"login",50]"#);
    }

    #[test]
    fn identical_parameters_share_a_key() {
        let a = CacheKey::new(Resource::Audit)
            .optional_id(Some("u1"))
            .filter(Some("reports"))
            .limit(Some(10));
        let b = CacheKey::new(Resource::Audit)
            .optional_id(Some("u1"))
            .filter(Some("reports"))
            .limit(Some(10));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn any_differing_parameter_yields_a_new_key() {
        let base = || CacheKey::new(Resource::Audit).optional_id(Some("u1"));
        let variants = [
            base().filter(Some("reports")).limit(Some(10)),
            base().filter(Some("reports")).limit(Some(11)),
            base().filter(Some("reports")).limit(None),
            base().filter(Some("schools")).limit(Some(10)),
            base().filter(None).limit(Some(10)),
            CacheKey::new(Resource::Audit)
                .optional_id(None)
                .filter(Some("reports"))
                .limit(Some(10)),
        ];
        for (i, a) in variants.iter().enumerate() {
            for b in variants.iter().skip(i + 1) {
                assert_ne!(a, b, "{a} and {b} must differ");
            }
        }
    }

    #[test]
    fn id_and_filter_with_same_text_differ() {
        let by_id = CacheKey::new(Resource::Reports).id("x");
        let by_category = CacheKey::new(Resource::Reports).filter(Some("x"));
        assert_ne!(by_id, by_category);
        assert_eq!(by_id.to_string(), by_category.to_string());
    }

    #[test]
    fn empty_filter_is_absent() {
        assert_eq!(
            CacheKey::new(Resource::Reports).filter(Some("")),
            CacheKey::new(Resource::Reports).filter(None)
        );
    }

    #[test]
    fn prefix_matching() {
        let root = CacheKey::new(Resource::Units);
        let detail = CacheKey::new(Resource::Units).id("u7");
        assert!(detail.starts_with(&root));
        assert!(!root.starts_with(&detail));
        assert!(detail.belongs_to(Resource::Units));
        assert!(!detail.belongs_to(Resource::Schools));
        assert!(!CacheKey::new(Resource::Schools).starts_with(&root));
    }
}

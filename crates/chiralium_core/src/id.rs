//! Identifier generation for newly constructed entities.
//!
//! # Responsibility
//! - Provide the default random (UUID v4) identifier source.
//! - Let callers inject deterministic sources in tests.
//!
//! # Invariants
//! - A caller-supplied id always wins over a generated one.
//! - Random id collisions are not detected.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of fresh entity identifiers.
pub trait IdGenerator {
    fn generate(&self) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn() -> String,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Random version-4 UUID identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic `<prefix>-<n>` identifiers, starting at 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}

/// Returns `id` when supplied, otherwise a fresh one from `ids`.
pub fn resolve_id(id: Option<String>, ids: &impl IdGenerator) -> String {
    id.unwrap_or_else(|| ids.generate())
}

#[cfg(test)]
mod tests {
    use super::{resolve_id, IdGenerator, RandomIds, SequentialIds};
    use uuid::Uuid;

    #[test]
    fn random_ids_are_v4_uuids() {
        let id = RandomIds.generate();
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_ne!(id, RandomIds.generate());
    }

    #[test]
    fn sequential_ids_are_deterministic() {
        let ids = SequentialIds::new("link");
        assert_eq!(ids.generate(), "link-1");
        assert_eq!(ids.generate(), "link-2");
    }

    #[test]
    fn resolve_id_prefers_supplied_value() {
        let ids = || "generated".to_string();
        assert_eq!(resolve_id(Some("abc".into()), &ids), "abc");
        assert_eq!(resolve_id(None, &ids), "generated");
    }
}

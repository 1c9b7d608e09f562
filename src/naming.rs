//! Run-scoped naming of generated mock types.
//!
//! Names are derived from the original qualified name, with a reproducible
//! disambiguation suffix when two declarations would otherwise collide (same
//! simple name in different modules). The reservation set lives for one
//! generation run and is passed to workers explicitly; repeated runs on the
//! same input produce identical names.

use blake3::Hasher;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::model::QualifiedName;

/// Suffix appended to every generated mock type name.
pub const MOCK_SUFFIX: &str = "Mock";

/// Reservation set guarding generated names within one run.
///
/// Claims are guarded by a mutex so concurrent workers can reserve names for
/// auxiliary types. The resulting name for a declaration depends only on the
/// qualified name and which shorter candidates were taken before it, so the
/// caller claims primary names in declaration order before parallel dispatch.
#[derive(Debug, Default)]
pub struct NameArbiter {
    reserved: Mutex<HashMap<String, String>>,
}

impl NameArbiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the mock type name for `declaration`. Claiming again for the
    /// same declaration returns the same name.
    ///
    /// # Panics
    /// Panics only if two distinct qualified names produce the same content
    /// hash, which would require a blake3 collision.
    pub fn claim(&self, declaration: &QualifiedName) -> String {
        let owner = declaration.qualified();
        let mut reserved = self.reserved.lock().unwrap_or_else(PoisonError::into_inner);

        for candidate in candidates(declaration) {
            match reserved.entry(candidate.clone()) {
                Entry::Occupied(entry) if entry.get() == &owner => return candidate,
                Entry::Occupied(_) => continue,
                Entry::Vacant(entry) => {
                    entry.insert(owner);
                    return candidate;
                }
            }
        }
        // The final candidate embeds a full-width content hash; reaching this
        // point would mean two distinct qualified names hashed identically.
        unreachable!("name candidates are exhaustive")
    }

    #[must_use]
    pub fn reserved_count(&self) -> usize {
        self.reserved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Candidate names in preference order: simple, module-qualified, hashed.
fn candidates(declaration: &QualifiedName) -> impl Iterator<Item = String> + '_ {
    let simple = format!("{}{MOCK_SUFFIX}", sanitize(&declaration.name));
    let qualified = format!(
        "{}{}{MOCK_SUFFIX}",
        sanitize(&declaration.module),
        sanitize(&declaration.name)
    );
    let hashed = format!("{qualified}_{}", content_hash(declaration));
    [simple, qualified, hashed].into_iter()
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .filter(|character| character.is_ascii_alphanumeric() || *character == '_')
        .collect()
}

fn content_hash(declaration: &QualifiedName) -> String {
    let mut hasher = Hasher::new();
    hasher.update(declaration.qualified().as_bytes());
    let hash = hasher.finalize();
    hash.to_hex()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_simple_names_get_the_short_form() {
        let arbiter = NameArbiter::new();
        assert_eq!(
            arbiter.claim(&QualifiedName::new("App", "Session")),
            "SessionMock"
        );
    }

    #[test]
    fn same_simple_name_in_two_modules_stays_distinct_and_stable() {
        let first_run = {
            let arbiter = NameArbiter::new();
            (
                arbiter.claim(&QualifiedName::new("Core", "Client")),
                arbiter.claim(&QualifiedName::new("Net", "Client")),
            )
        };
        let second_run = {
            let arbiter = NameArbiter::new();
            (
                arbiter.claim(&QualifiedName::new("Core", "Client")),
                arbiter.claim(&QualifiedName::new("Net", "Client")),
            )
        };

        assert_ne!(first_run.0, first_run.1);
        assert_eq!(first_run, second_run, "names are stable across runs");
        assert_eq!(first_run.0, "ClientMock");
        assert_eq!(first_run.1, "NetClientMock");
    }

    #[test]
    fn reclaiming_is_idempotent() {
        let arbiter = NameArbiter::new();
        let name = QualifiedName::new("App", "Store");
        let first = arbiter.claim(&name);
        let second = arbiter.claim(&name);
        assert_eq!(first, second);
        assert_eq!(arbiter.reserved_count(), 1);
    }

    #[test]
    fn hashed_fallback_applies_when_qualified_form_is_taken() {
        let arbiter = NameArbiter::new();
        // `Net.Client` and `NetClient` in an unnamed module both want
        // `NetClientMock` once `ClientMock` is gone.
        arbiter.claim(&QualifiedName::new("App", "Client"));
        arbiter.claim(&QualifiedName::new("Net", "Client"));
        let fallback = arbiter.claim(&QualifiedName::new("", "NetClient"));
        assert!(fallback.starts_with("NetClientMock_"));
        assert_eq!(fallback.len(), "NetClientMock_".len() + 8);
    }

    #[test]
    fn module_names_are_sanitized() {
        let arbiter = NameArbiter::new();
        arbiter.claim(&QualifiedName::new("App", "Feed"));
        let name = arbiter.claim(&QualifiedName::new("My-Kit", "Feed"));
        assert_eq!(name, "MyKitFeedMock");
    }
}

//! # Identity Resolver
//!
//! Two kinds of identity flow through the cache:
//!
//! - **Name hashes**: texture names hashed with a stable polynomial digest
//!   (`h = 31·h + byte`). The registry remembers the name for every hash so
//!   overrides can be written back out by name.
//! - **Content hashes**: 64-bit XXH64 digests of raw vertex bytes. They only
//!   answer "did this change since last tick?"; a collision reads as "no
//!   change" and is accepted.
//!
//! Aliases map one name hash onto a canonical one. Resolution is a single
//! lookup: an alias of an alias is not followed.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hasher;

use twox_hash::XxHash64;

/// Stable polynomial digest of a name.
#[inline]
#[must_use]
pub fn hash_name(name: &str) -> u64 {
    name.bytes()
        .fold(0_u64, |h, b| h.wrapping_mul(31).wrapping_add(u64::from(b)))
}

/// XXH64 (seed 0) of a byte buffer.
#[inline]
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

/// XXH64 (seed 0) of the raw bytes of a float buffer.
#[inline]
#[must_use]
pub fn hash_floats(data: &[f32]) -> u64 {
    hash_bytes(bytemuck::cast_slice(data))
}

/// Pluggable change-detection digest.
pub trait ContentHasher {
    /// Digest of a byte buffer.
    fn hash_bytes(&self, bytes: &[u8]) -> u64;

    /// Digest of a float buffer's raw bytes.
    fn hash_floats(&self, data: &[f32]) -> u64 {
        self.hash_bytes(bytemuck::cast_slice(data))
    }
}

/// Default content hasher: XXH64 with seed 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct XxContentHasher;

impl ContentHasher for XxContentHasher {
    #[inline]
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        hash_bytes(bytes)
    }
}

/// Bidirectional name ↔ hash map.
///
/// The name → hash side is ordered so serialization enumerates names in a
/// stable order.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    by_hash: HashMap<u64, String>,
    by_name: BTreeMap<String, u64>,
}

impl NameRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes `name` and records the mapping both ways.
    pub fn register(&mut self, name: &str) -> u64 {
        let hash = hash_name(name);
        if !self.by_name.contains_key(name) {
            self.by_name.insert(name.to_owned(), hash);
        }
        self.by_hash.entry(hash).or_insert_with(|| name.to_owned());
        hash
    }

    /// Name registered for `hash`.
    #[must_use]
    pub fn name_of(&self, hash: u64) -> Option<&str> {
        self.by_hash.get(&hash).map(String::as_str)
    }

    /// Hash registered for `name`.
    #[must_use]
    pub fn hash_of(&self, name: &str) -> Option<u64> {
        self.by_name.get(name).copied()
    }

    /// All registered names in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.by_name.iter().map(|(name, hash)| (name.as_str(), *hash))
    }

    /// Number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Alias hash → canonical hash, plus the reverse list for serialization.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    canonical: BTreeMap<u64, u64>,
    aliases: BTreeMap<u64, Vec<u64>>,
}

impl AliasTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `alias` as another name for `canonical`.
    pub fn insert(&mut self, alias: u64, canonical: u64) {
        if let Some(previous) = self.canonical.insert(alias, canonical) {
            if let Some(list) = self.aliases.get_mut(&previous) {
                list.retain(|&a| a != alias);
            }
        }
        let list = self.aliases.entry(canonical).or_default();
        if !list.contains(&alias) {
            list.push(alias);
        }
    }

    /// Single-hop resolution: the canonical hash if `hash` is an alias,
    /// otherwise `hash` itself.
    #[inline]
    #[must_use]
    pub fn resolve(&self, hash: u64) -> u64 {
        self.canonical.get(&hash).copied().unwrap_or(hash)
    }

    /// Aliases recorded for `canonical`, in insertion order.
    #[must_use]
    pub fn aliases_of(&self, canonical: u64) -> &[u64] {
        self.aliases.get(&canonical).map_or(&[], Vec::as_slice)
    }

    /// Number of aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    /// Returns true if no alias is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_name_polynomial() {
        assert_eq!(hash_name(""), 0);
        assert_eq!(hash_name("a"), 97);
        assert_eq!(hash_name("ab"), 97 * 31 + 98);
    }

    #[test]
    fn test_hash_name_is_stable() {
        assert_eq!(hash_name("castle_wall"), hash_name("castle_wall"));
        assert_ne!(hash_name("castle_wall"), hash_name("castle_walk"));
    }

    #[test]
    fn test_registry_both_directions() {
        let mut names = NameRegistry::new();
        let hash = names.register("grass");
        names.register("grass");

        assert_eq!(names.len(), 1);
        assert_eq!(names.hash_of("grass"), Some(hash));
        assert_eq!(names.name_of(hash), Some("grass"));
        assert_eq!(names.name_of(hash + 1), None);
    }

    #[test]
    fn test_registry_iterates_in_name_order() {
        let mut names = NameRegistry::new();
        names.register("zeta");
        names.register("alpha");
        names.register("mid");

        let order: Vec<&str> = names.iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_content_hash_detects_change() {
        let a = [1.0_f32, 2.0, 3.0];
        let b = [1.0_f32, 2.0, 3.5];
        assert_eq!(hash_floats(&a), hash_floats(&a));
        assert_ne!(hash_floats(&a), hash_floats(&b));
        assert_eq!(XxContentHasher.hash_floats(&a), hash_floats(&a));
    }

    #[test]
    fn test_alias_single_hop() {
        let mut aliases = AliasTable::new();
        aliases.insert(1, 2);
        aliases.insert(2, 3);

        // 1 → 2 only; the 2 → 3 link is not chased.
        assert_eq!(aliases.resolve(1), 2);
        assert_eq!(aliases.resolve(2), 3);
        assert_eq!(aliases.resolve(3), 3);
    }

    #[test]
    fn test_alias_reassignment_updates_reverse_list() {
        let mut aliases = AliasTable::new();
        aliases.insert(10, 20);
        aliases.insert(11, 20);
        assert_eq!(aliases.aliases_of(20), &[10, 11]);

        aliases.insert(10, 30);
        assert_eq!(aliases.aliases_of(20), &[11]);
        assert_eq!(aliases.aliases_of(30), &[10]);
        assert_eq!(aliases.len(), 2);
    }
}

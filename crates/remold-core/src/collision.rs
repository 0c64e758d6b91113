//! Deterministic sibling-key collision resolution
//!
//! Sibling keys under one parent must stay unique among non-deleted children.
//! The live recorder and the replay engine share the exact same policy, so a
//! collision realized only at replay time (a record shaped differently from
//! the one the recipe was recorded on) resolves to the same key the recorder
//! would have chosen.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use std::collections::BTreeSet;

/// Resolve a desired key against the set of keys already held by non-deleted
/// siblings: the desired key itself if free, else `key_1`, `key_2`, ... at
/// the first free numeric suffix.
pub fn resolve_key(desired: &str, taken: &BTreeSet<String>) -> String {
    if !taken.contains(desired) {
        return desired.to_string();
    }
    suffixed(desired, taken)
}

/// Key for a displaced occupant.
///
/// When a deleted node is restored to its own original key and a different
/// node currently holds it, the occupant is renamed rather than the restoring
/// node, so an undo returns identity to the node that historically owned it.
/// The occupant always moves to a fresh suffix; `taken` must include every
/// key the caller wants kept clear, including keys historically held by
/// siblings, so a displaced occupant never lands on another node's identity.
pub fn displacement_key(current: &str, taken: &BTreeSet<String>) -> String {
    suffixed(current, taken)
}

fn suffixed(base: &str, taken: &BTreeSet<String>) -> String {
    let mut n = 1u64;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_free_key_is_returned_unchanged() {
        assert_eq!(resolve_key("name", &set(&["id", "score"])), "name");
    }

    #[test]
    fn test_first_free_suffix_wins() {
        assert_eq!(resolve_key("name", &set(&["name"])), "name_1");
        assert_eq!(resolve_key("name", &set(&["name", "name_1"])), "name_2");
        assert_eq!(resolve_key("name", &set(&["name", "name_2"])), "name_1");
    }

    #[test]
    fn test_displacement_never_keeps_current_key() {
        // even though "name" is only held by the occupant itself
        assert_eq!(displacement_key("name", &set(&["name"])), "name_1");
        assert_eq!(
            displacement_key("name", &set(&["name", "name_1"])),
            "name_2"
        );
    }
}

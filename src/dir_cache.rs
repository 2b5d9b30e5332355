//! C4: the directory cache (§4.4).
//!
//! Per-directory set of immediate child names. A directory is either
//! "unpopulated" (never listed) or "populated" (complete, per invariant I3)
//! — there is no TTL; a second writer on the same bucket is invisible until
//! the next explicit invalidation (§5, §9).

use std::collections::BTreeSet;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DirectoryCache {
    children: HashMap<String, BTreeSet<String>>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_populated(&self, dir_key: &str) -> bool {
        self.children.contains_key(dir_key)
    }

    pub fn get(&self, dir_key: &str) -> Option<&BTreeSet<String>> {
        self.children.get(dir_key)
    }

    /// Marks `dir_key` as populated with exactly this set of names.
    pub fn populate(&mut self, dir_key: &str, names: impl IntoIterator<Item = String>) {
        self.children.insert(dir_key.to_string(), names.into_iter().collect());
    }

    /// Adds `name` to `dir_key`'s set if the directory is already populated;
    /// a not-yet-populated directory will simply pick the entry up on its
    /// first `readdir` listing.
    pub fn add_child(&mut self, dir_key: &str, name: &str) {
        if let Some(set) = self.children.get_mut(dir_key) {
            set.insert(name.to_string());
        }
    }

    pub fn remove_child(&mut self, dir_key: &str, name: &str) {
        if let Some(set) = self.children.get_mut(dir_key) {
            set.remove(name);
        }
    }

    /// Forgets everything known about `dir_key` (used when a directory
    /// itself is deleted).
    pub fn invalidate(&mut self, dir_key: &str) {
        self.children.remove(dir_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpopulated_directory_reports_as_such() {
        let cache = DirectoryCache::new();
        assert!(!cache.is_populated("dir"));
    }

    #[test]
    fn populate_then_add_and_remove_child() {
        let mut cache = DirectoryCache::new();
        cache.populate("dir", ["a".to_string()]);
        cache.add_child("dir", "b");
        assert_eq!(cache.get("dir").unwrap().len(), 2);
        cache.remove_child("dir", "a");
        assert_eq!(cache.get("dir").unwrap().len(), 1);
    }

    #[test]
    fn add_child_on_unpopulated_directory_is_a_noop() {
        let mut cache = DirectoryCache::new();
        cache.add_child("dir", "a");
        assert!(!cache.is_populated("dir"));
    }
}

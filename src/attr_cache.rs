//! C3: the attribute cache (§4.3).
//!
//! A plain, process-local map from key to envelope. No TTL: the cache is
//! authoritative after any local mutation and is only evicted explicitly, on
//! `unlink`/`rmdir` of the key it describes (§3 invariant I2).

use std::collections::HashMap;

use crate::envelope::Envelope;

#[derive(Debug, Default)]
pub struct AttributeCache {
    entries: HashMap<String, Envelope>,
}

impl AttributeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Envelope> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: &str, envelope: Envelope) {
        self.entries.insert(key.to_string(), envelope);
    }

    /// Mutates the cached envelope in place if present, returning the updated
    /// value. Used by `write`/`truncate`/`utime` to stay authoritative
    /// without a re-fetch.
    pub fn update<F: FnOnce(&mut Envelope)>(&mut self, key: &str, f: F) -> Option<&Envelope> {
        let entry = self.entries.get_mut(key)?;
        f(entry);
        Some(&*entry)
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

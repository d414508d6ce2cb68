//! Per-invocation session → thread map.
//!
//! Lives only as long as the resolver that owns it; entries are dropped as
//! soon as remote validation fails.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ThreadCache {
    entries: HashMap<String, String>,
}

impl ThreadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &str) -> Option<&str> {
        self.entries.get(session_id).map(String::as_str)
    }

    pub fn insert(&mut self, session_id: &str, thread_id: &str) {
        self.entries
            .insert(session_id.to_string(), thread_id.to_string());
    }

    pub fn remove(&mut self, session_id: &str) -> Option<String> {
        self.entries.remove(session_id)
    }
}

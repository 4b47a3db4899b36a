//! Result cache for SELECT/SHOW statements.
//!
//! Entries are keyed by a hash of the whitespace-normalized statement and its
//! serialized bindings, and remember which tables they read so a write to one of
//! those tables can drop them.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::qb::compile::collapse_whitespace;
use crate::row::Record;
use crate::statement::StatementKind;
use crate::value::Bindings;

#[derive(Debug)]
struct CacheEntry {
    tables: Vec<String>,
    rows: Vec<Record>,
}

/// In-process result cache, shared through `&self`.
#[derive(Debug, Default)]
pub struct QueryCache {
    inner: Mutex<HashMap<String, CacheEntry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a statement and its bindings.
    pub fn key(query: &str, params: &Bindings) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(collapse_whitespace(query).as_bytes());
        hasher.update(b"\n");
        hasher.update(serde_json::to_string(params).unwrap_or_default().as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    pub fn has(&self, query: &str, params: &Bindings) -> bool {
        self.lock().contains_key(&Self::key(query, params))
    }

    pub fn get(&self, query: &str, params: &Bindings) -> Option<Vec<Record>> {
        let hit = self
            .lock()
            .get(&Self::key(query, params))
            .map(|entry| entry.rows.clone());
        tracing::trace!(target: "chainsql.cache", hit = hit.is_some(), "cache lookup");
        hit
    }

    /// Store rows for a read statement. Returns `false` (and stores nothing)
    /// for statements that are not SELECT/SHOW.
    pub fn put(&self, query: &str, params: &Bindings, tables: &[String], rows: Vec<Record>) -> bool {
        if !StatementKind::detect(query).is_cacheable() {
            return false;
        }
        let entry = CacheEntry {
            tables: tables.to_vec(),
            rows,
        };
        self.lock().insert(Self::key(query, params), entry);
        true
    }

    /// Drop every entry that read `table`. Returns the number of entries removed.
    pub fn clear(&self, table: &str) -> usize {
        let mut inner = self.lock();
        let before = inner.len();
        inner.retain(|_, entry| !entry.tables.iter().any(|t| t == table));
        let removed = before - inner.len();
        if removed > 0 {
            tracing::trace!(target: "chainsql.cache", table, removed, "cache invalidated");
        }
        removed
    }

    pub fn clear_all(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

//! Caller-owned memo of table models.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::table::Table;
use crate::error::Result;

/// Read-mostly cache of tables keyed by name.
///
/// The cache is owned by whoever runs the pipeline and is never global.
/// Call [`clear`](Self::clear) whenever the schema is redefined (for
/// example after applying a migration), or [`invalidate`](Self::invalidate)
/// for a single table.
#[derive(Debug, Default)]
pub struct SchemaCache {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl SchemaCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding `tables`.
    #[must_use]
    pub fn with_tables(tables: impl IntoIterator<Item = Table>) -> Self {
        let cache = Self::new();
        for table in tables {
            cache.insert(table);
        }
        cache
    }

    /// Stores a table, replacing any previous entry with the same name.
    pub fn insert(&self, table: Table) -> Arc<Table> {
        let table = Arc::new(table);
        self.tables
            .write()
            .insert(table.name.clone(), Arc::clone(&table));
        table
    }

    /// Returns the cached table named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.read().get(name).cloned()
    }

    /// Returns the cached table, computing and storing it on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the error from `load`; nothing is cached in that case.
    pub fn get_or_try_insert_with<F>(&self, name: &str, load: F) -> Result<Arc<Table>>
    where
        F: FnOnce() -> Result<Table>,
    {
        if let Some(table) = self.get(name) {
            return Ok(table);
        }
        let table = load()?;
        let mut tables = self.tables.write();
        // Another caller may have filled the slot while we were loading.
        let entry = tables
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(table));
        Ok(Arc::clone(entry))
    }

    /// Drops a single entry.
    pub fn invalidate(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.write().remove(name)
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.tables.write().clear();
    }

    /// Number of cached tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_insert_and_get() {
        let cache = SchemaCache::new();
        assert!(cache.is_empty());
        cache.insert(Table::new("users"));
        assert_eq!(cache.get("users").unwrap().name, "users");
        assert!(cache.get("posts").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_or_try_insert_with_loads_once() {
        let cache = SchemaCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            cache
                .get_or_try_insert_with("users", || {
                    calls += 1;
                    Ok(Table::new("users"))
                })
                .unwrap();
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache = SchemaCache::new();
        let result = cache.get_or_try_insert_with("users", || Err(Error::Query("boom".into())));
        assert!(result.is_err());
        assert!(cache.get("users").is_none());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = SchemaCache::with_tables([Table::new("users"), Table::new("posts")]);
        assert!(cache.invalidate("users").is_some());
        assert!(cache.get("users").is_none());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaCache>();
    }
}

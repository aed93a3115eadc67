//! Table name to adapter lookup

use std::collections::HashMap;

use super::{SqliteTableAdapter, SyncAdapter};
use crate::error::{Error, Result};
use crate::models::SyncTable;

/// Adapters keyed by table
pub struct AdapterRegistry {
    adapters: HashMap<SyncTable, Box<dyn SyncAdapter>>,
}

impl AdapterRegistry {
    /// Registry with no adapters
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry with the `SQLite` adapter for every built-in table
    pub fn with_default_tables() -> Self {
        let mut registry = Self::empty();
        for table in SyncTable::ALL {
            registry.register(Box::new(SqliteTableAdapter::for_table(table)));
        }
        registry
    }

    /// Register an adapter, replacing any previous one for the same table
    pub fn register(&mut self, adapter: Box<dyn SyncAdapter>) {
        self.adapters.insert(adapter.table(), adapter);
    }

    /// Resolve a wire table name.
    ///
    /// # Errors
    /// `Error::UnknownTable` when the name is not a synced table or has no adapter.
    pub fn get(&self, table_name: &str) -> Result<&dyn SyncAdapter> {
        let table = table_name.parse::<SyncTable>()?;
        self.adapter(table)
            .ok_or_else(|| Error::UnknownTable(table_name.to_string()))
    }

    pub fn adapter(&self, table: SyncTable) -> Option<&dyn SyncAdapter> {
        self.adapters.get(&table).map(AsRef::as_ref)
    }

    /// Registered tables in declaration order
    pub fn tables(&self) -> impl Iterator<Item = SyncTable> + '_ {
        SyncTable::ALL
            .into_iter()
            .filter(|table| self.adapters.contains_key(table))
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_default_tables()
    }
}

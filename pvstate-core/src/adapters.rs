//! Default port implementations.

use pvstate_domain::SessionLookup;
use std::cell::Cell;
use std::collections::BTreeMap;

/// Session with fixed settings values and a counting id allocator.
///
/// Stands in for a live application session when migrating files offline.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    settings: BTreeMap<(String, String, String), i64>,
    next_id: Cell<u32>,
}

impl StaticSession {
    /// A session whose allocator hands out `first_id`, `first_id + 1`, ...
    pub fn new(first_id: u32) -> Self {
        Self {
            settings: BTreeMap::new(),
            next_id: Cell::new(first_id),
        }
    }

    pub fn with_setting(
        mut self,
        group: impl Into<String>,
        name: impl Into<String>,
        property: impl Into<String>,
        value: i64,
    ) -> Self {
        self.set(group, name, property, value);
        self
    }

    pub fn set(
        &mut self,
        group: impl Into<String>,
        name: impl Into<String>,
        property: impl Into<String>,
        value: i64,
    ) {
        self.settings
            .insert((group.into(), name.into(), property.into()), value);
    }

    /// Id the next allocation will return.
    pub fn peek_next_id(&self) -> u32 {
        self.next_id.get()
    }
}

impl SessionLookup for StaticSession {
    fn setting_int(&self, group: &str, name: &str, property: &str) -> Option<i64> {
        self.settings
            .get(&(group.to_string(), name.to_string(), property.to_string()))
            .copied()
    }

    fn next_global_id(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id.saturating_add(1));
        id
    }
}

//! Clap-free settings for the migration driver.

use pvstate_domain::QueryScope;
use pvstate_types::Version;
use pvstate_types::schema::SERVER_MANAGER_STATE;

/// Settings for one migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSettings {
    /// Tag of the element that carries the state version.
    pub root_tag: String,

    /// Oldest supported version. Older, absent or malformed versions are
    /// migrated as if they were this one.
    pub floor: Version,

    pub query_scope: QueryScope,
}

impl MigrationSettings {
    pub const DEFAULT_FLOOR: Version = Version::new(4, 0, 1);
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            root_tag: SERVER_MANAGER_STATE.to_string(),
            floor: Self::DEFAULT_FLOOR,
            query_scope: QueryScope::default(),
        }
    }
}

//! Configuration file loading for pvstate.
//!
//! Discovers and loads `pvstate.toml` from the directory of the state file
//! being migrated. Merges config file settings with CLI arguments (CLI takes
//! precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pvstate_core::adapters::StaticSession;
use pvstate_core::{MigrationSettings, QueryScope, Version};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "pvstate.toml";

/// Proxy group the session settings live in.
pub const SETTINGS_GROUP: &str = "settings";

/// First id handed out by the offline session when none is configured.
pub const DEFAULT_FIRST_ID: u32 = 10_000;

/// Top-level configuration from pvstate.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PvstateConfig {
    /// Driver settings.
    pub migration: MigrationConfig,

    /// Values the offline session answers with.
    pub session: SessionConfig,
}

/// Migration section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// `"proxy"` or `"document"`.
    pub query_scope: Option<String>,

    /// Oldest supported state version, e.g. `"4.0.1"`.
    pub floor: Option<String>,
}

/// Session section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// First id the allocator hands out.
    pub next_id: Option<u32>,

    /// Integer settings keyed by settings proxy name, then property name.
    pub settings: BTreeMap<String, BTreeMap<String, i64>>,
}

/// Discover the pvstate.toml config file next to the input.
///
/// Returns `None` if no config file is found.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a pvstate.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<PvstateConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<PvstateConfig> {
    let config: PvstateConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config if given, else discover one in `dir`, else default.
pub fn load_or_default(
    explicit: Option<&Utf8Path>,
    dir: &Utf8Path,
) -> anyhow::Result<PvstateConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(dir) {
        Some(path) => load_config(&path),
        None => Ok(PvstateConfig::default()),
    }
}

/// Merged configuration combining config file and CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub settings: MigrationSettings,

    /// `None` when running without a session.
    pub session: Option<StaticSession>,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: PvstateConfig,
}

impl ConfigMerger {
    pub fn new(config: PvstateConfig) -> Self {
        Self { config }
    }

    /// Merge with `migrate`/`sniff` CLI arguments.
    ///
    /// `cli_scope` and `cli_floor` replace the file values when given;
    /// `no_session` drops the session regardless of the file.
    pub fn merge_migrate_args(
        self,
        cli_scope: Option<QueryScope>,
        cli_floor: Option<Version>,
        no_session: bool,
    ) -> anyhow::Result<MergedConfig> {
        let mut settings = MigrationSettings::default();

        let file_scope = self
            .config
            .migration
            .query_scope
            .as_deref()
            .map(str::parse::<QueryScope>)
            .transpose()
            .map_err(|e| anyhow::anyhow!("migration.query_scope: {e}"))?;
        if let Some(scope) = cli_scope.or(file_scope) {
            settings.query_scope = scope;
        }

        let file_floor = self
            .config
            .migration
            .floor
            .as_deref()
            .map(str::parse::<Version>)
            .transpose()
            .context("migration.floor")?;
        if let Some(floor) = cli_floor.or(file_floor) {
            settings.floor = floor;
        }

        let session = if no_session {
            None
        } else {
            let first_id = self.config.session.next_id.unwrap_or(DEFAULT_FIRST_ID);
            let mut session = StaticSession::new(first_id);
            for (proxy, values) in &self.config.session.settings {
                for (property, value) in values {
                    session.set(SETTINGS_GROUP, proxy.as_str(), property.as_str(), *value);
                }
            }
            Some(session)
        };

        Ok(MergedConfig { settings, session })
    }
}

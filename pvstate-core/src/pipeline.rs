//! The migration driver.
//!
//! Locate the state root, sniff its version, run every pending step over a
//! private document copy, then write the result back into the host element.
//! Nothing reaches the host element unless every step succeeded.

use crate::error::MigrationError;
use crate::settings::MigrationSettings;
use chrono::{DateTime, Utc};
use pvstate_domain::{SessionLookup, StepChain, StepContext};
use pvstate_types::{
    MigrationReport, MigrationWarning, ReportInput, ReportRunInfo, StateElement, Transition,
    Version, WarningKind,
};
use pvstate_xml::{Document, parse_element, render_document, render_element};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Declared and effective version of a state root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSniff {
    /// Raw `version` attribute, if present.
    pub declared: Option<String>,
    /// Version migration starts from.
    pub effective: Version,
    /// Set when the declared version was absent, malformed or below the floor.
    pub warning: Option<MigrationWarning>,
}

/// Read the version of the state root under `host` without migrating.
pub fn sniff_version(
    host: &StateElement,
    settings: &MigrationSettings,
) -> Result<VersionSniff, MigrationError> {
    let root = locate_root(host, &settings.root_tag)?;
    Ok(sniff(root, settings))
}

fn invalid_root(host: &StateElement, tag: &str) -> MigrationError {
    MigrationError::InvalidRoot {
        expected: tag.to_string(),
        found: host.name.clone(),
    }
}

fn locate_root<'a>(host: &'a StateElement, tag: &str) -> Result<&'a StateElement, MigrationError> {
    if host.name == tag {
        return Ok(host);
    }
    host.find_nested_by_name(tag)
        .ok_or_else(|| invalid_root(host, tag))
}

fn locate_root_mut<'a>(
    host: &'a mut StateElement,
    tag: &str,
) -> Result<&'a mut StateElement, MigrationError> {
    if host.name == tag {
        return Ok(host);
    }
    let found = host.name.clone();
    host.find_nested_by_name_mut(tag)
        .ok_or_else(|| MigrationError::InvalidRoot {
            expected: tag.to_string(),
            found,
        })
}

fn sniff(root: &StateElement, settings: &MigrationSettings) -> VersionSniff {
    let declared = root.attribute("version").map(str::to_string);
    let floor = settings.floor;

    let problem = match declared.as_deref().map(str::parse::<Version>) {
        Some(Ok(v)) if !v.less_than(floor) => {
            return VersionSniff {
                declared,
                effective: v,
                warning: None,
            };
        }
        Some(Ok(v)) => format!("was saved with state version {v}, older than the oldest supported {floor}"),
        Some(Err(e)) => format!("has an unreadable state version ({e})"),
        None => "does not declare a state version".to_string(),
    };

    let warning = MigrationWarning::new(
        WarningKind::IncompatibleVersion,
        format!(
            "The state file {problem}. It will be migrated as version {floor}; \
             loading may fail or produce unexpected results."
        ),
    );
    tracing::warn!(kind = %warning.kind, "{}", warning.message);
    VersionSniff {
        declared,
        effective: floor,
        warning: Some(warning),
    }
}

/// Migrate the state root found at or under `host` in place.
///
/// On error the host element is left exactly as it was.
pub fn migrate_element(
    host: &mut StateElement,
    session: Option<&dyn SessionLookup>,
    settings: &MigrationSettings,
    chain: &StepChain,
) -> Result<MigrationReport, MigrationError> {
    let root = locate_root_mut(host, &settings.root_tag)?;
    let sniffed = sniff(root, settings);

    let mut report = MigrationReport::new(sniffed.declared, sniffed.effective);
    report.warnings.extend(sniffed.warning);

    let mut current = sniffed.effective;
    if chain.pending(current).next().is_none() {
        info!(version = %current, "state is current, nothing to migrate");
        return Ok(report);
    }

    let mut doc = Document::from_element(root);
    for step in chain.steps() {
        let meta = step.meta();
        if !current.less_than(meta.transition.to) {
            continue;
        }
        debug!(step = meta.key, transition = %meta.transition, "applying migration step");

        let mut ctx = StepContext::new(session, settings.query_scope, meta.transition)
            .with_root_tag(&settings.root_tag);
        step.apply(&mut doc, &mut ctx)
            .map_err(|source| step_failed(meta.key, meta.transition, source))?;

        report.warnings.extend(ctx.into_warnings());
        report.record_step(meta.key, meta.transition);
        current = meta.transition.to;
    }

    let text = render_document(&doc)?;
    let migrated = parse_element(&text)?;
    root.replace_contents(migrated);

    info!(
        from = %report.start_version,
        to = %report.final_version,
        steps = report.applied.len(),
        warnings = report.warnings.len(),
        "migrated state"
    );
    Ok(report)
}

fn step_failed(key: &str, transition: Transition, source: anyhow::Error) -> MigrationError {
    tracing::error!(step = key, transition = %transition, "migration step failed: {source:#}");
    MigrationError::StepFailed {
        key: key.to_string(),
        transition,
        source,
    }
}

/// Parse state text, migrate it and render it back.
///
/// When nothing applies the input text is returned verbatim.
pub fn migrate_text(
    text: &str,
    session: Option<&dyn SessionLookup>,
    settings: &MigrationSettings,
    chain: &StepChain,
) -> Result<(String, MigrationReport), MigrationError> {
    let mut host = parse_element(text).map_err(MigrationError::Parse)?;
    let report = migrate_element(&mut host, session, settings, chain)?;
    if report.is_noop() {
        return Ok((text.to_string(), report));
    }
    Ok((render_element(&host)?, report))
}

/// Record which input the report describes.
pub fn attach_input(report: &mut MigrationReport, path: &str, bytes: &[u8]) {
    report.input = Some(ReportInput {
        path: path.to_string(),
        sha256: sha256_hex(bytes),
        bytes: bytes.len() as u64,
    });
}

/// Record run timing on the report.
pub fn attach_run(report: &mut MigrationReport, started: DateTime<Utc>, ended: DateTime<Utc>) {
    let duration_ms = (ended - started).num_milliseconds().max(0) as u64;
    report.run = Some(ReportRunInfo {
        started_at: started.to_rfc3339(),
        ended_at: Some(ended.to_rfc3339()),
        duration_ms: Some(duration_ms),
    });
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

use crate::version::{Transition, Version};
use crate::warning::{MigrationWarning, WarningKind};
use serde::{Deserialize, Serialize};

/// Outcome of one migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub schema: String,

    /// Raw `version` attribute as found on the root, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_version: Option<String>,

    /// Version the step chain started from (after floor clamping).
    pub start_version: Version,

    /// Last tracked version; equals `start_version` when nothing applied.
    pub final_version: Version,

    #[serde(default)]
    pub applied: Vec<AppliedStep>,

    #[serde(default)]
    pub warnings: Vec<MigrationWarning>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<ReportInput>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<ReportRunInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedStep {
    pub key: String,
    pub transition: Transition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportInput {
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRunInfo {
    pub started_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl MigrationReport {
    pub fn new(declared_version: Option<String>, start_version: Version) -> Self {
        Self {
            schema: crate::schema::PVSTATE_REPORT_V1.to_string(),
            declared_version,
            start_version,
            final_version: start_version,
            applied: Vec::new(),
            warnings: Vec::new(),
            input: None,
            run: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }

    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &MigrationWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    pub fn record_step(&mut self, key: &str, transition: Transition) {
        self.applied.push(AppliedStep {
            key: key.to_string(),
            transition,
        });
        self.final_version = transition.to;
    }
}

use crate::version::Transition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a non-fatal advisory produced while migrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Declared version is older than the supported floor, absent or unparseable.
    IncompatibleVersion,
    /// A deprecated filter was kept alive through its legacy implementation.
    DeprecatedFilter,
    /// A context-dependent edit fell back because the live session was unavailable.
    MissingContext,
}

impl WarningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningKind::IncompatibleVersion => "incompatible_version",
            WarningKind::DeprecatedFilter => "deprecated_filter",
            WarningKind::MissingContext => "missing_context",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-visible advisory text, surfaced once per triggering condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationWarning {
    pub kind: WarningKind,
    pub message: String,

    /// Step that raised the warning; `None` for driver-level warnings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
}

impl MigrationWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            transition: None,
        }
    }

    pub fn during(mut self, transition: Transition) -> Self {
        self.transition = Some(transition);
        self
    }
}

impl fmt::Display for MigrationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.transition {
            Some(t) => write!(f, "[{}] {}: {}", t, self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

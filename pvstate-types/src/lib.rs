//! Shared DTOs (schemas-as-code) for the pvstate workspace.
//!
//! # Design constraints
//! - [`MigrationReport`](report::MigrationReport) is serialized to disk by the CLI.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod element;
pub mod report;
pub mod version;
pub mod warning;

pub use element::StateElement;
pub use report::{AppliedStep, MigrationReport, ReportInput, ReportRunInfo};
pub use version::{Transition, Version, VersionParseError};
pub use warning::{MigrationWarning, WarningKind};

/// Schema identifiers.
pub mod schema {
    pub const PVSTATE_REPORT_V1: &str = "pvstate.report.v1";

    /// Tag of the element that carries the declared state version.
    pub const SERVER_MANAGER_STATE: &str = "ServerManagerState";
}

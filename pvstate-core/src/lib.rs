//! Embeddable core library for pvstate.
//!
//! Provides a clap-free entry point that migrates a host state element (or
//! state text) forward through the release chain.
//!
//! # Ports
//!
//! The only collaborator is the live session, reached through
//! [`SessionLookup`]. [`adapters::StaticSession`] is a fixed-value
//! implementation for tools and tests.
//!
//! # Entry points
//!
//! - [`migrate_element`](pipeline::migrate_element) - migrate a host element in place
//! - [`migrate_text`](pipeline::migrate_text) - parse, migrate and render state text
//! - [`sniff_version`](pipeline::sniff_version) - report declared and effective versions

pub mod adapters;
pub mod error;
pub mod pipeline;
pub mod settings;

pub use error::MigrationError;
pub use pipeline::{VersionSniff, migrate_element, migrate_text, sniff_version};
pub use settings::MigrationSettings;

// Re-export the domain surface so embedders don't need pvstate-domain directly.
pub use pvstate_domain::{MigrationStep, QueryScope, SessionLookup, StepChain, StepMeta};
pub use pvstate_types::{MigrationReport, MigrationWarning, StateElement, Version, WarningKind};

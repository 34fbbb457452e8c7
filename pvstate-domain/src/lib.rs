//! Domain logic: the ordered library of state-schema migration steps.
//!
//! This crate owns *what* each schema transition changes. It does not own how
//! a host element is read, version-sniffed or re-materialized; that's the
//! `pvstate-core` crate.

mod chain;
mod ports;
mod steps;

pub use chain::{ChainError, StepChain};
pub use ports::SessionLookup;
pub use steps::{MigrationStep, QueryScope, StepContext, StepMeta, builtin_step_metas, builtin_steps};

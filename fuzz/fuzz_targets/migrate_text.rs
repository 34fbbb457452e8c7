#![no_main]

//! Fuzz target for the full parse -> migrate -> render pipeline.
//!
//! Malformed input must surface as an error, never a panic.

use libfuzzer_sys::fuzz_target;
use pvstate_core::adapters::StaticSession;
use pvstate_core::{MigrationSettings, QueryScope, SessionLookup, StepChain, migrate_text};

#[derive(Debug, arbitrary::Arbitrary)]
struct MigrateInput {
    text: String,
    document_scope: bool,
    with_session: bool,
    first_id: u32,
    reset_mode: i8,
}

fuzz_target!(|input: MigrateInput| {
    let settings = MigrationSettings {
        query_scope: if input.document_scope {
            QueryScope::Document
        } else {
            QueryScope::Proxy
        },
        ..MigrationSettings::default()
    };
    let session = StaticSession::new(input.first_id).with_setting(
        "settings",
        "GeneralSettings",
        "TransferFunctionResetMode",
        i64::from(input.reset_mode),
    );
    let session = input.with_session.then_some(&session as &dyn SessionLookup);
    let chain = StepChain::new();

    let _ = migrate_text(&input.text, session, &settings, &chain);
});

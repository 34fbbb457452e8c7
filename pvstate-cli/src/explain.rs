//! Step explanations for the `pvstate explain` command.
//!
//! The step chain carries a short description of each step; this module adds
//! the long-form notes: which proxies a step touches, what it needs from the
//! session, which warnings it can raise and how to fix a state file by hand.

use pvstate_core::{MigrationStep, StepChain, WarningKind};

/// Long-form notes about a built-in step.
#[derive(Debug, Clone)]
pub struct StepExplanation {
    /// Step key (e.g., "pv.4_1_to_4_2").
    pub key: &'static str,
    /// Proxies and elements the step rewrites.
    pub touches: &'static [&'static str],
    /// Session values the step consults.
    pub session_inputs: &'static [&'static str],
    /// Warnings the step may record.
    pub warnings: &'static [WarningKind],
    /// How to make the same edit by hand.
    pub manual: &'static str,
}

/// Registry of all step explanations, in chain order.
pub static STEP_REGISTRY: &[StepExplanation] = &[
    StepExplanation {
        key: "pv.4_0_to_4_1",
        touches: &["filters/CTHPart"],
        session_inputs: &[],
        warnings: &[],
        manual: r#"Collect the values of AddDoubleVolumeArrayName, AddFloatVolumeArrayName and
AddUnsignedCharVolumeArrayName, delete those three properties and add a single
VolumeArrays property listing the distinct names in sorted order."#,
    },
    StepExplanation {
        key: "pv.4_1_to_4_2",
        touches: &[
            "representations/* (ColorArrayName, ColorAttributeType)",
            "interactorstyles/*, cameramanipulators/* (removed)",
            "GlobalPropertiesManager links",
            "views/* chart axis properties",
            "filters/Glyph, filters/ArbitrarySourceGlyph",
        ],
        session_inputs: &[],
        warnings: &[WarningKind::DeprecatedFilter],
        manual: r#"Merge ColorAttributeType and ColorArrayName into one five-element
ColorArrayName ("", "", "", type, name). Move every GlobalPropertiesManager
Link into ServerManagerState/Links as a GlobalPropertyLink. Split packed chart
axis properties into one property per axis (LeftAxisColor, BottomAxisColor,
...). Glyph filters without a GlyphMode property become LegacyGlyph; consider
re-creating them with the current Glyph filter."#,
    },
    StepExplanation {
        key: "pv.4_2_to_5_1",
        touches: &["GlobalPropertyLink[@property='CubeAxesColor']"],
        session_inputs: &[],
        warnings: &[],
        manual: r#"Delete every GlobalPropertyLink whose property is CubeAxesColor. The cube
axes representation no longer exists."#,
    },
    StepExplanation {
        key: "pv.5_1_to_5_4",
        touches: &["representations/ScalarBarWidgetRepresentation"],
        session_inputs: &[],
        warnings: &[],
        manual: r#"Add WindowLocation = 0 ("AnyLocation") to every scalar bar. Rename Position2
to ScalarBarLength and keep only the larger of its two components."#,
    },
    StepExplanation {
        key: "pv.5_4_to_5_5",
        touches: &[
            "lookup_tables/PVLookupTable (LockScalarRange)",
            "filters/Calculator (AttributeMode)",
            "sources/CGNSSeriesReader (Blocks)",
            "views/RenderView headlight properties",
            "additional_lights/Light (created)",
        ],
        session_inputs: &[
            "settings/GeneralSettings/TransferFunctionResetMode",
            "global id allocator",
        ],
        warnings: &[WarningKind::MissingContext],
        manual: r#"Rename LockScalarRange to AutomaticRescaleRangeMode: locked tables get -1,
unlocked tables get your TransferFunctionResetMode setting. Rename the
Calculator AttributeMode to AttributeType and subtract one. Give each CGNS
reader a Blocks selection built from its enabled bases and families. Replace
the render view headlight with a Light proxy in the additional_lights group
and reference it from the view's AdditionalLights property.

Without a session, set [session.settings.GeneralSettings] in pvstate.toml so
unlocked tables are converted, and [session] next_id so new light proxies get
ids that do not collide with the host application."#,
    },
];

/// Find a step by key, transition label or target version.
///
/// Keys are matched case-insensitively and with `-` accepted for `_`.
pub fn lookup_step<'a>(chain: &'a StepChain, query: &str) -> Option<&'a dyn MigrationStep> {
    if let Some(step) = chain.find(query) {
        return Some(step);
    }
    let normalized = query.trim().to_lowercase().replace('-', "_");
    chain.steps().find(|s| {
        let key = s.meta().key;
        key == normalized || key.strip_prefix("pv.") == Some(normalized.as_str())
    })
}

/// Long-form notes for a step key.
pub fn explanation(key: &str) -> Option<&'static StepExplanation> {
    STEP_REGISTRY.iter().find(|e| e.key == key)
}

/// List all step keys in chain order.
pub fn list_step_keys(chain: &StepChain) -> Vec<&'static str> {
    chain.steps().map(|s| s.meta().key).collect()
}

/// Collapse the indentation of a multi-line description into one paragraph.
pub fn reflow(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

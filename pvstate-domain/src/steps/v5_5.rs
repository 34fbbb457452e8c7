use super::lights::convert_headlights;
use super::props::{
    append_element, as_int, element_value, find_property, indexed_elements, new_property, proxies,
    rename_property,
};
use super::{MigrationStep, StepContext, StepMeta, release};
use anyhow::Context;
use pvstate_types::{Transition, WarningKind};
use pvstate_xml::{Document, NodeId, Query};
use std::collections::BTreeSet;

/// 5.5 changed transfer function rescaling, calculators, CGNS block selection
/// and render view lighting.
pub struct Release55Step;

const NO_RESET_MODE: &str = "Could not read TransferFunctionResetMode from the general \
settings; AutomaticRescaleRangeMode of unlocked lookup tables was left unchanged.";

impl MigrationStep for Release55Step {
    fn meta(&self) -> StepMeta {
        StepMeta {
            key: "pv.5_4_to_5_5",
            transition: Transition::new(release(5, 4), release(5, 5)),
            title: "Rescale mode, calculator attribute type, CGNS blocks and headlights",
            description: "Turns LockScalarRange into AutomaticRescaleRangeMode (locked tables \
                never rescale, unlocked ones follow the session's TransferFunctionResetMode), \
                shifts Calculator AttributeMode to the 0-based AttributeType, derives the CGNS \
                reader's Blocks selection from its base/family status arrays and replaces the \
                render view headlight with an additional Light proxy.",
            uses_session: true,
        }
    }

    fn apply(&self, doc: &mut Document, ctx: &mut StepContext<'_>) -> anyhow::Result<()> {
        convert_lock_scalar_range(doc, ctx).context("converting LockScalarRange")?;
        shift_calculator_attribute_mode(doc, ctx.root_tag())
            .context("converting Calculator AttributeMode")?;
        select_cgns_blocks(doc, ctx).context("deriving CGNS reader blocks")?;
        convert_headlights(doc, ctx).context("converting render view headlights")?;
        Ok(())
    }
}

fn convert_lock_scalar_range(doc: &mut Document, ctx: &mut StepContext<'_>) -> anyhow::Result<()> {
    for table in proxies(doc, ctx.root_tag(), "lookup_tables", Some("PVLookupTable")) {
        let Some(prop) = doc.find_child_by_attribute(table, "Property", "name", "LockScalarRange")
        else {
            continue;
        };
        let element = doc.first_child_named(prop, "Element");
        let locked = element.is_some_and(|e| as_int(doc.attribute(e, "value")) != 0);
        rename_property(doc, prop, "AutomaticRescaleRangeMode")?;

        let Some(element) = element else {
            continue;
        };
        if locked {
            doc.set_attribute(element, "value", "-1")?;
            continue;
        }
        let mode = ctx
            .session()
            .and_then(|s| s.setting_int("settings", "GeneralSettings", "TransferFunctionResetMode"));
        match mode {
            Some(mode) => doc.set_attribute(element, "value", &mode.to_string())?,
            None => ctx.warn(WarningKind::MissingContext, NO_RESET_MODE),
        }
    }
    Ok(())
}

fn shift_calculator_attribute_mode(doc: &mut Document, root_tag: &str) -> anyhow::Result<()> {
    let query = Query::descendants(root_tag)
        .child("Proxy")
        .attr_eq("group", "filters")
        .attr_eq("type", "Calculator")
        .child("Property")
        .attr_eq("name", "AttributeMode");

    for prop in doc.select_all(doc.document_node(), &query) {
        rename_property(doc, prop, "AttributeType")?;
        if let Some(element) = doc.first_child_named(prop, "Element") {
            let shifted = as_int(doc.attribute(element, "value")) - 1;
            doc.set_attribute(element, "value", &shifted.to_string())?;
        }
        if let Some(domain) = doc.first_child_named(prop, "Domain") {
            doc.remove(domain);
        }
    }
    Ok(())
}

/// Whether the scoped `property` has element 0 equal to `expected`.
fn first_value_is(doc: &Document, root: NodeId, property: &str, expected: &str) -> bool {
    find_property(doc, root, property)
        .and_then(|p| element_value(doc, p, 0))
        .is_some_and(|v| v == expected)
}

/// Names from a `(name, status)` pair list whose status is `1`.
fn enabled_names(doc: &Document, root: NodeId, property: &str) -> Vec<String> {
    let Some(prop) = find_property(doc, root, property) else {
        return Vec::new();
    };
    let values: Vec<&str> = indexed_elements(doc, prop)
        .into_iter()
        .map(|(_, e)| doc.attribute(e, "value").unwrap_or_default())
        .collect();
    values
        .chunks(2)
        .filter(|pair| pair.len() == 2 && pair[1] == "1")
        .map(|pair| pair[0].to_string())
        .collect()
}

fn select_cgns_blocks(doc: &mut Document, ctx: &StepContext<'_>) -> anyhow::Result<()> {
    for reader in proxies(doc, ctx.root_tag(), "sources", Some("CGNSSeriesReader")) {
        let root = ctx.search_root(doc, reader);
        if find_property(doc, root, "Blocks").is_some() {
            continue;
        }

        // Both flags are read from the saved values. Mesh defaults to on,
        // boundary patches to off.
        let load_mesh = !first_value_is(doc, root, "LoadMesh", "0");
        let load_patches = first_value_is(doc, root, "LoadBndPatch", "1");

        let mut paths = BTreeSet::new();
        for base in enabled_names(doc, root, "BaseStatus") {
            if load_mesh {
                paths.insert(format!("/Grids/{base}"));
            }
            if load_patches {
                paths.insert(format!("/Patches/{base}"));
            }
        }
        for family in enabled_names(doc, root, "FamilyStatus") {
            paths.insert(format!("/Families/{family}"));
        }

        let blocks = new_property(doc, reader, None, "Blocks", paths.len() * 2)?;
        for (i, path) in paths.iter().enumerate() {
            append_element(doc, blocks, 2 * i, path)?;
            append_element(doc, blocks, 2 * i + 1, "1")?;
        }
        tracing::debug!(reader = %reader, blocks = paths.len(), "derived CGNS block selection");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::testing::{FakeSession, parse, render, run, run_with};
    use crate::steps::QueryScope;
    use pretty_assertions::assert_eq;

    fn values_of(doc: &Document, name: &str) -> Vec<String> {
        let q = Query::descendants("Property")
            .attr_eq("name", name)
            .child("Element");
        doc.select_all(doc.document_node(), &q)
            .into_iter()
            .map(|e| doc.attribute(e, "value").unwrap_or_default().to_string())
            .collect()
    }

    const LOOKUP_TABLES: &str = r#"<ServerManagerState version="5.4.0">
  <Proxy group="lookup_tables" type="PVLookupTable" id="20">
    <Property name="LockScalarRange" id="20.LockScalarRange" number_of_elements="1">
      <Element index="0" value="1"/>
      <Domain name="bool" id="20.LockScalarRange.bool"/>
    </Property>
  </Proxy>
  <Proxy group="lookup_tables" type="PVLookupTable" id="21">
    <Property name="LockScalarRange" id="21.LockScalarRange" number_of_elements="1">
      <Element index="0" value="0"/>
    </Property>
  </Proxy>
</ServerManagerState>"#;

    #[test]
    fn locked_tables_never_rescale_and_unlocked_follow_settings() {
        let mut doc = parse(LOOKUP_TABLES);
        let session = FakeSession::default().with_setting(
            "GeneralSettings",
            "TransferFunctionResetMode",
            2,
        );
        let warnings = run_with(&Release55Step, &mut doc, Some(&session), QueryScope::Proxy);
        assert!(warnings.is_empty());
        assert_eq!(values_of(&doc, "AutomaticRescaleRangeMode"), vec!["-1", "2"]);

        let text = render(&doc);
        assert!(!text.contains("LockScalarRange"));
        assert!(text.contains("id=\"20.AutomaticRescaleRangeMode.bool\""));
    }

    #[test]
    fn unlocked_tables_without_session_warn_once() {
        let mut doc = parse(LOOKUP_TABLES);
        let input = LOOKUP_TABLES.replace("value=\"1\"", "value=\"0\"");
        let mut both_unlocked = parse(&input);

        let warnings = run(&Release55Step, &mut doc);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::MissingContext);
        assert_eq!(values_of(&doc, "AutomaticRescaleRangeMode"), vec!["-1", "0"]);

        let warnings = run(&Release55Step, &mut both_unlocked);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn calculator_attribute_mode_becomes_zero_based() {
        let mut doc = parse(
            r#"<ServerManagerState>
  <Proxy group="filters" type="Calculator" id="30">
    <Property name="AttributeMode" id="30.AttributeMode" number_of_elements="1">
      <Element index="0" value="2"/>
      <Domain name="enum" id="30.AttributeMode.enum"/>
      <Domain name="other" id="30.AttributeMode.other"/>
    </Property>
  </Proxy>
</ServerManagerState>"#,
        );
        run(&Release55Step, &mut doc);

        assert_eq!(values_of(&doc, "AttributeType"), vec!["1"]);
        let text = render(&doc);
        assert!(!text.contains("AttributeMode"));
        assert!(!text.contains("name=\"enum\""));
        assert!(text.contains("id=\"30.AttributeType.other\""));
    }

    #[test]
    fn cgns_blocks_follow_status_arrays_and_load_bnd_patch() {
        let mut doc = parse(
            r#"<ServerManagerState>
  <Proxy group="sources" type="CGNSSeriesReader" id="40">
    <Property name="LoadBndPatch" id="40.LoadBndPatch" number_of_elements="1">
      <Element index="0" value="1"/>
    </Property>
    <Property name="BaseStatus" id="40.BaseStatus" number_of_elements="4">
      <Element index="0" value="Base"/>
      <Element index="1" value="1"/>
      <Element index="2" value="Other"/>
      <Element index="3" value="0"/>
    </Property>
    <Property name="FamilyStatus" id="40.FamilyStatus" number_of_elements="2">
      <Element index="0" value="Wall"/>
      <Element index="1" value="1"/>
    </Property>
  </Proxy>
</ServerManagerState>"#,
        );
        run(&Release55Step, &mut doc);
        assert_eq!(
            values_of(&doc, "Blocks"),
            vec!["/Families/Wall", "1", "/Grids/Base", "1", "/Patches/Base", "1"]
        );
        let q = Query::descendants("Property").attr_eq("name", "Blocks");
        let blocks = doc.select_first(doc.document_node(), &q).unwrap();
        assert_eq!(doc.attribute(blocks, "number_of_elements"), Some("6"));
        assert_eq!(doc.attribute(blocks, "id"), Some("40.Blocks"));
    }

    #[test]
    fn cgns_load_mesh_off_drops_grids() {
        let mut doc = parse(
            r#"<ServerManagerState>
  <Proxy group="sources" type="CGNSSeriesReader" id="40">
    <Property name="LoadMesh" id="40.LoadMesh" number_of_elements="1">
      <Element index="0" value="0"/>
    </Property>
    <Property name="BaseStatus" id="40.BaseStatus" number_of_elements="2">
      <Element index="0" value="Base"/>
      <Element index="1" value="1"/>
    </Property>
  </Proxy>
</ServerManagerState>"#,
        );
        run(&Release55Step, &mut doc);
        let q = Query::descendants("Property").attr_eq("name", "Blocks");
        let blocks = doc.select_first(doc.document_node(), &q).unwrap();
        assert_eq!(doc.attribute(blocks, "number_of_elements"), Some("0"));
        assert!(values_of(&doc, "Blocks").is_empty());
    }

    #[test]
    fn readers_with_blocks_are_left_alone() {
        let input = r#"<ServerManagerState>
  <Proxy group="sources" type="CGNSSeriesReader" id="40">
    <Property name="Blocks" id="40.Blocks" number_of_elements="2">
      <Element index="0" value="/Grids/Base"/>
      <Element index="1" value="1"/>
    </Property>
    <Property name="FamilyStatus" id="40.FamilyStatus" number_of_elements="2">
      <Element index="0" value="Wall"/>
      <Element index="1" value="1"/>
    </Property>
  </Proxy>
</ServerManagerState>
"#;
        let mut doc = parse(input);
        run(&Release55Step, &mut doc);
        assert_eq!(render(&doc), render(&parse(input)));
    }
}

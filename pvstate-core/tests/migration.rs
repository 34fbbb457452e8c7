use pretty_assertions::assert_eq;
use proptest::prelude::*;
use pvstate_core::adapters::StaticSession;
use pvstate_core::{
    MigrationSettings, QueryScope, StateElement, StepChain, Version, WarningKind, migrate_element,
    migrate_text,
};

fn property(name: &str, proxy_id: &str, values: &[&str]) -> StateElement {
    let mut p = StateElement::new("Property")
        .with_attribute("name", name)
        .with_attribute("id", format!("{proxy_id}.{name}"))
        .with_attribute("number_of_elements", values.len().to_string());
    for (i, v) in values.iter().enumerate() {
        p = p.with_child(
            StateElement::new("Element")
                .with_attribute("index", i.to_string())
                .with_attribute("value", *v),
        );
    }
    p
}

fn proxy(group: &str, ty: &str, id: &str) -> StateElement {
    StateElement::new("Proxy")
        .with_attribute("group", group)
        .with_attribute("type", ty)
        .with_attribute("id", id)
}

fn state(version: &str) -> StateElement {
    StateElement::new("ServerManagerState").with_attribute("version", version)
}

fn migrate(host: &mut StateElement) -> pvstate_core::MigrationReport {
    migrate_element(host, None, &MigrationSettings::default(), &StepChain::new()).unwrap()
}

fn element_values(prop: &StateElement) -> Vec<(&str, &str)> {
    prop.children
        .iter()
        .filter(|c| c.name == "Element")
        .map(|e| (e.attribute("index").unwrap(), e.attribute("value").unwrap()))
        .collect()
}

fn find_property<'a>(proxy: &'a StateElement, name: &str) -> Option<&'a StateElement> {
    proxy
        .children
        .iter()
        .find(|c| c.name == "Property" && c.attribute("name") == Some(name))
}

#[test]
fn cth_part_arrays_are_merged_sorted_and_unique() {
    let mut host = state("4.0.1").with_child(
        proxy("filters", "CTHPart", "12")
            .with_child(property("AddDoubleVolumeArrayName", "12", &["b"]))
            .with_child(property("AddFloatVolumeArrayName", "12", &["a"]))
            .with_child(property("AddUnsignedCharVolumeArrayName", "12", &["a"])),
    );
    let report = migrate(&mut host);
    assert!(report.warnings.is_empty());
    assert_eq!(report.final_version, Version::new(5, 5, 0));

    let part = &host.children[0];
    let props: Vec<&str> = part
        .children
        .iter()
        .filter_map(|c| c.attribute("name"))
        .collect();
    assert_eq!(props, vec!["VolumeArrays"]);
    let arrays = find_property(part, "VolumeArrays").unwrap();
    assert_eq!(element_values(arrays), vec![("0", "a"), ("1", "b")]);
}

#[test]
fn colour_array_name_is_packed() {
    let mut host = state("4.1.0").with_child(
        proxy("representations", "GeometryRepresentation", "8")
            .with_child(property("ColorArrayName", "8", &["X"]))
            .with_child(property("ColorAttributeType", "8", &["1"])),
    );
    migrate(&mut host);

    let rep = &host.children[0];
    assert_eq!(rep.children.len(), 1);
    let packed = find_property(rep, "ColorArrayName").unwrap();
    assert_eq!(packed.attribute("number_of_elements"), Some("5"));
    assert_eq!(
        element_values(packed),
        vec![("0", ""), ("1", ""), ("2", ""), ("3", "1"), ("4", "X")]
    );
}

#[test]
fn scalar_bar_length_is_the_larger_component() {
    let mut host = state("5.1.0").with_child(
        proxy("representations", "ScalarBarWidgetRepresentation", "7")
            .with_child(property("Position2", "7", &["0.3", "0.7"])),
    );
    migrate(&mut host);

    let bar = &host.children[0];
    let length = find_property(bar, "ScalarBarLength").unwrap();
    assert_eq!(element_values(length), vec![("0", "0.7")]);
    let location = find_property(bar, "WindowLocation").unwrap();
    assert_eq!(element_values(location), vec![("0", "0")]);
    assert!(find_property(bar, "Position2").is_none());
}

#[test]
fn current_version_is_a_no_op() {
    let mut host = state("5.5.0").with_child(
        proxy("representations", "ScalarBarWidgetRepresentation", "7")
            .with_child(property("Position2", "7", &["0.3", "0.7"])),
    );
    let before = host.clone();
    let report = migrate(&mut host);
    assert!(report.is_noop());
    assert!(report.warnings.is_empty());
    assert_eq!(host, before);
}

#[test]
fn unparseable_version_runs_every_step_with_one_warning() {
    for version in ["garbage", "5.x", "1.2.3.4"] {
        let mut host = state(version).with_child(
            proxy("filters", "Glyph", "1").with_child(property("ScaleFactor", "1", &["1"])),
        );
        let report = migrate(&mut host);
        assert_eq!(report.applied.len(), 5, "{version}");
        assert_eq!(report.start_version, Version::new(4, 0, 1));
        assert_eq!(
            report.warnings_of(WarningKind::IncompatibleVersion).count(),
            1,
            "{version}"
        );
        assert_eq!(report.declared_version.as_deref(), Some(version));
        // The version attribute itself is never rewritten.
        assert_eq!(host.attribute("version"), Some(version));
    }
}

#[test]
fn session_supplies_reset_mode_and_light_ids() {
    let mut host = state("5.4.0")
        .with_child(
            proxy("lookup_tables", "PVLookupTable", "20")
                .with_child(property("LockScalarRange", "20", &["0"])),
        )
        .with_child(
            proxy("views", "RenderView", "4")
                .with_child(property("LightSwitch", "4", &["1"]))
                .with_child(property("LightDiffuseColor", "4", &["1", "1", "1"])),
        );
    let session = StaticSession::new(7000).with_setting(
        "settings",
        "GeneralSettings",
        "TransferFunctionResetMode",
        1,
    );
    let report = migrate_element(
        &mut host,
        Some(&session),
        &MigrationSettings::default(),
        &StepChain::new(),
    )
    .unwrap();
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(session.peek_next_id(), 7001);

    let table = &host.children[0];
    let mode = find_property(table, "AutomaticRescaleRangeMode").unwrap();
    assert_eq!(element_values(mode), vec![("0", "1")]);

    let light = host
        .children
        .iter()
        .find(|c| c.attribute("group") == Some("additional_lights"))
        .unwrap();
    assert_eq!(light.attribute("id"), Some("7000"));
}

#[test]
fn document_scope_reproduces_cross_proxy_matching() {
    let text = r#"<ServerManagerState version="4.1.0">
  <Proxy group="representations" type="GeometryRepresentation" id="8"/>
  <Proxy group="representations" type="GeometryRepresentation" id="9">
    <Property name="ColorArrayName" id="9.ColorArrayName" number_of_elements="1">
      <Element index="0" value="Pressure"/>
    </Property>
  </Proxy>
</ServerManagerState>
"#;
    let chain = StepChain::new();

    let scoped = MigrationSettings::default();
    let (out, _) = migrate_text(text, None, &scoped, &chain).unwrap();
    assert!(out.contains("id=\"9.ColorArrayName\""));
    assert!(!out.contains("id=\"8.ColorArrayName\""));

    let wide = MigrationSettings {
        query_scope: QueryScope::Document,
        ..MigrationSettings::default()
    };
    let (out, _) = migrate_text(text, None, &wide, &chain).unwrap();
    assert!(out.contains("id=\"8.ColorArrayName\""));
    assert!(!out.contains("id=\"9.ColorArrayName\""));
}

#[test]
fn custom_floor_changes_the_clamp() {
    let mut host = state("4.1.0");
    let settings = MigrationSettings {
        floor: Version::new(5, 0, 0),
        ..MigrationSettings::default()
    };
    let report = migrate_element(&mut host, None, &settings, &StepChain::new()).unwrap();
    assert_eq!(report.start_version, Version::new(5, 0, 0));
    let keys: Vec<&str> = report.applied.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["pv.4_2_to_5_1", "pv.5_1_to_5_4", "pv.5_4_to_5_5"]);
}

#[test]
fn custom_root_tag_is_migrated_like_the_default() {
    let mut host = StateElement::new("Session").with_child(
        StateElement::new("Foo")
            .with_attribute("version", "4.1.0")
            .with_child(
                proxy("representations", "GeometryRepresentation", "8")
                    .with_child(property("ColorArrayName", "8", &["X"]))
                    .with_child(property("ColorAttributeType", "8", &["1"])),
            )
            .with_child(
                proxy("filters", "Calculator", "9")
                    .with_child(property("AttributeMode", "9", &["2"])),
            )
            .with_child(
                StateElement::new("GlobalPropertiesManagers").with_child(
                    StateElement::new("GlobalPropertiesManager").with_child(
                        StateElement::new("Link")
                            .with_attribute("global_name", "ForegroundColor")
                            .with_attribute("proxy", "8")
                            .with_attribute("property", "Color"),
                    ),
                ),
            ),
    );
    let settings = MigrationSettings {
        root_tag: "Foo".to_string(),
        ..MigrationSettings::default()
    };
    let report = migrate_element(&mut host, None, &settings, &StepChain::new()).unwrap();
    assert_eq!(report.final_version, Version::new(5, 5, 0));

    let root = &host.children[0];
    assert_eq!(root.name, "Foo");

    let packed = find_property(&root.children[0], "ColorArrayName").unwrap();
    assert_eq!(
        element_values(packed),
        vec![("0", ""), ("1", ""), ("2", ""), ("3", "1"), ("4", "X")]
    );
    let attribute_type = find_property(&root.children[1], "AttributeType").unwrap();
    assert_eq!(element_values(attribute_type), vec![("0", "1")]);

    let links = root
        .children
        .iter()
        .find(|c| c.name == "Links")
        .expect("links created under the custom root");
    assert_eq!(links.children.len(), 1);
    assert_eq!(links.children[0].name, "GlobalPropertyLink");
}

fn bystander(i: usize) -> StateElement {
    let id = (100 + i).to_string();
    let radius = format!("{i}.5");
    proxy("sources", "SphereSource", &id)
        .with_attribute("servers", "1")
        .with_child(property("Radius", &id, &[radius.as_str()]))
}

proptest! {
    #[test]
    fn untouched_siblings_keep_their_order(
        before in 0usize..4,
        after in 0usize..4,
        version in prop::sample::select(vec!["4.0.1", "4.1.0", "4.2.0", "5.1.0", "5.4.0"]),
    ) {
        let mut host = state(version);
        for i in 0..before {
            host = host.with_child(bystander(i));
        }
        host = host.with_child(
            proxy("representations", "ScalarBarWidgetRepresentation", "7")
                .with_child(property("Position2", "7", &["0.3", "0.7"])),
        );
        for i in before..before + after {
            host = host.with_child(bystander(i));
        }

        migrate(&mut host);

        let sources: Vec<&StateElement> = host
            .children
            .iter()
            .filter(|c| c.attribute("group") == Some("sources"))
            .collect();
        prop_assert_eq!(sources.len(), before + after);
        for (i, s) in sources.iter().enumerate() {
            prop_assert_eq!(*s, &bystander(i));
        }
    }
}

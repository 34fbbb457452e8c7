use super::chart_axes::split_packed_axis_properties;
use super::props::{
    append_element, element_at, find_property, is_single_valued, new_property, proxies, state_root,
};
use super::{MigrationStep, StepContext, StepMeta, release};
use anyhow::Context;
use pvstate_types::{Transition, WarningKind};
use pvstate_xml::{Document, NodeId, Query};

/// 4.2 reworked colouring, links, chart axes and the glyph filter.
pub struct Release42Step;

const DEPRECATED_GLYPH: &str = "The Glyph filter in this state was saved by an older release. \
It has been loaded as the legacy glyph filter (\"Glyph (deprecated)\"); \
replace it with the current Glyph filter to keep using it in future releases.";

impl MigrationStep for Release42Step {
    fn meta(&self) -> StepMeta {
        StepMeta {
            key: "pv.4_1_to_4_2",
            transition: Transition::new(release(4, 1), release(4, 2)),
            title: "Representation colouring, global links, chart axes and legacy glyphs",
            description: "Packs ColorArrayName/ColorAttributeType into a five-element \
                ColorArrayName, drops interactor style and camera manipulator proxies, \
                moves global property links under Links, splits packed chart axis \
                properties per axis and relabels old Glyph filters as LegacyGlyph.",
            uses_session: false,
        }
    }

    fn apply(&self, doc: &mut Document, ctx: &mut StepContext<'_>) -> anyhow::Result<()> {
        pack_color_array_names(doc, ctx).context("packing representation colour arrays")?;
        let root_tag = ctx.root_tag();
        drop_interaction_proxies(doc, root_tag);
        move_global_property_links(doc, root_tag).context("moving global property links")?;
        split_packed_axis_properties(doc, root_tag).context("splitting chart axis properties")?;
        relabel_legacy_glyphs(doc, ctx).context("relabelling glyph filters")?;
        Ok(())
    }
}

/// Value of the scoped single-valued `name` property, removing the property.
/// Empty when there is none.
fn take_single_value(doc: &mut Document, root: NodeId, name: &str) -> String {
    let query = Query::descendants("Property").attr_eq("name", name);
    let found = doc
        .select_all(root, &query)
        .into_iter()
        .filter(|p| is_single_valued(doc, *p))
        .find_map(|p| {
            let element = element_at(doc, p, 0)?;
            let value = doc.attribute(element, "value")?;
            Some((p, value.to_string()))
        });

    match found {
        Some((prop, value)) => {
            doc.remove(prop);
            value
        }
        None => String::new(),
    }
}

fn pack_color_array_names(doc: &mut Document, ctx: &StepContext<'_>) -> anyhow::Result<()> {
    for proxy in proxies(doc, ctx.root_tag(), "representations", None) {
        let root = ctx.search_root(doc, proxy);
        let array_name = take_single_value(doc, root, "ColorArrayName");
        let attribute_type = take_single_value(doc, root, "ColorAttributeType");
        if array_name.is_empty() && attribute_type.is_empty() {
            continue;
        }

        let prop = new_property(doc, proxy, None, "ColorArrayName", 5)?;
        let values = ["", "", "", attribute_type.as_str(), array_name.as_str()];
        for (index, value) in values.iter().enumerate() {
            append_element(doc, prop, index, value)?;
        }
    }
    Ok(())
}

fn drop_interaction_proxies(doc: &mut Document, root_tag: &str) {
    let query = Query::descendants(root_tag)
        .child("Proxy")
        .attr_in("group", &["interactorstyles", "cameramanipulators"]);
    let found = doc.select_all(doc.document_node(), &query);
    let removed = doc.purge(&found);
    if removed > 0 {
        tracing::debug!(removed, "dropped interaction proxies");
    }
}

fn move_global_property_links(doc: &mut Document, root_tag: &str) -> anyhow::Result<()> {
    let state = state_root(doc, root_tag)?;
    let links = match doc.first_child_named(state, "Links") {
        Some(links) => links,
        None => doc.append_child(state, "Links")?,
    };

    let query = Query::descendants(root_tag)
        .child("GlobalPropertiesManagers")
        .child("GlobalPropertiesManager")
        .child("Link");
    for link in doc.select_all(doc.document_node(), &query) {
        doc.rename(link, "GlobalPropertyLink")?;
        doc.deep_copy(link, links)?;
    }
    Ok(())
}

fn relabel_legacy_glyphs(doc: &mut Document, ctx: &mut StepContext<'_>) -> anyhow::Result<()> {
    let mut relabelled = false;

    for proxy in proxies(doc, ctx.root_tag(), "filters", Some("Glyph")) {
        let root = ctx.search_root(doc, proxy);
        if find_property(doc, root, "GlyphMode").is_some() {
            continue;
        }
        doc.set_attribute(proxy, "type", "LegacyGlyph")?;
        relabelled = true;
    }
    for proxy in proxies(doc, ctx.root_tag(), "filters", Some("ArbitrarySourceGlyph")) {
        doc.set_attribute(proxy, "type", "LegacyArbitrarySourceGlyph")?;
        relabelled = true;
    }

    if relabelled {
        ctx.warn(WarningKind::DeprecatedFilter, DEPRECATED_GLYPH);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::QueryScope;
    use crate::steps::testing::{parse, render, run, run_with};
    use pretty_assertions::assert_eq;

    fn elements(doc: &Document, proxy_id: &str, name: &str) -> Vec<(String, String)> {
        let q = Query::descendants("Proxy")
            .attr_eq("id", proxy_id)
            .child("Property")
            .attr_eq("name", name)
            .child("Element");
        doc.select_all(doc.document_node(), &q)
            .into_iter()
            .map(|e| {
                (
                    doc.attribute(e, "index").unwrap_or_default().to_string(),
                    doc.attribute(e, "value").unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn packs_colour_array_into_five_elements() {
        let mut doc = parse(
            r#"<ServerManagerState version="4.1.0">
  <Proxy group="representations" type="GeometryRepresentation" id="8">
    <Property name="ColorArrayName" id="8.ColorArrayName" number_of_elements="1">
      <Element index="0" value="Temp"/>
    </Property>
    <Property name="ColorAttributeType" id="8.ColorAttributeType" number_of_elements="1">
      <Element index="0" value="1"/>
    </Property>
    <Property name="Opacity" id="8.Opacity" number_of_elements="1">
      <Element index="0" value="1"/>
    </Property>
  </Proxy>
</ServerManagerState>"#,
        );
        let warnings = run(&Release42Step, &mut doc);
        assert!(warnings.is_empty());

        let expected: Vec<(String, String)> = [("0", ""), ("1", ""), ("2", ""), ("3", "1"), ("4", "Temp")]
            .iter()
            .map(|(i, v)| (i.to_string(), v.to_string()))
            .collect();
        assert_eq!(elements(&doc, "8", "ColorArrayName"), expected);
        assert!(!render(&doc).contains("ColorAttributeType"));
        assert_eq!(elements(&doc, "8", "Opacity").len(), 1);
    }

    #[test]
    fn empty_colour_values_drop_both_properties() {
        let mut doc = parse(
            r#"<ServerManagerState>
  <Proxy group="representations" type="GeometryRepresentation" id="8">
    <Property name="ColorArrayName" id="8.ColorArrayName" number_of_elements="1">
      <Element index="0" value=""/>
    </Property>
  </Proxy>
</ServerManagerState>"#,
        );
        run(&Release42Step, &mut doc);
        assert!(!render(&doc).contains("ColorArrayName"));
    }

    #[test]
    fn interaction_proxies_are_removed() {
        let mut doc = parse(
            r#"<ServerManagerState>
  <Proxy group="interactorstyles" type="InteractorStyle" id="1"/>
  <Proxy group="cameramanipulators" type="TrackballRotate" id="2"/>
  <Proxy group="sources" type="SphereSource" id="3"/>
</ServerManagerState>"#,
        );
        run(&Release42Step, &mut doc);
        let text = render(&doc);
        assert!(!text.contains("interactorstyles"));
        assert!(!text.contains("cameramanipulators"));
        assert!(text.contains("SphereSource"));
    }

    #[test]
    fn global_links_are_renamed_and_copied_under_links() {
        let mut doc = parse(
            r#"<ServerManagerState>
  <GlobalPropertiesManagers>
    <GlobalPropertiesManager group="misc" type="GlobalProperties" name="ParaViewProperties">
      <Link global_name="ForegroundColor" proxy="5" property="Color"/>
    </GlobalPropertiesManager>
  </GlobalPropertiesManagers>
</ServerManagerState>"#,
        );
        run(&Release42Step, &mut doc);

        let under_manager = doc
            .select(doc.document_node(), "//GlobalPropertiesManager/GlobalPropertyLink")
            .unwrap();
        let under_links = doc
            .select(doc.document_node(), "//Links/GlobalPropertyLink[@property='Color']")
            .unwrap();
        assert_eq!(under_manager.len(), 1);
        assert_eq!(under_links.len(), 1);
        assert_eq!(doc.attribute(under_links[0], "proxy"), Some("5"));
        assert!(doc.select(doc.document_node(), "//Link").unwrap().is_empty());
    }

    #[test]
    fn existing_links_element_is_reused() {
        let mut doc = parse(
            r#"<ServerManagerState>
  <Links><PropertyLink/></Links>
  <GlobalPropertiesManagers>
    <GlobalPropertiesManager><Link property="Color"/></GlobalPropertiesManager>
  </GlobalPropertiesManagers>
</ServerManagerState>"#,
        );
        run(&Release42Step, &mut doc);
        assert_eq!(doc.select(doc.document_node(), "//Links").unwrap().len(), 1);
        assert_eq!(
            doc.select(doc.document_node(), "//Links/*").unwrap().len(),
            2
        );
    }

    #[test]
    fn old_glyphs_are_relabelled_with_one_warning() {
        let mut doc = parse(
            r#"<ServerManagerState>
  <Proxy group="filters" type="Glyph" id="10"/>
  <Proxy group="filters" type="Glyph" id="11"/>
  <Proxy group="filters" type="Glyph" id="12">
    <Property name="GlyphMode" id="12.GlyphMode" number_of_elements="1"/>
  </Proxy>
  <Proxy group="filters" type="ArbitrarySourceGlyph" id="13"/>
</ServerManagerState>"#,
        );
        let warnings = run(&Release42Step, &mut doc);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::DeprecatedFilter);

        let types: Vec<&str> = doc
            .select(doc.document_node(), "//Proxy")
            .unwrap()
            .into_iter()
            .map(|p| doc.attribute(p, "type").unwrap())
            .collect();
        assert_eq!(
            types,
            vec!["LegacyGlyph", "LegacyGlyph", "Glyph", "LegacyArbitrarySourceGlyph"]
        );
    }

    #[test]
    fn document_scope_lets_any_glyph_mode_block_relabel() {
        let input = r#"<ServerManagerState>
  <Proxy group="filters" type="Glyph" id="10"/>
  <Proxy group="filters" type="Glyph" id="12">
    <Property name="GlyphMode" id="12.GlyphMode" number_of_elements="1"/>
  </Proxy>
</ServerManagerState>"#;
        let mut doc = parse(input);
        let warnings = run_with(&Release42Step, &mut doc, None, QueryScope::Document);
        assert!(warnings.is_empty());
        assert!(!render(&doc).contains("LegacyGlyph"));
    }
}

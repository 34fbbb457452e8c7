use super::props::{
    append_element, as_f64, format_number, new_property, proxies, rename_property,
};
use super::{MigrationStep, StepContext, StepMeta, release};
use pvstate_types::Transition;
use pvstate_xml::{Document, NodeId};

/// Scalar bars gained a window location and a single length.
pub struct ScalarBarLayoutStep;

impl MigrationStep for ScalarBarLayoutStep {
    fn meta(&self) -> StepMeta {
        StepMeta {
            key: "pv.5_1_to_5_4",
            transition: Transition::new(release(5, 1), release(5, 4)),
            title: "Scalar bar window location and length",
            description: "Adds WindowLocation = 0 (any location) to every scalar bar and \
                replaces the two-component Position2 with ScalarBarLength, the larger \
                of the two old components.",
            uses_session: false,
        }
    }

    fn apply(&self, doc: &mut Document, ctx: &mut StepContext<'_>) -> anyhow::Result<()> {
        for proxy in proxies(doc, ctx.root_tag(), "representations", Some("ScalarBarWidgetRepresentation")) {
            let location = new_property(doc, proxy, None, "WindowLocation", 1)?;
            append_element(doc, location, 0, "0")?;

            if let Some(position2) = doc.find_child_by_attribute(proxy, "Property", "name", "Position2") {
                collapse_position2(doc, position2)?;
            }
        }
        Ok(())
    }
}

fn collapse_position2(doc: &mut Document, property: NodeId) -> anyhow::Result<()> {
    rename_property(doc, property, "ScalarBarLength")?;

    let elements: Vec<NodeId> = doc.child_elements_named(property, "Element").collect();
    if let Some(&first) = elements.first() {
        let width = as_f64(doc.attribute(first, "value"));
        let height = elements
            .get(1)
            .map(|e| as_f64(doc.attribute(*e, "value")))
            .unwrap_or(0.0);
        let length = width.max(height);
        doc.set_attribute(first, "value", &format_number(length))?;
        tracing::debug!(length, "collapsed scalar bar Position2");
    }
    if let Some(&second) = elements.get(1) {
        doc.remove(second);
    }
    doc.set_attribute(property, "number_of_elements", "1")?;
    Ok(())
}

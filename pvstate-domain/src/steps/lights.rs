//! Render view headlight to additional `Light` proxy.
//!
//! Before 5.5 every render view carried its own headlight as a handful of
//! `Light*` properties. A switched-on headlight becomes a standalone proxy in
//! the `additional_lights` group, registered in the state's proxy collection
//! and referenced from the view's `AdditionalLights` property.

use super::props::{
    append_element, as_f64, as_int, find_property, format_number, indexed_elements,
    new_property, proxies, state_root,
};
use super::StepContext;
use pvstate_types::WarningKind;
use pvstate_xml::{Document, NodeId, Query, XmlResult};

const LIGHTS_GROUP: &str = "additional_lights";

const HEADLIGHT_PROPERTIES: [&str; 6] = [
    "LightDiffuseColor",
    "LightAmbientColor",
    "LightSpecularColor",
    "LightIntensity",
    "LightSwitch",
    "LightType",
];

const NO_ID_ALLOCATOR: &str = "No session was available to allocate a proxy id for the \
converted headlight; an id above every proxy id in the state was used instead.";

/// Headlight parameters carried over to the new light.
struct Headlight {
    diffuse: [f64; 3],
    intensity: f64,
}

impl Headlight {
    fn read(doc: &Document, root: NodeId) -> Self {
        let mut diffuse = [1.0; 3];
        if let Some(prop) = find_property(doc, root, "LightDiffuseColor") {
            diffuse = [0.0; 3];
            for (slot, (_, element)) in diffuse.iter_mut().zip(indexed_elements(doc, prop)) {
                *slot = as_f64(doc.attribute(element, "value"));
            }
        }
        let intensity = find_property(doc, root, "LightIntensity")
            .map(|prop| {
                let first = indexed_elements(doc, prop).into_iter().next();
                as_f64(first.and_then(|(_, e)| doc.attribute(e, "value")))
            })
            .unwrap_or(1.0);
        Self { diffuse, intensity }
    }
}

pub(super) fn convert_headlights(doc: &mut Document, ctx: &mut StepContext<'_>) -> anyhow::Result<()> {
    let state = state_root(doc, ctx.root_tag())?;

    for view in proxies(doc, ctx.root_tag(), "views", Some("RenderView")) {
        let root = ctx.search_root(doc, view);
        if find_property(doc, root, "LightDiffuseColor").is_none() {
            continue;
        }

        let switched_on = find_property(doc, root, "LightSwitch")
            .and_then(|p| doc.first_child_named(p, "Element"))
            .is_some_and(|e| as_int(doc.attribute(e, "value")) == 1);

        if switched_on {
            let headlight = Headlight::read(doc, root);
            let id = allocate_id(doc, ctx).to_string();
            add_light_proxy(doc, state, &id, &headlight)?;
            register_light(doc, state, &id)?;
            attach_light(doc, view, root, &id)?;
            tracing::debug!(view = %view, light = %id, "converted headlight");
        }

        let legacy: Vec<NodeId> = doc
            .select_all(root, &Query::descendants("Property").attr_in("name", &HEADLIGHT_PROPERTIES))
            .into_iter()
            .filter(|p| !belongs_to_light(doc, *p))
            .collect();
        doc.purge(&legacy);
    }
    Ok(())
}

/// Properties of converted lights share names with the headlight ones.
fn belongs_to_light(doc: &Document, property: NodeId) -> bool {
    doc.parent(property)
        .is_some_and(|p| doc.attribute(p, "group") == Some(LIGHTS_GROUP))
}

fn allocate_id(doc: &Document, ctx: &mut StepContext<'_>) -> u32 {
    if let Some(session) = ctx.session() {
        return session.next_global_id();
    }
    ctx.warn(WarningKind::MissingContext, NO_ID_ALLOCATOR);
    largest_proxy_id(doc).saturating_add(1)
}

fn largest_proxy_id(doc: &Document) -> u32 {
    doc.select_all(doc.document_node(), &Query::descendants("Proxy").has_attr("id"))
        .into_iter()
        .filter_map(|p| doc.attribute(p, "id")?.trim().parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

fn add_light_proxy(doc: &mut Document, state: NodeId, id: &str, headlight: &Headlight) -> XmlResult<()> {
    let proxy = doc.append_child(state, "Proxy")?;
    doc.set_attribute(proxy, "group", LIGHTS_GROUP)?;
    doc.set_attribute(proxy, "type", "Light")?;
    doc.set_attribute(proxy, "id", id)?;
    doc.set_attribute(proxy, "servers", "21")?;

    let diffuse = new_property(doc, proxy, None, "DiffuseColor", 3)?;
    for (index, value) in headlight.diffuse.iter().enumerate() {
        append_element(doc, diffuse, index, &format_number(*value))?;
    }
    let intensity = new_property(doc, proxy, None, "LightIntensity", 1)?;
    append_element(doc, intensity, 0, &format_number(headlight.intensity))?;
    let kind = new_property(doc, proxy, None, "LightType", 1)?;
    append_element(doc, kind, 0, "1")?;
    Ok(())
}

fn register_light(doc: &mut Document, state: NodeId, id: &str) -> XmlResult<()> {
    let collection = match doc.find_child_by_attribute(state, "ProxyCollection", "name", LIGHTS_GROUP) {
        Some(c) => c,
        None => {
            let c = doc.append_child(state, "ProxyCollection")?;
            doc.set_attribute(c, "name", LIGHTS_GROUP)?;
            c
        }
    };
    let ordinal = doc.child_elements_named(collection, "Item").count() + 1;
    let item = doc.append_child(collection, "Item")?;
    doc.set_attribute(item, "id", id)?;
    doc.set_attribute(item, "name", &format!("Light{ordinal}"))?;
    Ok(())
}

fn attach_light(doc: &mut Document, view: NodeId, root: NodeId, id: &str) -> XmlResult<()> {
    let lights = match find_property(doc, root, "AdditionalLights") {
        Some(p) => p,
        None => {
            let p = doc.append_child(view, "Property")?;
            let prop_id = format!("{}.AdditionalLights", doc.attribute(view, "id").unwrap_or_default());
            doc.set_attribute(p, "name", "AdditionalLights")?;
            doc.set_attribute(p, "id", &prop_id)?;
            p
        }
    };
    let reference = doc.append_child(lights, "Proxy")?;
    doc.set_attribute(reference, "value", id)?;
    let count = doc.child_elements_named(lights, "Proxy").count();
    doc.set_attribute(lights, "number_of_elements", &count.to_string())?;
    Ok(())
}

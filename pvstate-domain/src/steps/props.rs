//! Small helpers over the proxy/property/element shape of a state document.

use anyhow::Context;
use pvstate_xml::{Document, NodeId, Query, XmlResult};

/// The `root_tag` element every step operates under.
pub(super) fn state_root(doc: &Document, root_tag: &str) -> anyhow::Result<NodeId> {
    doc.root_element()
        .filter(|r| doc.tag(*r) == root_tag)
        .with_context(|| format!("document root is not <{root_tag}>"))
}

/// `//<root_tag>/Proxy[@group=..]` optionally narrowed by `@type`.
pub(super) fn proxies(
    doc: &Document,
    root_tag: &str,
    group: &str,
    ty: Option<&str>,
) -> Vec<NodeId> {
    let mut query = Query::descendants(root_tag)
        .child("Proxy")
        .attr_eq("group", group);
    if let Some(ty) = ty {
        query = query.attr_eq("type", ty);
    }
    doc.select_all(doc.document_node(), &query)
}

/// First `Property[@name=..]` at or below `root`.
pub(super) fn find_property(doc: &Document, root: NodeId, name: &str) -> Option<NodeId> {
    doc.select_first(root, &Query::descendants("Property").attr_eq("name", name))
}

/// `Element` children of a property keyed by their effective index.
///
/// The `index` attribute wins; elements without one fall back to their
/// position among the property's elements. Result is sorted by index, ties
/// keep document order.
pub(super) fn indexed_elements(doc: &Document, property: NodeId) -> Vec<(usize, NodeId)> {
    let mut out: Vec<(usize, NodeId)> = doc
        .child_elements_named(property, "Element")
        .enumerate()
        .map(|(pos, e)| {
            let index = doc
                .attribute(e, "index")
                .and_then(|i| i.trim().parse().ok())
                .unwrap_or(pos);
            (index, e)
        })
        .collect();
    out.sort_by_key(|(i, _)| *i);
    out
}

pub(super) fn element_at(doc: &Document, property: NodeId, index: usize) -> Option<NodeId> {
    indexed_elements(doc, property)
        .into_iter()
        .find(|(i, _)| *i == index)
        .map(|(_, e)| e)
}

pub(super) fn element_value(doc: &Document, property: NodeId, index: usize) -> Option<&str> {
    element_at(doc, property, index).and_then(|e| doc.attribute(e, "value"))
}

/// Whether the property declares (or, lacking the attribute, holds) exactly
/// one element.
pub(super) fn is_single_valued(doc: &Document, property: NodeId) -> bool {
    match doc.attribute(property, "number_of_elements") {
        Some(n) => n.trim() == "1",
        None => doc.child_elements_named(property, "Element").count() == 1,
    }
}

/// `<proxy id>.<name>`, the id convention for properties.
pub(super) fn property_id(doc: &Document, proxy: NodeId, name: &str) -> String {
    format!("{}.{name}", doc.attribute(proxy, "id").unwrap_or_default())
}

/// Create `<Property name id number_of_elements>` under `proxy`, appended or
/// placed before `before`.
pub(super) fn new_property(
    doc: &mut Document,
    proxy: NodeId,
    before: Option<NodeId>,
    name: &str,
    number_of_elements: usize,
) -> XmlResult<NodeId> {
    let id = property_id(doc, proxy, name);
    let prop = match before {
        Some(reference) => doc.insert_before(proxy, reference, "Property")?,
        None => doc.append_child(proxy, "Property")?,
    };
    doc.set_attribute(prop, "name", name)?;
    doc.set_attribute(prop, "id", &id)?;
    doc.set_attribute(prop, "number_of_elements", &number_of_elements.to_string())?;
    Ok(prop)
}

pub(super) fn append_element(
    doc: &mut Document,
    property: NodeId,
    index: usize,
    value: &str,
) -> XmlResult<NodeId> {
    let e = doc.append_child(property, "Element")?;
    doc.set_attribute(e, "index", &index.to_string())?;
    doc.set_attribute(e, "value", value)?;
    Ok(e)
}

/// Replace the first exact occurrence of `old` in `id`.
pub(super) fn rekey(id: &str, old: &str, new: &str) -> String {
    if old.is_empty() {
        return id.to_string();
    }
    id.replacen(old, new, 1)
}

/// Rename a property, re-keying its id and the ids of its `Domain` children.
pub(super) fn rename_property(doc: &mut Document, property: NodeId, new_name: &str) -> XmlResult<()> {
    let old_name = doc.attribute(property, "name").unwrap_or_default().to_string();
    doc.set_attribute(property, "name", new_name)?;

    let mut targets = vec![property];
    targets.extend(doc.child_elements_named(property, "Domain"));
    for node in targets {
        if let Some(id) = doc.attribute(node, "id") {
            let id = rekey(id, &old_name, new_name);
            doc.set_attribute(node, "id", &id)?;
        }
    }
    Ok(())
}

/// Lenient integer read: leading integer, else a truncated float, else 0.
pub(super) fn as_int(value: Option<&str>) -> i64 {
    let Some(v) = value.map(str::trim) else {
        return 0;
    };
    if let Ok(i) = v.parse::<i64>() {
        return i;
    }
    match v.parse::<f64>() {
        Ok(f) if f.is_finite() => f.trunc() as i64,
        _ => 0,
    }
}

/// Lenient float read; anything unparseable is 0.
pub(super) fn as_f64(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Shortest decimal form, with integral values printed without a fraction.
pub(super) fn format_number(value: f64) -> String {
    format!("{value}")
}

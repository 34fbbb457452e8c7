use crate::document::{Document, NodeId};
use crate::error::{XmlError, XmlResult};
use pvstate_types::StateElement;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt::Display;

/// Parse text into a [`Document`].
///
/// Attribute and child order are preserved. Whitespace-only text is dropped;
/// declarations, comments, processing instructions and doctypes are ignored.
///
/// Text content is trimmed, so leading and trailing whitespace inside an
/// element does not survive a parse/render round trip. Attribute values are
/// kept verbatim.
pub fn parse_document(text: &str) -> XmlResult<Document> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut doc = Document::new();
    let mut stack = vec![doc.document_node()];

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|e| parse_err(position, e))?;
        match event {
            Event::Start(start) => {
                let parent = current(&stack);
                let id = open_element(&mut doc, parent, &start, position)?;
                stack.push(id);
            }
            Event::Empty(start) => {
                let parent = current(&stack);
                open_element(&mut doc, parent, &start, position)?;
            }
            Event::End(_) => {
                if stack.len() <= 1 {
                    return Err(parse_err(position, "unbalanced end tag"));
                }
                stack.pop();
            }
            Event::Text(t) => {
                let value = t.unescape().map_err(|e| parse_err(position, e))?;
                append_text(&mut doc, current(&stack), &value)?;
            }
            Event::CData(c) => {
                let raw = c.into_inner();
                append_text(&mut doc, current(&stack), &String::from_utf8_lossy(&raw))?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(parse_err(text.len() as u64, "unclosed element at end of input"));
    }
    if doc.root_element().is_none() {
        return Err(XmlError::NoRootElement);
    }
    tracing::trace!(elements = doc.element_count(), "parsed state text");
    Ok(doc)
}

fn current(stack: &[NodeId]) -> NodeId {
    stack[stack.len() - 1]
}

fn parse_err(position: u64, e: impl Display) -> XmlError {
    XmlError::Parse {
        position,
        message: e.to_string(),
    }
}

fn render_err(e: impl Display) -> XmlError {
    XmlError::Render(e.to_string())
}

fn open_element(
    doc: &mut Document,
    parent: NodeId,
    start: &BytesStart<'_>,
    position: u64,
) -> XmlResult<NodeId> {
    let name = start.name();
    let tag = std::str::from_utf8(name.as_ref()).map_err(|e| parse_err(position, e))?;
    let id = doc.append_child(parent, tag)?;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_err(position, e))?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| parse_err(position, e))?;
        let value = attr.unescape_value().map_err(|e| parse_err(position, e))?;
        doc.set_attribute(id, key, &value)?;
    }
    Ok(id)
}

fn append_text(doc: &mut Document, node: NodeId, value: &str) -> XmlResult<()> {
    if value.trim().is_empty() || node == doc.document_node() {
        return Ok(());
    }
    let joined = match doc.text(node) {
        Some(existing) => format!("{existing}{value}"),
        None => value.to_string(),
    };
    doc.set_text(node, Some(joined))
}

/// Render a [`Document`] as indented text (two spaces per level).
pub fn render_document(doc: &Document) -> XmlResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    for &child in doc.children(doc.document_node()) {
        write_node(&mut writer, doc, child)?;
    }
    let mut out = String::from_utf8(writer.into_inner()).map_err(render_err)?;
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn write_node(writer: &mut Writer<Vec<u8>>, doc: &Document, id: NodeId) -> XmlResult<()> {
    let tag = doc.tag(id);
    let mut start = BytesStart::new(tag);
    for (k, v) in doc.attributes(id) {
        start.push_attribute((k.as_str(), v.as_str()));
    }

    let children = doc.children(id);
    let text = doc.text(id);
    if children.is_empty() && text.is_none() {
        return writer.write_event(Event::Empty(start)).map_err(render_err);
    }

    writer.write_event(Event::Start(start)).map_err(render_err)?;
    if let Some(t) = text {
        writer
            .write_event(Event::Text(BytesText::new(t)))
            .map_err(render_err)?;
    }
    for &child in children {
        write_node(writer, doc, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(render_err)
}

/// Parse text into a host [`StateElement`] (its first root element).
pub fn parse_element(text: &str) -> XmlResult<StateElement> {
    let doc = parse_document(text)?;
    let root = doc.root_element().ok_or(XmlError::NoRootElement)?;
    Ok(doc.to_element(root))
}

/// Render a host [`StateElement`] as text.
pub fn render_element(element: &StateElement) -> XmlResult<String> {
    render_document(&Document::from_element(element))
}

use crate::error::{XmlError, XmlResult};
use crate::query::Query;
use pvstate_types::StateElement;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Handle to a node inside one [`Document`].
///
/// Handles stay valid after the node is removed; the node is then reported as
/// detached and refuses mutation. Handles from one document must not be used
/// with another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    text: Option<String>,
    attached: bool,
}

impl NodeData {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            parent,
            text: None,
            attached: true,
        }
    }
}

/// Arena-backed element tree.
///
/// Node 0 is a tag-less document node; the root element is its first child.
/// Queries evaluated from the document node therefore behave like absolute
/// paths.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    const DOCUMENT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new("", None)],
        }
    }

    /// New document holding a single empty root element.
    pub fn with_root(tag: &str) -> (Self, NodeId) {
        let mut doc = Self::new();
        let root = doc.push_node(Self::DOCUMENT, tag, None);
        (doc, root)
    }

    pub fn document_node(&self) -> NodeId {
        Self::DOCUMENT
    }

    pub fn root_element(&self) -> Option<NodeId> {
        self.data(Self::DOCUMENT).children.first().copied()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn data_mut(&mut self, id: NodeId) -> XmlResult<&mut NodeData> {
        let data = &mut self.nodes[id.0];
        if data.attached {
            Ok(data)
        } else {
            Err(XmlError::DetachedNode(id))
        }
    }

    fn push_node(&mut self, parent: NodeId, tag: &str, at: Option<usize>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(tag, Some(parent)));
        let siblings = &mut self.nodes[parent.0].children;
        match at {
            Some(pos) => siblings.insert(pos, id),
            None => siblings.push(id),
        }
        id
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.data(id).attached
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.data(id).tag
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.data(id)
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        &self.data(id).attributes
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.data(id).text.as_deref()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    pub fn child_elements_named<'a>(
        &'a self,
        id: NodeId,
        tag: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.tag(*c) == tag)
    }

    pub fn first_child_named(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.child_elements_named(id, tag).next()
    }

    /// First child with the given tag whose `attr` equals `value`.
    pub fn find_child_by_attribute(
        &self,
        parent: NodeId,
        tag: &str,
        attr: &str,
        value: &str,
    ) -> Option<NodeId> {
        self.child_elements_named(parent, tag)
            .find(|c| self.attribute(*c, attr) == Some(value))
    }

    fn sibling_offset(&self, id: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        let target = pos.checked_add_signed(offset)?;
        siblings.get(target).copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling_offset(id, 1)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling_offset(id, -1)
    }

    pub fn next_sibling_named(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cur = self.next_sibling(id);
        while let Some(c) = cur {
            if self.tag(c) == tag {
                return Some(c);
            }
            cur = self.next_sibling(c);
        }
        None
    }

    /// All descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Number of elements reachable from the document node.
    pub fn element_count(&self) -> usize {
        self.descendants(Self::DOCUMENT).len()
    }

    pub(crate) fn document_order(&self) -> HashMap<NodeId, usize> {
        self.descendants(Self::DOCUMENT)
            .into_iter()
            .enumerate()
            .map(|(i, n)| (n, i))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Evaluate `query` relative to `context`; results are unique and in
    /// document order. Empty queries and detached contexts match nothing.
    pub fn select_all(&self, context: NodeId, query: &Query) -> Vec<NodeId> {
        if query.is_empty() || !self.is_attached(context) {
            return Vec::new();
        }

        let mut current = vec![context];
        for step in query.steps() {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for &ctx in &current {
                let candidates = match step.axis {
                    crate::query::Axis::Child => self.children(ctx).to_vec(),
                    crate::query::Axis::Descendant => self.descendants(ctx),
                };
                for c in candidates {
                    if step.matches(self, c) && seen.insert(c) {
                        next.push(c);
                    }
                }
            }
            if current.len() > 1 && next.len() > 1 {
                let order = self.document_order();
                next.sort_by_key(|n| order.get(n).copied().unwrap_or(usize::MAX));
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }

    pub fn select_first(&self, context: NodeId, query: &Query) -> Option<NodeId> {
        self.select_all(context, query).into_iter().next()
    }

    /// Parse `path` and evaluate it relative to `context`.
    pub fn select(&self, context: NodeId, path: &str) -> XmlResult<Vec<NodeId>> {
        let query = Query::parse(path)?;
        Ok(self.select_all(context, &query))
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    pub fn rename(&mut self, id: NodeId, tag: &str) -> XmlResult<()> {
        self.data_mut(id)?.tag = tag.to_string();
        Ok(())
    }

    /// Overwrite an existing attribute in place, or append it.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> XmlResult<()> {
        let data = self.data_mut(id)?;
        match data.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => data
                .attributes
                .push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> XmlResult<bool> {
        let data = self.data_mut(id)?;
        let before = data.attributes.len();
        data.attributes.retain(|(k, _)| k != name);
        Ok(data.attributes.len() != before)
    }

    pub fn set_text(&mut self, id: NodeId, text: Option<String>) -> XmlResult<()> {
        self.data_mut(id)?.text = text;
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, tag: &str) -> XmlResult<NodeId> {
        self.data_mut(parent)?;
        Ok(self.push_node(parent, tag, None))
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        reference: NodeId,
        tag: &str,
    ) -> XmlResult<NodeId> {
        let pos = self
            .data_mut(parent)?
            .children
            .iter()
            .position(|c| *c == reference)
            .ok_or(XmlError::NotAChild {
                parent,
                child: reference,
            })?;
        Ok(self.push_node(parent, tag, Some(pos)))
    }

    /// Detach `id` (and its subtree) from its parent.
    ///
    /// Returns `false` when the node was already detached or is the document
    /// node itself.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if id == Self::DOCUMENT || !self.is_attached(id) {
            return false;
        }
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
        self.nodes[id.0].attached = false;
        for d in self.descendants(id) {
            self.nodes[d.0].attached = false;
        }
        true
    }

    /// Remove every node in `nodes`; returns how many were actually detached.
    pub fn purge(&mut self, nodes: &[NodeId]) -> usize {
        nodes.iter().filter(|n| self.remove(**n)).count()
    }

    /// Append a deep copy of `src` under `new_parent`.
    pub fn deep_copy(&mut self, src: NodeId, new_parent: NodeId) -> XmlResult<NodeId> {
        let tag = self.tag(src).to_string();
        let attributes = self.attributes(src).to_vec();
        let text = self.data(src).text.clone();
        let children = self.children(src).to_vec();

        let copy = self.append_child(new_parent, &tag)?;
        {
            let data = self.data_mut(copy)?;
            data.attributes = attributes;
            data.text = text;
        }
        for child in children {
            self.deep_copy(child, copy)?;
        }
        Ok(copy)
    }

    // ---------------------------------------------------------------------
    // Host element bridge
    // ---------------------------------------------------------------------

    pub fn from_element(root: &StateElement) -> Self {
        let mut doc = Self::new();
        doc.graft(Self::DOCUMENT, root);
        doc
    }

    fn graft(&mut self, parent: NodeId, element: &StateElement) {
        let id = self.push_node(parent, &element.name, None);
        let data = &mut self.nodes[id.0];
        data.attributes = element.attributes.clone();
        data.text = element.text.clone();
        for child in &element.children {
            self.graft(id, child);
        }
    }

    pub fn to_element(&self, id: NodeId) -> StateElement {
        let data = self.data(id);
        StateElement {
            name: data.tag.clone(),
            attributes: data.attributes.clone(),
            children: data.children.iter().map(|c| self.to_element(*c)).collect(),
            text: data.text.clone(),
        }
    }
}

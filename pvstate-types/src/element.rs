use serde::{Deserialize, Serialize};

/// Host-side element tree for a saved session.
///
/// This is the owned representation the surrounding application hands to the
/// migration driver. The driver never edits it piecemeal: it reads it, migrates
/// a separate document, and swaps the result back in with
/// [`replace_contents`](StateElement::replace_contents).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateElement {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StateElement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl StateElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: StateElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Overwrites an existing attribute in place or appends a new one.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Depth-first search of the descendants (excluding `self`) for the first
    /// element with the given tag.
    pub fn find_nested_by_name(&self, name: &str) -> Option<&StateElement> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_nested_by_name(name) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_nested_by_name_mut(&mut self, name: &str) -> Option<&mut StateElement> {
        for child in &mut self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_nested_by_name_mut(name) {
                return Some(found);
            }
        }
        None
    }

    /// Replace all attributes, children and text with those of `other`.
    /// The element keeps its own tag.
    pub fn replace_contents(&mut self, other: StateElement) {
        self.attributes = other.attributes;
        self.children = other.children;
        self.text = other.text;
    }

    pub fn element_count(&self) -> usize {
        1 + self.children.iter().map(StateElement::element_count).sum::<usize>()
    }
}

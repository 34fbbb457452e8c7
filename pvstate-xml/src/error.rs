//! Error types for pvstate-xml.
//!
//! Parse and render failures are internal-consistency failures at the text
//! boundary; `DetachedNode` and `NotAChild` indicate a transform holding a
//! stale handle.

use crate::document::NodeId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    /// The text could not be parsed into a document.
    #[error("xml parse error at byte {position}: {message}")]
    Parse { position: u64, message: String },

    /// The document could not be written back to text.
    #[error("xml render error: {0}")]
    Render(String),

    /// A textual path query was malformed.
    #[error("invalid query {query:?}: {reason}")]
    InvalidQuery { query: String, reason: String },

    /// A mutation targeted a node that was already removed from the tree.
    #[error("node {0} is detached from the document")]
    DetachedNode(NodeId),

    /// `insert_before` was given a reference node that is not a child of the parent.
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Parsed text contained no element at all.
    #[error("document has no root element")]
    NoRootElement,
}

pub type XmlResult<T> = Result<T, XmlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failure() {
        let err = XmlError::Parse {
            position: 12,
            message: "unexpected end".to_string(),
        };
        assert!(err.to_string().contains("byte 12"));

        let err = XmlError::InvalidQuery {
            query: "//[".to_string(),
            reason: "expected a name".to_string(),
        };
        assert!(err.to_string().contains("expected a name"));
    }
}

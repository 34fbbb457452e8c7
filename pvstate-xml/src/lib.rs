//! Document engine for pvstate.
//!
//! Responsibilities:
//! - Own a mutable element tree with parent links ([`Document`]).
//! - Evaluate structured path queries over it ([`Query`]).
//! - Round-trip text through `quick-xml`, preserving attribute and child order.
//! - Bridge the host-side [`StateElement`](pvstate_types::StateElement) to and from text.

mod document;
mod error;
mod query;
mod text;

pub use document::{Document, NodeId};
pub use error::{XmlError, XmlResult};
pub use query::{Axis, Predicate, Query, QueryStep, Term};
pub use text::{parse_document, parse_element, render_document, render_element};

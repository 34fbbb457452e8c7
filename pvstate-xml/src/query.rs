//! Structured path queries.
//!
//! A [`Query`] is a sequence of steps, each selecting elements by tag along
//! the child or descendant axis and filtering them with attribute
//! predicates. Queries are always evaluated relative to a context node;
//! evaluating from [`Document::document_node`](crate::Document::document_node)
//! gives absolute-path behaviour.
//!
//! The textual form accepted by [`Query::parse`] is a small path subset:
//!
//! ```text
//! //ServerManagerState/Proxy[@group='filters' and @type='CTHPart']
//! .//Property[@name='A' or @name='B']/Element[@value]
//! Element[@index='0']
//! ```
//!
//! Within one bracket terms are joined either all by `and` or all by `or`;
//! multiple brackets are conjoined. `*` matches any tag.

use crate::document::{Document, NodeId};
use crate::error::{XmlError, XmlResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    AttrEq { name: String, value: String },
    HasAttr(String),
}

impl Term {
    fn holds(&self, doc: &Document, id: NodeId) -> bool {
        match self {
            Term::AttrEq { name, value } => doc.attribute(id, name) == Some(value.as_str()),
            Term::HasAttr(name) => doc.attribute(id, name).is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    All(Vec<Term>),
    Any(Vec<Term>),
}

impl Predicate {
    fn holds(&self, doc: &Document, id: NodeId) -> bool {
        match self {
            Predicate::All(terms) => terms.iter().all(|t| t.holds(doc, id)),
            Predicate::Any(terms) => terms.iter().any(|t| t.holds(doc, id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStep {
    pub axis: Axis,
    pub name: String,
    pub predicates: Vec<Predicate>,
}

impl QueryStep {
    pub(crate) fn matches(&self, doc: &Document, id: NodeId) -> bool {
        (self.name == "*" || doc.tag(id) == self.name)
            && self.predicates.iter().all(|p| p.holds(doc, id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    steps: Vec<QueryStep>,
}

impl Query {
    pub fn children(name: &str) -> Self {
        Self::default().child(name)
    }

    pub fn descendants(name: &str) -> Self {
        Self::default().descendant(name)
    }

    pub fn child(self, name: &str) -> Self {
        self.push(Axis::Child, name)
    }

    pub fn descendant(self, name: &str) -> Self {
        self.push(Axis::Descendant, name)
    }

    fn push(mut self, axis: Axis, name: &str) -> Self {
        self.steps.push(QueryStep {
            axis,
            name: name.to_string(),
            predicates: Vec::new(),
        });
        self
    }

    fn with_predicate(mut self, predicate: Predicate) -> Self {
        if let Some(last) = self.steps.last_mut() {
            last.predicates.push(predicate);
        }
        self
    }

    /// Require `@name='value'` on the last step.
    pub fn attr_eq(self, name: &str, value: &str) -> Self {
        self.with_predicate(Predicate::All(vec![Term::AttrEq {
            name: name.to_string(),
            value: value.to_string(),
        }]))
    }

    /// Require `@name` to equal one of `values` on the last step.
    pub fn attr_in(self, name: &str, values: &[&str]) -> Self {
        self.with_predicate(Predicate::Any(
            values
                .iter()
                .map(|v| Term::AttrEq {
                    name: name.to_string(),
                    value: (*v).to_string(),
                })
                .collect(),
        ))
    }

    /// Require `@name` to be present on the last step.
    pub fn has_attr(self, name: &str) -> Self {
        self.with_predicate(Predicate::All(vec![Term::HasAttr(name.to_string())]))
    }

    pub fn steps(&self) -> &[QueryStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Parse the textual path subset. An empty (or all-whitespace) string
    /// yields the empty query, which matches nothing.
    pub fn parse(path: &str) -> XmlResult<Self> {
        Parser::new(path).parse()
    }
}

struct Parser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.trim().chars().collect(),
            pos: 0,
        }
    }

    fn err(&self, reason: impl Into<String>) -> XmlError {
        XmlError::InvalidQuery {
            query: self.src.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse(mut self) -> XmlResult<Query> {
        let mut query = Query::default();
        if self.chars.is_empty() {
            return Ok(query);
        }

        // A leading '.' only marks the path as relative; every query is.
        if self.peek() == Some('.') && self.chars.get(self.pos + 1) == Some(&'/') {
            self.pos += 1;
        }

        let mut axis = self.parse_axis().unwrap_or(Axis::Child);
        loop {
            let name = self.parse_name()?;
            let mut step = QueryStep {
                axis,
                name,
                predicates: Vec::new(),
            };
            while self.eat('[') {
                step.predicates.push(self.parse_predicate()?);
            }
            query.steps.push(step);

            if self.peek().is_none() {
                return Ok(query);
            }
            axis = self
                .parse_axis()
                .ok_or_else(|| self.err(format!("unexpected character at {}", self.pos)))?;
        }
    }

    fn parse_axis(&mut self) -> Option<Axis> {
        if !self.eat('/') {
            return None;
        }
        if self.eat('/') {
            Some(Axis::Descendant)
        } else {
            Some(Axis::Child)
        }
    }

    fn parse_name(&mut self) -> XmlResult<String> {
        if self.eat('*') {
            return Ok("*".to_string());
        }
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.err(format!("expected a name at {}", start)));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_predicate(&mut self) -> XmlResult<Predicate> {
        let mut terms = Vec::new();
        let mut joiner: Option<&'static str> = None;
        loop {
            self.skip_ws();
            terms.push(self.parse_term()?);
            self.skip_ws();
            if self.eat(']') {
                break;
            }
            let word = self.parse_keyword()?;
            match joiner {
                None => joiner = Some(word),
                Some(j) if j == word => {}
                Some(_) => return Err(self.err("cannot mix 'and' and 'or' in one predicate")),
            }
        }
        Ok(match joiner {
            Some("or") => Predicate::Any(terms),
            _ => Predicate::All(terms),
        })
    }

    fn parse_keyword(&mut self) -> XmlResult<&'static str> {
        for word in ["and", "or"] {
            let end = self.pos + word.len();
            let matches = end <= self.chars.len()
                && self.chars[self.pos..end].iter().copied().eq(word.chars())
                && self.chars.get(end).is_some_and(|c| c.is_whitespace());
            if matches {
                self.pos = end;
                return Ok(word);
            }
        }
        Err(self.err(format!("expected 'and', 'or' or ']' at {}", self.pos)))
    }

    fn parse_term(&mut self) -> XmlResult<Term> {
        if !self.eat('@') {
            return Err(self.err(format!("expected '@' at {}", self.pos)));
        }
        let name = self.parse_name()?;
        self.skip_ws();
        if !self.eat('=') {
            return Ok(Term::HasAttr(name));
        }
        self.skip_ws();
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.err(format!("expected a quoted value at {}", self.pos))),
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != quote) {
            self.pos += 1;
        }
        if !self.eat(quote) {
            return Err(self.err("unterminated string literal"));
        }
        let value: String = self.chars[start..self.pos - 1].iter().collect();
        Ok(Term::AttrEq { name, value })
    }
}

//! Token-to-tree assembly.
//!
//! The [`TreeBuilder`] is the engine's token handler for the XML grammar.
//! It keeps a stack of open elements and a note of which attribute is
//! currently filling, and routes each token on the state it arrived from:
//!
//! - `TagName` pre-text opens an element (the document root when nothing
//!   is open yet)
//! - `Attribute` pre-text starts an attribute on the open element, or on
//!   the document itself when none is open (the `<?xml ?>` declaration)
//! - value-state pre-text appends to the started attribute, so a value
//!   interrupted by entities arrives in pieces and still lands whole
//! - `CloseTag` pre-text must name the open element
//! - the emitted `/>` match closes the open element with no name check
//! - entity names are resolved and re-dispatched as if the literal text
//!   had arrived from the state that pushed the entity

use tracing::trace;

use crate::engine::{MatchContext, TokenHandler, TokenKind};
use crate::error::{Error, Result};

use super::entities;
use super::grammar::{
    ATTRIBUTE, ATTRIBUTE_VALUE, CLOSE_TAG, DOUBLE_QUOTE, ENTITY, QUOTE, SIGNATURE, TAG, TAG_NAME,
};
use super::tree::{Document, NodeId};

/// Where the currently filling attribute lives.
#[derive(Debug, Clone, Copy)]
enum AttrTarget {
    Node(NodeId),
    Document,
}

/// Assembles a [`Document`] from grammar tokens.
pub struct TreeBuilder {
    document: Document,
    /// Stack of open elements, root at the bottom.
    open: Vec<NodeId>,
    /// Attribute still accepting value tokens, if any.
    pending: Option<AttrTarget>,
}

impl TreeBuilder {
    pub fn new() -> TreeBuilder {
        TreeBuilder {
            document: Document::new(),
            open: Vec::new(),
            pending: None,
        }
    }

    /// The document built so far.
    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub(crate) fn record_doctype(&mut self, text: &str) {
        self.document.set_doctype(text);
    }

    /// Route one token; also the re-entry point for resolved entities.
    fn dispatch(
        &mut self,
        state: &str,
        previous: Option<&str>,
        kind: TokenKind,
        text: &str,
    ) -> Result<()> {
        match (state, kind) {
            (SIGNATURE | TAG, TokenKind::Pre) => self.text(text),
            (SIGNATURE | TAG, TokenKind::Match) => self.soft_break(),
            (TAG_NAME, TokenKind::Pre) => self.open_element(text),
            (ATTRIBUTE, TokenKind::Pre) => self.attribute_name(text),
            (ATTRIBUTE_VALUE | QUOTE | DOUBLE_QUOTE, TokenKind::Pre) => self.attribute_value(text),
            // the only emitted match in these states is the self-close "/>"
            (TAG_NAME | ATTRIBUTE | ATTRIBUTE_VALUE, TokenKind::Match) => self.close_element(None),
            (CLOSE_TAG, TokenKind::Pre) => self.close_element(Some(text)),
            (ENTITY, TokenKind::Pre) => self.entity(text, previous),
            _ => Ok(()),
        }
    }

    /// Open an element under the current top, or as the document root.
    fn open_element(&mut self, name: &str) -> Result<()> {
        self.pending = None;
        let id = match self.open.last().copied() {
            Some(parent) => {
                let id = self.document.add_node(name);
                self.document.link_child(parent, id);
                id
            }
            None => {
                if self.document.root().is_some() {
                    return Err(Error::not_ready(format!(
                        "element {name:?} after the root element closed"
                    )));
                }
                let id = self.document.add_node(name);
                self.document.set_root(id);
                id
            }
        };
        self.open.push(id);
        trace!(element = name, depth = self.open.len(), "element opened");
        Ok(())
    }

    /// Close the open element. With a name (a `</x>` close tag) the name
    /// must match; the nameless form is the `/>` self-close.
    fn close_element(&mut self, name: Option<&str>) -> Result<()> {
        self.pending = None;
        let top = match self.open.pop() {
            Some(top) => top,
            None => {
                return Err(Error::not_found(match name {
                    Some(name) => format!("close tag {name:?} without an open element"),
                    None => "self-closing tag without an open element".to_string(),
                }))
            }
        };
        if let Some(name) = name {
            let open_name = self.document.node_name(top);
            if open_name != name {
                return Err(Error::not_found(format!(
                    "close tag {name:?} does not match open element {open_name:?}"
                )));
            }
        }
        trace!(element = %self.document.node_name(top), "element closed");
        Ok(())
    }

    /// Start an attribute on the open element, or on the document when no
    /// element is open (declaration pseudo-attributes).
    fn attribute_name(&mut self, name: &str) -> Result<()> {
        match self.open.last().copied() {
            Some(id) => {
                self.document.push_attribute(id, name);
                self.pending = Some(AttrTarget::Node(id));
            }
            None => {
                self.document.push_document_attribute(name);
                self.pending = Some(AttrTarget::Document);
            }
        }
        Ok(())
    }

    /// Append a value piece to the attribute being filled.
    fn attribute_value(&mut self, text: &str) -> Result<()> {
        match self.pending {
            Some(AttrTarget::Node(id)) => {
                self.document.append_attribute(id, text);
                Ok(())
            }
            Some(AttrTarget::Document) => {
                self.document.append_document_attribute(text);
                Ok(())
            }
            None => Err(Error::not_found(format!(
                "value {text:?} without an attribute name"
            ))),
        }
    }

    /// Free text goes to the open element's value; dropped outside one.
    fn text(&mut self, text: &str) -> Result<()> {
        if let Some(&top) = self.open.last() {
            self.document.append_value(top, text);
        }
        Ok(())
    }

    /// A newline collapses to a single space, and disappears when the
    /// value is empty or already ends in one.
    fn soft_break(&mut self) -> Result<()> {
        if let Some(&top) = self.open.last() {
            let value = self.document.node_value(top);
            if !value.is_empty() && !value.ends_with(' ') {
                self.document.append_value(top, " ");
            }
        }
        Ok(())
    }

    /// Resolve an entity name and re-dispatch the literal text as if it
    /// had arrived from the state that pushed the entity. Unresolvable
    /// references pass through as written.
    fn entity(&mut self, name: &str, previous: Option<&str>) -> Result<()> {
        let origin = previous.unwrap_or(TAG);
        match entities::resolve(name) {
            Some(c) => {
                trace!(entity = name, resolved = %c, "entity resolved");
                let mut buf = [0u8; 4];
                self.dispatch(origin, None, TokenKind::Pre, c.encode_utf8(&mut buf))
            }
            None => {
                let literal = format!("&{name};");
                self.dispatch(origin, None, TokenKind::Pre, &literal)
            }
        }
    }
}

impl TokenHandler for TreeBuilder {
    fn token(&mut self, ctx: &MatchContext<'_>, kind: TokenKind, text: &str) -> Result<()> {
        self.dispatch(ctx.state, ctx.previous, kind, text)
    }
}

impl Default for TreeBuilder {
    fn default() -> TreeBuilder {
        TreeBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::grammar;
    use super::*;
    use crate::engine::Parser;

    /// Drive the full grammar over a string, stopping at the first error.
    fn run(input: &str) -> (Result<()>, Parser<TreeBuilder>, TreeBuilder) {
        let mut parser = Parser::new();
        parser
            .register_states(&grammar::table(), grammar::SIGNATURE)
            .unwrap();
        let mut builder = TreeBuilder::new();
        let mut outcome = Ok(());
        for point in input.chars() {
            outcome = parser.accept(&mut builder, point);
            if outcome.is_err() {
                break;
            }
        }
        (outcome, parser, builder)
    }

    fn build(input: &str) -> Document {
        let (outcome, _, builder) = run(input);
        outcome.unwrap();
        builder.into_document()
    }

    #[test]
    fn test_element_attribute_child() {
        let doc = build(r#"<a b="1"><c/></a>"#);
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).unwrap().name(), "a");
        assert_eq!(doc.node(root).unwrap().attribute("b"), Some("1"));

        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 1);
        let c = doc.node(children[0]).unwrap();
        assert_eq!(c.name(), "c");
        assert!(!c.has_attributes());
        assert!(!c.has_children());
    }

    #[test]
    fn test_entities_become_literal_text() {
        let doc = build("<a>&lt;x&gt;</a>");
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).unwrap().value(), "<x>");
        // the resolved `<` and `>` are text, not markup
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn test_comment_is_invisible() {
        let doc = build("<!-- hi --><a/>");
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).unwrap().name(), "a");
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.node(root).unwrap().value(), "");
    }

    #[test]
    fn test_second_root_rejected() {
        let (outcome, parser, _) = run("<a/><b/>");
        assert!(matches!(outcome, Err(Error::NotReady(_))));
        let recorded = parser.diagnostics().as_slice();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].message.contains("unexpected termination"));
    }

    #[test]
    fn test_close_mismatch_rejected() {
        let (outcome, parser, _) = run("<a><b></a>");
        assert!(matches!(outcome, Err(Error::NotFound(_))));
        let recorded = parser.diagnostics().as_slice();
        assert!(recorded[0].message.contains("close tag"));
    }

    #[test]
    fn test_declaration_fills_document_attributes() {
        let doc = build(r#"<?xml version="1.0" encoding="UTF-8"?><a/>"#);
        assert_eq!(doc.attribute("version"), Some("1.0"));
        assert_eq!(doc.encoding(), Some("UTF-8"));
        assert_eq!(doc.node(doc.root().unwrap()).unwrap().name(), "a");
    }

    #[test]
    fn test_declaration_is_case_insensitive() {
        let doc = build(r#"<?XML version="1.0"?><a/>"#);
        assert_eq!(doc.attribute("version"), Some("1.0"));
    }

    #[test]
    fn test_entity_splits_attribute_value() {
        let doc = build(r#"<a b="1&amp;2"/>"#);
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).unwrap().attribute("b"), Some("1&2"));
    }

    #[test]
    fn test_numeric_entity_in_quoted_value() {
        let doc = build(r#"<a b="x&#33;y"/>"#);
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).unwrap().attribute("b"), Some("x!y"));
    }

    #[test]
    fn test_single_quoted_and_spaced_values() {
        let doc = build("<a b='x' c = 'y'/>");
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).unwrap().attribute("b"), Some("x"));
        assert_eq!(doc.node(root).unwrap().attribute("c"), Some("y"));
    }

    #[test]
    fn test_unquoted_values() {
        let doc = build("<a b=1 c=2></a>");
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).unwrap().attribute("b"), Some("1"));
        assert_eq!(doc.node(root).unwrap().attribute("c"), Some("2"));
    }

    #[test]
    fn test_unknown_entity_passes_through() {
        let doc = build("<a>&foo;</a>");
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).unwrap().value(), "&foo;");
    }

    #[test]
    fn test_newlines_collapse_into_one_space() {
        let doc = build("<a>line1\nline2</a>");
        assert_eq!(doc.node(doc.root().unwrap()).unwrap().value(), "line1 line2");

        let doc = build("<a>\n\nx</a>");
        assert_eq!(doc.node(doc.root().unwrap()).unwrap().value(), "x");

        let doc = build("<a>p\r\nq</a>");
        assert_eq!(doc.node(doc.root().unwrap()).unwrap().value(), "p q");
    }

    #[test]
    fn test_text_around_children_merges() {
        let doc = build("<a>x<b/>y</a>");
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).unwrap().value(), "xy");
        assert_eq!(doc.children(root).count(), 1);
    }

    #[test]
    fn test_sibling_self_closed_elements() {
        let doc = build("<a><b/><c/></a>");
        let root = doc.root().unwrap();
        let names: Vec<_> = doc
            .children(root)
            .map(|id| doc.node(id).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_doctype_captured_raw() {
        let doc = build(r#"<!DOCTYPE note SYSTEM "note.dtd"><a/>"#);
        assert_eq!(doc.doctype(), Some(" note SYSTEM \"note.dtd\""));
        assert_eq!(doc.node(doc.root().unwrap()).unwrap().name(), "a");
    }

    #[test]
    fn test_inert_document_declarations() {
        let doc = build("<!ELEMENT note (#PCDATA)><a/>");
        assert_eq!(doc.doctype(), None);
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.node(doc.root().unwrap()).unwrap().name(), "a");
    }

    #[test]
    fn test_text_outside_root_dropped() {
        let doc = build("  <a/>");
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.node(doc.root().unwrap()).unwrap().value(), "");
    }

    #[test]
    fn test_bare_attribute_before_self_close() {
        let doc = build("<a checked/>");
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).unwrap().attribute("checked"), Some(""));
    }
}

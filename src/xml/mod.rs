//! XML parsing on top of the tokenizing engine.
//!
//! The pieces line up as:
//!
//! ```text
//!   bytes ──► Parser (grammar::table) ──► TreeBuilder ──► Document
//! ```
//!
//! The grammar module declares the XML surface as engine states, [`TreeBuilder`]
//! turns the resulting token events into an arena [`Document`], and
//! [`XmlParser`] wires the two together behind a buffer-feeding API.
//! [`parse`] is the one-call version:
//!
//! ```
//! let doc = statelex::parse(br#"<greeting kind="big">hi</greeting>"#)?;
//! let root = doc.root().unwrap();
//! assert_eq!(doc.node(root).unwrap().name(), "greeting");
//! assert_eq!(doc.node(root).unwrap().attribute("kind"), Some("big"));
//! # Ok::<(), statelex::Error>(())
//! ```

pub mod builder;
pub mod entities;
mod grammar;
pub mod tree;

pub use builder::TreeBuilder;
pub use tree::{Attribute, Children, Descendants, Document, NodeId, TreeNode, Visitor};

use crate::engine::Parser;
use crate::error::Result;

/// A tokenizer registered with the XML grammar, feeding a [`TreeBuilder`].
///
/// Bytes go in through [`start`](XmlParser::start) /
/// [`feed`](XmlParser::feed) / [`finish`](XmlParser::finish); the
/// assembled tree comes out of [`document`](XmlParser::document). The
/// parser is single-shot: one document per instance.
pub struct XmlParser {
    parser: Parser<TreeBuilder>,
    builder: TreeBuilder,
}

impl XmlParser {
    pub fn new() -> Result<XmlParser> {
        let mut parser = Parser::new();
        parser.register_states(&grammar::table(), grammar::SIGNATURE)?;
        Ok(XmlParser {
            parser,
            builder: TreeBuilder::new(),
        })
    }

    /// Parse a whole document in one call.
    pub fn parse(&mut self, bytes: &[u8], encoding: Option<&str>) -> Result<()> {
        self.start(encoding)?;
        self.feed(bytes)?;
        self.finish()
    }

    /// Open a byte stream, optionally naming its encoding up front.
    pub fn start(&mut self, encoding: Option<&str>) -> Result<()> {
        self.parser.start_buffer(encoding)
    }

    /// Decode and tokenize one chunk. Chunks may split characters and
    /// triggers anywhere.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.parser.next_buffer(&mut self.builder, chunk)
    }

    /// Close the stream and stamp the detected byte order, if any, onto
    /// the document.
    pub fn finish(&mut self) -> Result<()> {
        self.parser.finish_buffer()?;
        if let Some(order) = self.parser.encoding().and_then(|e| e.byte_order()) {
            self.builder.document_mut().set_byte_order(order);
        }
        Ok(())
    }

    /// Hand one decoded character straight to the tokenizer.
    pub fn accept(&mut self, point: char) -> Result<()> {
        self.parser.accept(&mut self.builder, point)
    }

    /// The document assembled so far.
    #[inline]
    pub fn document(&self) -> &Document {
        self.builder.document()
    }

    pub fn into_document(self) -> Document {
        self.builder.into_document()
    }

    /// Problems recorded while parsing.
    #[inline]
    pub fn diagnostics(&self) -> &crate::engine::Diagnostics {
        self.parser.diagnostics()
    }
}

/// Parse a complete XML document, detecting the encoding from the bytes.
pub fn parse(bytes: &[u8]) -> Result<Document> {
    parse_with_encoding(bytes, None)
}

/// Parse a complete XML document in the named encoding. `None` falls
/// back to byte-order-mark and content detection.
pub fn parse_with_encoding(bytes: &[u8], encoding: Option<&str>) -> Result<Document> {
    let mut parser = XmlParser::new()?;
    parser.parse(bytes, encoding)?;
    Ok(parser.into_document())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_one_call() {
        let doc = parse(b"<a><b/></a>").unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).unwrap().name(), "a");
        assert_eq!(doc.children(root).count(), 1);
    }

    #[test]
    fn test_parse_with_declared_encoding() {
        let doc = parse_with_encoding(b"<a v=\"\xE9\"/>", Some("latin-1")).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).unwrap().attribute("v"), Some("é"));
    }

    #[test]
    fn test_unknown_encoding_label() {
        assert!(parse_with_encoding(b"<a/>", Some("ebcdic")).is_err());
    }

    #[test]
    fn test_feed_in_pieces() {
        let mut parser = XmlParser::new().unwrap();
        parser.start(None).unwrap();
        parser.feed(b"<a><b na").unwrap();
        parser.feed(b"me=\"x\"/>").unwrap();
        parser.feed(b"</a>").unwrap();
        parser.finish().unwrap();

        let doc = parser.into_document();
        let root = doc.root().unwrap();
        let b = doc.node(root).unwrap().first_child().unwrap();
        assert_eq!(doc.node(b).unwrap().attribute("name"), Some("x"));
    }

    #[test]
    fn test_document_before_finish() {
        let mut parser = XmlParser::new().unwrap();
        parser.start(None).unwrap();
        parser.feed(b"<a/>").unwrap();
        assert!(parser.document().root().is_some());
    }
}

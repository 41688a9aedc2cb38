//! statelex - Rule-driven state-machine tokenizing, with XML on top
//!
//! Layers:
//! - engine: generic tokenizer; states hold ordered trigger rules, matches
//!   split the pending text into pre/match events for a [`TokenHandler`]
//! - encoding: byte streams to scalar values (UTF-8/16, Latin-1, ASCII)
//! - xml: an XML grammar for the engine plus a tree builder, so
//!   [`parse`] turns bytes into an arena [`Document`]
//!
//! The engine is grammar-agnostic: the XML layer registers its states
//! through the same [`engine::Parser`] API any other grammar would use.
//!
//! ```
//! let doc = statelex::parse(b"<note><to>Tove</to></note>")?;
//! let root = doc.root().unwrap();
//! assert_eq!(doc.node(root).unwrap().name(), "note");
//! # Ok::<(), statelex::Error>(())
//! ```

pub mod encoding;
pub mod engine;
pub mod error;
pub mod xml;

pub use encoding::{ByteOrder, Encoding};
pub use engine::{
    Destination, Diagnostic, DiagnosticKind, Diagnostics, MatchContext, Parser, Rule, RuleOptions,
    State, TokenHandler, TokenKind,
};
pub use error::{Error, Result};
pub use xml::{parse, parse_with_encoding, Document, NodeId, TreeBuilder, Visitor, XmlParser};
